//! Calculation settings
//!
//! Locale details and evaluation limits are fed into the engine as plain
//! configuration. Nothing here is read from the environment.

/// Settings consulted by the scanner, the value converter and the evaluator
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CalculationSettings {
    /// Locale decimal symbol. `.` is always accepted as well.
    pub decimal_separator: char,
    /// Locale thousands separator, skipped inside number literals
    pub thousands_separator: Option<char>,
    /// Enable `{1;2|3;4}` inline array literals
    pub inline_arrays: bool,
    /// Maximum depth of nested cross-cell evaluation
    pub max_recursion_depth: usize,
}

impl Default for CalculationSettings {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
            thousands_separator: None,
            inline_arrays: true,
            max_recursion_depth: 256,
        }
    }
}

impl CalculationSettings {
    /// Settings for a locale using `,` as decimal symbol and `.` for thousands
    pub fn comma_decimal() -> Self {
        Self {
            decimal_separator: ',',
            thousands_separator: Some('.'),
            ..Self::default()
        }
    }

    /// Whether `ch` acts as a decimal point
    pub fn is_decimal_point(&self, ch: char) -> bool {
        ch == '.' || ch == self.decimal_separator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = CalculationSettings::default();
        assert_eq!(settings.decimal_separator, '.');
        assert_eq!(settings.thousands_separator, None);
        assert!(settings.inline_arrays);
        assert_eq!(settings.max_recursion_depth, 256);
    }

    #[test]
    fn test_decimal_point() {
        let settings = CalculationSettings::comma_decimal();
        assert!(settings.is_decimal_point(','));
        assert!(settings.is_decimal_point('.'));
        assert!(!settings.is_decimal_point(';'));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_json() {
        let settings: CalculationSettings =
            serde_json::from_str(r#"{ "decimal_separator": "," }"#).unwrap();
        assert_eq!(settings.decimal_separator, ',');
        assert_eq!(settings.max_recursion_depth, 256);
    }
}
