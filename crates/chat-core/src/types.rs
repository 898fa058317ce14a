//! Validated parameter types for completion requests.

use serde_json::Value;

/// Sampling temperature, always a finite value in `[0.0, 1.0]`.
///
/// Client input is permissive: the raw value may be a JSON number, a numeric
/// string (multipart form fields arrive as text), or garbage. Anything that
/// does not parse as a finite number resolves to the configured default;
/// finite values outside the range are clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature(f32);

impl Temperature {
    /// Lower bound of the accepted range.
    pub const MIN: f32 = 0.0;
    /// Upper bound of the accepted range.
    pub const MAX: f32 = 1.0;

    /// Resolve a raw client-supplied value against a default.
    #[must_use]
    pub fn resolve(raw: Option<&Value>, default: f32) -> Self {
        let parsed = match raw {
            Some(Value::Number(n)) => n.as_f64().map(|f| f as f32),
            Some(Value::String(s)) => s.trim().parse::<f32>().ok(),
            _ => None,
        };

        match parsed {
            Some(t) if t.is_finite() => Self(t.clamp(Self::MIN, Self::MAX)),
            _ => Self(default),
        }
    }

    /// The resolved value.
    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }
}

/// Maximum tokens to generate, capped at a fixed ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxTokens(u32);

impl MaxTokens {
    /// Fixed ceiling applied when the caller omits a value or asks for more.
    pub const CEILING: u32 = 4096;

    /// Resolve an optional client value against the ceiling.
    #[must_use]
    pub fn resolve(raw: Option<u32>) -> Self {
        match raw {
            Some(n) if n > 0 => Self(n.min(Self::CEILING)),
            _ => Self(Self::CEILING),
        }
    }

    /// The resolved value.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEFAULT: f32 = 0.7;

    #[test]
    fn test_temperature_missing_resolves_to_default() {
        assert_eq!(Temperature::resolve(None, DEFAULT).value(), DEFAULT);
    }

    #[test]
    fn test_temperature_non_numeric_resolves_to_default() {
        let raw = json!("abc");
        assert_eq!(Temperature::resolve(Some(&raw), DEFAULT).value(), DEFAULT);

        let raw = json!(null);
        assert_eq!(Temperature::resolve(Some(&raw), DEFAULT).value(), DEFAULT);

        let raw = json!(["0.3"]);
        assert_eq!(Temperature::resolve(Some(&raw), DEFAULT).value(), DEFAULT);
    }

    #[test]
    fn test_temperature_in_range_passes_through() {
        let raw = json!(0.3);
        let resolved = Temperature::resolve(Some(&raw), DEFAULT).value();
        assert!((resolved - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_temperature_numeric_string_parses() {
        let raw = json!("0.25");
        let resolved = Temperature::resolve(Some(&raw), DEFAULT).value();
        assert!((resolved - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_temperature_out_of_range_is_clamped() {
        let raw = json!(3.5);
        assert_eq!(Temperature::resolve(Some(&raw), DEFAULT).value(), 1.0);

        let raw = json!(-0.2);
        assert_eq!(Temperature::resolve(Some(&raw), DEFAULT).value(), 0.0);
    }

    #[test]
    fn test_temperature_nan_resolves_to_default() {
        let raw = json!("NaN");
        assert_eq!(Temperature::resolve(Some(&raw), DEFAULT).value(), DEFAULT);
    }

    #[test]
    fn test_max_tokens_defaults_and_caps() {
        assert_eq!(MaxTokens::resolve(None).value(), 4096);
        assert_eq!(MaxTokens::resolve(Some(0)).value(), 4096);
        assert_eq!(MaxTokens::resolve(Some(100)).value(), 100);
        assert_eq!(MaxTokens::resolve(Some(100_000)).value(), 4096);
    }
}
