//! Value expressions: literal numbers, setting names and coefficient-prefixed setting references

use std::collections::HashMap;

use super::ResolveError;

/// Read access to setting values as of the date being processed
pub trait SettingSource {
    fn setting_text(&self, name: &str) -> Option<&str>;
}

impl SettingSource for HashMap<String, String> {
    fn setting_text(&self, name: &str) -> Option<&str> {
        self.get(name).map(|s| s.as_str())
    }
}

/// Parse a plain number, allowing thousands separators
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Resolve an expression to a number
///
/// `"10"` → 10, `"x"` → value of setting `x` (recursively), `"2x"` → 2 × value of `x`.
pub fn resolve_number<S: SettingSource + ?Sized>(
    expr: &str,
    settings: &S,
) -> Result<f64, ResolveError> {
    let mut visited = Vec::new();
    resolve_with(expr, settings, &mut visited)
}

/// Resolve a proportion written either as a fraction (`0.5`) or a percentage (`50%`)
pub fn resolve_proportion<S: SettingSource + ?Sized>(
    expr: &str,
    settings: &S,
) -> Result<f64, ResolveError> {
    let expr = expr.trim();
    match expr.strip_suffix('%') {
        Some(percent) => Ok(resolve_number(percent, settings)? / 100.0),
        None => resolve_number(expr, settings),
    }
}

fn resolve_with<S: SettingSource + ?Sized>(
    expr: &str,
    settings: &S,
    visited: &mut Vec<String>,
) -> Result<f64, ResolveError> {
    let expr = expr.trim();

    if let Some(value) = parse_number(expr) {
        return Ok(value);
    }

    if let Some(text) = settings.setting_text(expr) {
        return follow(expr, text, settings, visited);
    }

    if let Some((coefficient, name)) = split_coefficient(expr) {
        return match settings.setting_text(name) {
            Some(text) => Ok(coefficient * follow(name, text, settings, visited)?),
            None => Err(ResolveError::MissingSetting(name.to_string())),
        };
    }

    if expr.starts_with(|c: char| c.is_alphabetic()) {
        Err(ResolveError::MissingSetting(expr.to_string()))
    } else {
        Err(ResolveError::BadNumber(expr.to_string()))
    }
}

fn follow<S: SettingSource + ?Sized>(
    name: &str,
    text: &str,
    settings: &S,
    visited: &mut Vec<String>,
) -> Result<f64, ResolveError> {
    if visited.iter().any(|v| v == name) {
        return Err(ResolveError::CyclicSetting(name.to_string()));
    }
    visited.push(name.to_string());
    let value = resolve_with(text, settings, visited);
    visited.pop();
    value
}

/// Split `2.5rate` into `(2.5, "rate")`
fn split_coefficient(expr: &str) -> Option<(f64, &str)> {
    let end = expr
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+'))))
        .map(|(i, _)| i)?;
    if end == 0 {
        return None;
    }
    let coefficient = expr[..end].parse::<f64>().ok()?;
    let name = expr[end..].trim();
    if name.is_empty() {
        return None;
    }
    Some((coefficient, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_literals() {
        let s = settings(&[]);
        assert_eq!(resolve_number("12", &s), Ok(12.0));
        assert_eq!(resolve_number(" -3.5 ", &s), Ok(-3.5));
        assert_eq!(resolve_number("1,000", &s), Ok(1000.0));
        assert!(matches!(resolve_number("NaN", &s), Err(_)));
    }

    #[test]
    fn test_transitive_setting_reference() {
        let s = settings(&[("value", "10x"), ("x", "3"), ("alias", "value")]);

        assert_eq!(resolve_number("x", &s), Ok(3.0));
        assert_eq!(resolve_number("value", &s), Ok(30.0));
        assert_eq!(resolve_number("2alias", &s), Ok(60.0));
        assert_eq!(resolve_number("0.5 x", &s), Ok(1.5));
    }

    #[test]
    fn test_errors() {
        let s = settings(&[("a", "b"), ("b", "a"), ("word", "hello world")]);

        assert_eq!(
            resolve_number("a", &s),
            Err(ResolveError::CyclicSetting("a".to_string()))
        );
        assert_eq!(
            resolve_number("missing", &s),
            Err(ResolveError::MissingSetting("missing".to_string()))
        );
        assert_eq!(
            resolve_number("2missing", &s),
            Err(ResolveError::MissingSetting("missing".to_string()))
        );
        assert_eq!(
            resolve_number("12..5", &s),
            Err(ResolveError::BadNumber("12..5".to_string()))
        );
        assert!(resolve_number("word", &s).is_err());
    }

    #[test]
    fn test_proportions() {
        let s = settings(&[("half", "0.5")]);

        assert_eq!(resolve_proportion("50%", &s), Ok(0.5));
        assert_eq!(resolve_proportion("0.25", &s), Ok(0.25));
        assert_eq!(resolve_proportion("half", &s), Ok(0.5));
    }
}
