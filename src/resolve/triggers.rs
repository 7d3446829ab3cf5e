//! Trigger resolution: literal dates, trigger names and `base±N<unit>` offsets

use std::collections::HashMap;

use chrono::NaiveDate;

use super::span::Span;
use super::ResolveError;
use crate::model::{Setting, Trigger};

/// Literal date layouts accepted in dates, triggers and settings
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d %b %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%B %d %Y",
    "%B %d, %Y",
];

/// Parse a literal date in any of the accepted layouts
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Resolves date expressions against the model's triggers
///
/// Settings whose value is itself a date expression can be used as date aliases too;
/// triggers take precedence over settings of the same name.
#[derive(Debug)]
pub struct DateResolver<'a> {
    triggers: HashMap<&'a str, &'a str>,
    settings: HashMap<&'a str, &'a str>,
}

impl<'a> DateResolver<'a> {
    pub fn new(triggers: &'a [Trigger], settings: &'a [Setting]) -> Self {
        Self {
            triggers: triggers
                .iter()
                .map(|t| (t.name.as_str(), t.date.as_str()))
                .collect(),
            settings: settings
                .iter()
                .map(|s| (s.name.as_str(), s.value.as_str()))
                .collect(),
        }
    }

    /// Resolve an expression to a calendar date
    pub fn resolve(&self, expr: &str) -> Result<NaiveDate, ResolveError> {
        let mut visited = Vec::new();
        self.resolve_inner(expr, &mut visited)
    }

    fn resolve_inner<'e>(
        &self,
        expr: &'e str,
        visited: &mut Vec<&'e str>,
    ) -> Result<NaiveDate, ResolveError>
    where
        'a: 'e,
    {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(ResolveError::BadDate(String::new()));
        }

        if let Some(date) = parse_date(expr) {
            return Ok(date);
        }

        if let Some(definition) = self.triggers.get(expr).copied() {
            if expr.contains(['+', '-']) {
                return Err(ResolveError::ReservedTriggerName(expr.to_string()));
            }
            return self.follow(expr, definition, visited);
        }

        if let Some((base, negative, span)) = split_offset(expr) {
            let base_date = self.resolve_inner(base, visited)?;
            let shifted = if negative {
                span.subtract_from(base_date)
            } else {
                span.add_to(base_date, 1)
            };
            return shifted.ok_or_else(|| ResolveError::BadDate(expr.to_string()));
        }

        if let Some(definition) = self.settings.get(expr).copied() {
            return self.follow(expr, definition, visited);
        }

        Err(ResolveError::BadDate(expr.to_string()))
    }

    fn follow<'e>(
        &self,
        name: &'e str,
        definition: &'a str,
        visited: &mut Vec<&'e str>,
    ) -> Result<NaiveDate, ResolveError>
    where
        'a: 'e,
    {
        if visited.contains(&name) {
            return Err(ResolveError::CyclicTrigger(name.to_string()));
        }
        visited.push(name);
        let resolved = self.resolve_inner(definition, visited);
        visited.pop();
        resolved
    }
}

/// Convenience wrapper building a one-off resolver
pub fn resolve_date(
    expr: &str,
    triggers: &[Trigger],
    settings: &[Setting],
) -> Result<NaiveDate, ResolveError> {
    DateResolver::new(triggers, settings).resolve(expr)
}

/// Split `base+3m` / `base-1y` at the last sign whose suffix is a valid span
fn split_offset(expr: &str) -> Option<(&str, bool, Span)> {
    let position = expr.rfind(['+', '-'])?;
    let base = expr[..position].trim();
    if base.is_empty() {
        return None;
    }
    let span: Span = expr[position + 1..].parse().ok()?;
    let negative = expr[position..].starts_with('-');
    Some((base, negative, span))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_literal_formats() {
        assert_eq!(parse_date("2018-01-01"), Some(date(2018, 1, 1)));
        assert_eq!(parse_date("01/02/2018"), Some(date(2018, 2, 1)));
        assert_eq!(parse_date("01 Jan 2018"), Some(date(2018, 1, 1)));
        assert_eq!(parse_date("Jan 01 2018"), Some(date(2018, 1, 1)));
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn test_trigger_chain_with_offsets() {
        let triggers = vec![
            Trigger::new("birth", "1980-06-15"),
            Trigger::new("retire", "birth+65y"),
            Trigger::new("downsize", "retire-6m"),
        ];

        assert_eq!(resolve_date("retire", &triggers, &[]), Ok(date(2045, 6, 15)));
        assert_eq!(resolve_date("downsize", &triggers, &[]), Ok(date(2044, 12, 15)));
        assert_eq!(resolve_date("downsize+2w", &triggers, &[]), Ok(date(2044, 12, 29)));
        assert_eq!(resolve_date("2018-01-31+1m", &triggers, &[]), Ok(date(2018, 2, 28)));
    }

    #[test]
    fn test_cycle_is_reported() {
        let triggers = vec![Trigger::new("a", "b+1d"), Trigger::new("b", "a")];

        assert!(matches!(
            resolve_date("a", &triggers, &[]),
            Err(ResolveError::CyclicTrigger(_))
        ));
        let self_ref = vec![Trigger::new("loop", "loop")];
        assert_eq!(
            resolve_date("loop", &self_ref, &[]),
            Err(ResolveError::CyclicTrigger("loop".to_string()))
        );
    }

    #[test]
    fn test_reserved_names_rejected() {
        let triggers = vec![Trigger::new("start-date", "2018-01-01")];

        assert_eq!(
            resolve_date("start-date", &triggers, &[]),
            Err(ResolveError::ReservedTriggerName("start-date".to_string()))
        );
    }

    #[test]
    fn test_setting_as_date_alias() {
        let settings = vec![Setting::new("Today's value focus date", "2019-03-01")];

        assert_eq!(
            resolve_date("Today's value focus date", &[], &settings),
            Ok(date(2019, 3, 1))
        );
    }

    #[test]
    fn test_unknown_expression() {
        assert_eq!(
            resolve_date("someday", &[], &[]),
            Err(ResolveError::BadDate("someday".to_string()))
        );
        assert!(resolve_date("", &[], &[]).is_err());
    }
}
