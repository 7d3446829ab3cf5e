//! Resolution of dates, numbers and growth factors
//!
//! Items refer to triggers and settings by name. Resolution is lazy: settings are read
//! through the running setting table, so a revalued setting applies from its revaluation
//! date onward. Chains of names are walked with an explicit visited list, turning
//! self-reference into a reported error instead of unbounded recursion.

mod growth;
mod span;
mod triggers;
mod values;

pub use growth::{annual_to_period, period_factor};
pub use span::{Frequency, Span, SpanUnit};
pub use triggers::{parse_date, resolve_date, DateResolver};
pub use values::{parse_number, resolve_number, resolve_proportion, SettingSource};

/// Failure to turn an expression into a date or a number
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("unrecognised date expression '{0}'")]
    BadDate(String),
    #[error("cyclic trigger definition involving '{0}'")]
    CyclicTrigger(String),
    #[error("trigger name '{0}' contains reserved offset syntax")]
    ReservedTriggerName(String),
    #[error("could not interpret '{0}' as a number")]
    BadNumber(String),
    #[error("unknown setting '{0}'")]
    MissingSetting(String),
    #[error("cyclic setting reference involving '{0}'")]
    CyclicSetting(String),
    #[error("invalid recurrence '{0}'")]
    BadRecurrence(String),
}

impl ResolveError {
    /// Errors that invalidate the whole run rather than a single item
    pub fn is_systemic(&self) -> bool {
        matches!(self, ResolveError::CyclicTrigger(_))
    }
}

/// Parse a recurrence; empty text means a single occurrence
pub fn parse_recurrence(text: &str) -> Result<Option<Span>, ResolveError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    match text.parse::<Span>() {
        Ok(span) if span.count > 0 => Ok(Some(span)),
        _ => Err(ResolveError::BadRecurrence(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recurrence() {
        assert_eq!(parse_recurrence(""), Ok(None));
        assert_eq!(parse_recurrence("2m"), Ok(Some(Span::new(2, SpanUnit::Months))));
        assert_eq!(
            parse_recurrence("0m"),
            Err(ResolveError::BadRecurrence("0m".to_string()))
        );
        assert!(parse_recurrence("monthly").is_err());
    }

    #[test]
    fn test_systemic_errors() {
        assert!(ResolveError::CyclicTrigger("a".into()).is_systemic());
        assert!(!ResolveError::BadNumber("x".into()).is_systemic());
    }
}
