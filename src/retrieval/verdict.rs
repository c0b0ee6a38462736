use std::fmt;

use crate::config::VerdictStrategyKind;

/// Reading of a yes/no classifier answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Affirm,
    Deny,
    Ambiguous,
}

/// Turns free-text classifier output into a `Verdict`.
pub trait VerdictStrategy: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn judge(&self, answer: &str) -> Verdict;
}

/// `Deny` whenever the answer contains "no" in any case, anywhere, else `Affirm`.
///
/// "I don't know" and "not sure" are therefore denials, and empty or
/// malformed answers are affirmations.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSubstringStrategy;

impl VerdictStrategy for NoSubstringStrategy {
    fn name(&self) -> &'static str {
        "substring"
    }

    fn judge(&self, answer: &str) -> Verdict {
        if answer.to_lowercase().contains("no") {
            Verdict::Deny
        } else {
            Verdict::Affirm
        }
    }
}

/// Accepts a bare "yes" or "no" (surrounding punctuation and case ignored).
/// Anything else is `Ambiguous`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictYesNoStrategy;

impl VerdictStrategy for StrictYesNoStrategy {
    fn name(&self) -> &'static str {
        "strict"
    }

    fn judge(&self, answer: &str) -> Verdict {
        let word = answer
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        match word.as_str() {
            "yes" => Verdict::Affirm,
            "no" => Verdict::Deny,
            _ => Verdict::Ambiguous,
        }
    }
}

pub fn strategy_for(kind: VerdictStrategyKind) -> Box<dyn VerdictStrategy> {
    match kind {
        VerdictStrategyKind::Substring => Box::new(NoSubstringStrategy),
        VerdictStrategyKind::Strict => Box::new(StrictYesNoStrategy),
    }
}
