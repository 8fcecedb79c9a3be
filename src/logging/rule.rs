//! Firing policies for logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// When a log writes, and what rows it emits.
///
/// The scalar rules (`Always` through `Change`) write one row of
/// numerically formatted current values when they fire; `Streak` and
/// `Deck` are multi-row rules that format raw text and keep per-log
/// cursors into the data they drain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rule {
    /// One row on every fire, unconditionally.
    Always,
    /// Headers only, never a data row.
    Never,
    /// One row at the first fire, nothing ever after.
    Once,
    /// One row when any bound share was written since the last fire.
    Update,
    /// One row when any projected field's value differs from the cached
    /// last row.
    Change,
    /// Rows for elements appended to list-valued fields since the last
    /// drain; scalar fields emit one row per fire.
    Streak,
    /// Rows for entries pushed to bound decks since the last drain.
    Deck,
}

impl Rule {
    /// The capitalized token written into the sink's first header line.
    pub fn title(self) -> &'static str {
        match self {
            Rule::Always => "Always",
            Rule::Never => "Never",
            Rule::Once => "Once",
            Rule::Update => "Update",
            Rule::Change => "Change",
            Rule::Streak => "Streak",
            Rule::Deck => "Deck",
        }
    }

    /// True for the rules that format values as raw text.
    pub fn is_raw(self) -> bool {
        matches!(self, Rule::Streak | Rule::Deck)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_are_capitalized_tokens() {
        assert_eq!(Rule::Always.title(), "Always");
        assert_eq!(Rule::Never.title(), "Never");
        assert_eq!(Rule::Once.title(), "Once");
        assert_eq!(Rule::Update.title(), "Update");
        assert_eq!(Rule::Change.title(), "Change");
        assert_eq!(Rule::Streak.title(), "Streak");
        assert_eq!(Rule::Deck.title(), "Deck");
    }

    #[test]
    fn only_streak_and_deck_are_raw() {
        assert!(Rule::Streak.is_raw());
        assert!(Rule::Deck.is_raw());
        assert!(!Rule::Always.is_raw());
        assert!(!Rule::Update.is_raw());
    }
}
