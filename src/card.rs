use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::MemoryState;

/// A named collection of flashcards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A flashcard together with its spaced-repetition state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCard {
    pub id: i64,
    pub deck_id: i64,
    pub front: String,
    pub back: String,
    pub state: MemoryState,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of a single rating event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub card_id: i64,
    pub session_id: Option<i64>,
    /// Raw 1-4 rating as submitted
    pub rating: u32,
    pub time_spent_secs: u32,
    pub reviewed_at: DateTime<Utc>,
}

/// How cards were presented during a session. Recorded for history only;
/// scheduling is identical in every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StudyMode {
    #[default]
    Flip,
    MultipleChoice,
    Typing,
}

impl StudyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudyMode::Flip => "flip",
            StudyMode::MultipleChoice => "multiple-choice",
            StudyMode::Typing => "typing",
        }
    }

    /// Stored form back to the enum; unknown values fall back to Flip
    pub fn from_stored(s: &str) -> Self {
        match s {
            "multiple-choice" => StudyMode::MultipleChoice,
            "typing" => StudyMode::Typing,
            _ => StudyMode::Flip,
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter `cards` down to the ones due at `now`, preserving input order.
/// A card with `next_review` exactly equal to `now` is due.
pub fn due_cards(cards: &[StoredCard], now: DateTime<Utc>) -> Vec<&StoredCard> {
    cards.iter().filter(|card| card.state.is_due(now)).collect()
}
