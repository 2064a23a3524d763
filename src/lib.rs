//! Flashcard study engine built on an SM-2 derived scheduler.
//!
//! The pieces fit together in three layers: [`scheduler`] is the pure
//! state transition applied on every review, [`card`] holds the data
//! model and the due-card selector, and [`storage`] persists decks,
//! cards, reviews and sessions in SQLite. [`session`] drives one pass
//! over the due queue and [`stats`] derives streaks and accuracy from
//! the review history.

pub mod card;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod stats;
pub mod storage;

pub use card::{Deck, Review, StoredCard, StudyMode, due_cards};
pub use config::Config;
pub use error::{Error, Result};
pub use scheduler::{MemoryState, Rating, schedule, schedule_at};
pub use session::{SessionSummary, StudySession};
pub use stats::{DailyPerformance, Overview, daily_performance, overview, study_streak};
pub use storage::{DeckStats, Storage, StoredSession};
