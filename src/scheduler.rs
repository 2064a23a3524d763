use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ease factors never drop below this floor
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Ease factor assigned to a card that has never been reviewed
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// How well the user recalled a card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    /// Forgot the answer
    Again = 1,
    /// Recalled with serious difficulty
    Hard = 2,
    /// Recalled with some effort
    Good = 3,
    /// Recalled instantly
    Easy = 4,
}

impl Rating {
    /// Parse a raw 1-4 rating as submitted from outside the engine
    pub fn from_value(value: u32) -> Result<Self> {
        match value {
            1 => Ok(Rating::Again),
            2 => Ok(Rating::Hard),
            3 => Ok(Rating::Good),
            4 => Ok(Rating::Easy),
            other => Err(Error::InvalidRating(other)),
        }
    }

    /// Numeric value as stored in review records (1-4)
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// Good and Easy count as successful recall
    pub fn is_correct(&self) -> bool {
        self.as_u32() >= 3
    }
}

/// Spaced-repetition state carried by every card
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    /// Interval growth multiplier, floored at [`MIN_EASE_FACTOR`]
    pub ease_factor: f64,
    /// Days between the last review and the next one
    pub interval: u32,
    /// Consecutive successful reviews since the last failure
    pub repetitions: u32,
    /// The card is due once this instant has passed
    pub next_review: DateTime<Utc>,
}

impl MemoryState {
    /// State for a card that has never been reviewed; due immediately
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            ease_factor: DEFAULT_EASE_FACTOR,
            interval: 0,
            repetitions: 0,
            next_review: created_at,
        }
    }

    /// A card is due once its scheduled review time has arrived
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review <= now
    }
}

/// Compute the state a card moves to after being reviewed at `now`.
///
/// This is the SM-2 variant the whole engine is built around: successful
/// recall walks the interval through 1 day, 6 days, then multiplies by the
/// ease factor; failure restarts the run at 1 day. The ease factor moves by
/// `0.1 - (4 - rating) * (0.08 + (4 - rating) * 0.02)` on every review,
/// success or not, and Easy/Hard apply a final interval adjustment on top.
pub fn schedule_at(rating: Rating, current: &MemoryState, now: DateTime<Utc>) -> MemoryState {
    let mut ease_factor = current.ease_factor;
    let mut interval = current.interval;
    let mut repetitions = current.repetitions;

    if rating.is_correct() {
        interval = match repetitions {
            0 => 1,
            1 => 6,
            _ => (interval as f64 * ease_factor).round() as u32,
        };
        repetitions += 1;
    } else {
        // Failed recall restarts the repetition run at a one-day interval
        repetitions = 0;
        interval = 1;
    }

    let q = rating.as_u32() as f64;
    ease_factor += 0.1 - (4.0 - q) * (0.08 + (4.0 - q) * 0.02);
    if ease_factor < MIN_EASE_FACTOR {
        ease_factor = MIN_EASE_FACTOR;
    }

    // Final adjustment for the extreme ratings. This runs after the failure
    // branch too, so a Hard lapse still lands on max(1, round(0.5)) = 1.
    match rating {
        Rating::Easy => interval = (interval as f64 * 1.3).round() as u32,
        Rating::Hard => interval = ((interval as f64 * 0.5).round() as u32).max(1),
        Rating::Again | Rating::Good => {}
    }

    MemoryState {
        ease_factor: (ease_factor * 100.0).round() / 100.0,
        interval,
        repetitions,
        next_review: now + Days::new(u64::from(interval)),
    }
}

/// Schedule the next review as of the current instant
pub fn schedule(rating: Rating, current: &MemoryState) -> MemoryState {
    schedule_at(rating, current, Utc::now())
}
