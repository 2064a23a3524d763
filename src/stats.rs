use std::collections::HashSet;

use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;

use crate::card::Review;
use crate::error::Result;
use crate::storage::Storage;

/// Upper bound on the streak walk
const STREAK_LIMIT_DAYS: u32 = 365;

/// Thresholds a card must reach to count as mastered
pub const MASTERY_MIN_REPETITIONS: u32 = 3;
pub const MASTERY_MIN_EASE: f64 = 2.5;

/// How many days the performance chart covers
pub const PERFORMANCE_WINDOW_DAYS: u32 = 7;

/// Aggregate totals for the stats screen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_decks: i64,
    pub total_cards: i64,
    pub due_now: i64,
    pub mastered_cards: i64,
    pub study_streak: u32,
}

/// One day's review totals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPerformance {
    pub date: NaiveDate,
    pub reviews: u32,
    pub correct: u32,
    /// Percentage 0-100, rounded; zero on days with no reviews
    pub accuracy: u32,
}

/// Count consecutive days with at least one review, walking back from
/// `today`. A day without reviews breaks the run, except that `today`
/// itself may still be empty when yesterday's run is intact.
pub fn study_streak(review_days: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = today;

    loop {
        if review_days.contains(&day) {
            streak += 1;
            if streak >= STREAK_LIMIT_DAYS {
                break;
            }
        } else if !(streak == 0 && day == today) {
            break;
        }

        let Some(previous) = day.pred_opt() else {
            break;
        };
        day = previous;
    }

    streak
}

/// Bucket reviews into the `days` UTC days ending at `today`, zero-filling
/// empty days. Ratings of Good or better count as correct.
pub fn daily_performance(reviews: &[Review], today: NaiveDate, days: u32) -> Vec<DailyPerformance> {
    let days = days.max(1);
    let start = today - Days::new(u64::from(days) - 1);

    let mut buckets: Vec<DailyPerformance> = (0..days)
        .map(|offset| DailyPerformance {
            date: start + Days::new(u64::from(offset)),
            reviews: 0,
            correct: 0,
            accuracy: 0,
        })
        .collect();

    for review in reviews {
        let date = review.reviewed_at.date_naive();
        let Ok(offset) = usize::try_from((date - start).num_days()) else {
            continue;
        };
        let Some(bucket) = buckets.get_mut(offset) else {
            continue;
        };
        bucket.reviews += 1;
        if review.rating >= 3 {
            bucket.correct += 1;
        }
    }

    for bucket in &mut buckets {
        if bucket.reviews > 0 {
            bucket.accuracy =
                ((bucket.correct as f64 / bucket.reviews as f64) * 100.0).round() as u32;
        }
    }

    buckets
}

/// Collect the overview numbers from storage as of now
pub fn overview(storage: &Storage) -> Result<Overview> {
    let review_days: HashSet<NaiveDate> = storage.review_days()?.into_iter().collect();

    Ok(Overview {
        total_decks: storage.deck_count()?,
        total_cards: storage.card_count()?,
        due_now: storage.due_count(None)?,
        mastered_cards: storage.mastered_count(MASTERY_MIN_REPETITIONS, MASTERY_MIN_EASE)?,
        study_streak: study_streak(&review_days, Utc::now().date_naive()),
    })
}
