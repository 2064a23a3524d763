use std::time::Instant;

use chrono::Utc;
use rand::seq::SliceRandom;

use crate::card::{StoredCard, StudyMode, due_cards};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::scheduler::{self, MemoryState, Rating};
use crate::storage::Storage;

/// Totals reported when a study session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub cards_studied: u32,
    pub correct: u32,
    pub duration_secs: u32,
}

/// One pass over the cards that were due when the session began.
///
/// The queue is fixed up front: cards that become due while studying wait
/// for the next session, and every queued card is shown exactly once.
#[derive(Debug)]
pub struct StudySession<'a> {
    storage: &'a mut Storage,
    session_id: i64,
    queue: Vec<StoredCard>,
    position: usize,
    studied: u32,
    correct: u32,
    started: Instant,
}

impl<'a> StudySession<'a> {
    /// Build the due queue and open a session record. Returns `None` when
    /// nothing is due, in which case no session row is written.
    pub fn begin(
        storage: &'a mut Storage,
        config: &Config,
        deck_id: Option<i64>,
        mode: StudyMode,
    ) -> Result<Option<Self>> {
        let cards = match deck_id {
            Some(deck_id) => {
                storage.get_deck(deck_id)?;
                storage.cards_for_deck(deck_id)?
            }
            None => storage.all_cards()?,
        };

        let now = Utc::now();
        let mut queue: Vec<StoredCard> =
            due_cards(&cards, now).into_iter().cloned().collect();
        if config.shuffle_cards {
            queue.shuffle(&mut rand::rng());
        }
        if let Some(cap) = config.max_session_cards {
            queue.truncate(cap);
        }
        if queue.is_empty() {
            return Ok(None);
        }

        let record = storage.create_session(deck_id, mode)?;
        log::info!(
            "Started session {} with {} due cards",
            record.id,
            queue.len()
        );

        Ok(Some(Self {
            storage,
            session_id: record.id,
            queue,
            position: 0,
            studied: 0,
            correct: 0,
            started: Instant::now(),
        }))
    }

    pub fn id(&self) -> i64 {
        self.session_id
    }

    /// The card currently being studied, or `None` once the queue is done
    pub fn current_card(&self) -> Option<&StoredCard> {
        self.queue.get(self.position)
    }

    pub fn total_cards(&self) -> usize {
        self.queue.len()
    }

    pub fn cards_studied(&self) -> u32 {
        self.studied
    }

    pub fn is_complete(&self) -> bool {
        self.position >= self.queue.len()
    }

    /// Grade the current card and move to the next one. The card's new
    /// state is persisted together with a review record before the queue
    /// advances, so a storage failure leaves the session retryable.
    pub fn submit(&mut self, rating: Rating, time_spent_secs: u32) -> Result<MemoryState> {
        let Some(card) = self.queue.get(self.position) else {
            return Err(Error::NoCurrentCard);
        };

        let new_state = scheduler::schedule(rating, &card.state);
        self.storage.apply_review(
            card.id,
            &new_state,
            rating,
            time_spent_secs,
            Some(self.session_id),
        )?;

        self.studied += 1;
        if rating.is_correct() {
            self.correct += 1;
        }
        self.position += 1;

        Ok(new_state)
    }

    /// Close the session record with wall-clock duration and actual
    /// submission count, consuming the session.
    pub fn finish(self) -> Result<SessionSummary> {
        let duration_secs = self.started.elapsed().as_secs() as u32;
        self.storage
            .complete_session(self.session_id, self.studied, duration_secs)?;

        Ok(SessionSummary {
            cards_studied: self.studied,
            correct: self.correct,
            duration_secs,
        })
    }
}
