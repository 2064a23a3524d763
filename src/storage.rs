use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use serde::Serialize;

use crate::card::{Deck, Review, StoredCard, StudyMode};
use crate::error::{Error, Result};
use crate::scheduler::{MemoryState, Rating};

/// Per-deck totals for the deck list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckStats {
    pub deck: Deck,
    pub total_cards: i64,
    pub due_cards: i64,
}

/// A study session as stored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSession {
    pub id: i64,
    pub deck_id: Option<i64>,
    pub mode: StudyMode,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cards_studied: u32,
    pub duration_secs: u32,
}

#[derive(Debug)]
pub struct Storage {
    conn: Connection,
}

fn parse_timestamp(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    value
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn deck_from_row(row: &Row) -> rusqlite::Result<Deck> {
    Ok(Deck {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_timestamp(3, row.get(3)?)?,
    })
}

fn card_from_row(row: &Row) -> rusqlite::Result<StoredCard> {
    Ok(StoredCard {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        state: MemoryState {
            ease_factor: row.get(4)?,
            interval: row.get(5)?,
            repetitions: row.get(6)?,
            next_review: parse_timestamp(7, row.get(7)?)?,
        },
        created_at: parse_timestamp(8, row.get(8)?)?,
    })
}

fn review_from_row(row: &Row) -> rusqlite::Result<Review> {
    Ok(Review {
        id: row.get(0)?,
        card_id: row.get(1)?,
        session_id: row.get(2)?,
        rating: row.get(3)?,
        time_spent_secs: row.get(4)?,
        reviewed_at: parse_timestamp(5, row.get(5)?)?,
    })
}

fn session_from_row(row: &Row) -> rusqlite::Result<StoredSession> {
    Ok(StoredSession {
        id: row.get(0)?,
        deck_id: row.get(1)?,
        mode: StudyMode::from_stored(&row.get::<_, String>(2)?),
        started_at: parse_timestamp(3, row.get(3)?)?,
        completed_at: row.get::<_, Option<String>>(4)?.and_then(|s| s.parse().ok()),
        cards_studied: row.get(5)?,
        duration_secs: row.get(6)?,
    })
}

impl Storage {
    /// Open or create the database
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        let storage = Storage { conn };
        storage.init_schema()?;

        Ok(storage)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS decks (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cards (
                id INTEGER PRIMARY KEY,
                deck_id INTEGER NOT NULL,
                front TEXT NOT NULL,
                back TEXT NOT NULL,
                ease_factor REAL NOT NULL DEFAULT 2.5,
                interval INTEGER NOT NULL DEFAULT 0,
                repetitions INTEGER NOT NULL DEFAULT 0,
                next_review TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (deck_id) REFERENCES decks(id)
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY,
                deck_id INTEGER,
                mode TEXT NOT NULL DEFAULT 'flip',
                started_at TEXT NOT NULL,
                completed_at TEXT,
                cards_studied INTEGER NOT NULL DEFAULT 0,
                duration_secs INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (deck_id) REFERENCES decks(id)
            );

            CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY,
                card_id INTEGER NOT NULL,
                session_id INTEGER,
                rating INTEGER NOT NULL,
                time_spent_secs INTEGER NOT NULL DEFAULT 0,
                reviewed_at TEXT NOT NULL,
                FOREIGN KEY (card_id) REFERENCES cards(id),
                FOREIGN KEY (session_id) REFERENCES sessions(id)
            );

            CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards(deck_id);
            CREATE INDEX IF NOT EXISTS idx_cards_due ON cards(next_review);
            CREATE INDEX IF NOT EXISTS idx_reviews_card ON reviews(card_id);
            CREATE INDEX IF NOT EXISTS idx_reviews_date ON reviews(reviewed_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_completed ON sessions(completed_at);
            ",
        )?;

        Ok(())
    }

    /// Create a deck; names are unique
    pub fn create_deck(&self, name: &str, description: Option<&str>) -> Result<Deck> {
        if self.find_deck(name)?.is_some() {
            return Err(Error::DuplicateDeck(name.to_string()));
        }

        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO decks (name, description, created_at) VALUES (?1, ?2, ?3)",
            params![name, description, created_at.to_rfc3339()],
        )?;

        let deck = Deck {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at,
        };
        log::info!("Created deck '{}' (id {})", deck.name, deck.id);

        Ok(deck)
    }

    /// Get a deck by ID
    pub fn get_deck(&self, id: i64) -> Result<Deck> {
        let deck = self.conn.query_row(
            "SELECT id, name, description, created_at FROM decks WHERE id = ?1",
            params![id],
            deck_from_row,
        );

        match deck {
            Ok(deck) => Ok(deck),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(Error::DeckNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a deck by name
    pub fn find_deck(&self, name: &str) -> Result<Option<Deck>> {
        let deck = self.conn.query_row(
            "SELECT id, name, description, created_at FROM decks WHERE name = ?1",
            params![name],
            deck_from_row,
        );

        match deck {
            Ok(deck) => Ok(Some(deck)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All decks ordered by name
    pub fn list_decks(&self) -> Result<Vec<Deck>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, created_at FROM decks ORDER BY name",
        )?;

        let decks = stmt
            .query_map([], deck_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(decks)
    }

    /// Delete a deck with its cards and their reviews. Sessions that
    /// pointed at the deck are kept but detached.
    pub fn delete_deck(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "DELETE FROM reviews WHERE card_id IN (SELECT id FROM cards WHERE deck_id = ?1)",
            params![id],
        )?;
        tx.execute("DELETE FROM cards WHERE deck_id = ?1", params![id])?;
        tx.execute(
            "UPDATE sessions SET deck_id = NULL WHERE deck_id = ?1",
            params![id],
        )?;
        let deleted = tx.execute("DELETE FROM decks WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(Error::DeckNotFound(id));
        }

        tx.commit()?;
        log::info!("Deleted deck {id}");

        Ok(())
    }

    /// All decks with their card and due counts, including empty decks
    pub fn deck_stats(&self) -> Result<Vec<DeckStats>> {
        let now = Utc::now().to_rfc3339();

        let mut stmt = self.conn.prepare(
            "SELECT d.id, d.name, d.description, d.created_at,
                    COUNT(c.id),
                    COALESCE(SUM(CASE WHEN c.next_review <= ?1 THEN 1 ELSE 0 END), 0)
             FROM decks d
             LEFT JOIN cards c ON c.deck_id = d.id
             GROUP BY d.id
             ORDER BY d.name",
        )?;

        let stats = stmt
            .query_map(params![now], |row| {
                Ok(DeckStats {
                    deck: deck_from_row(row)?,
                    total_cards: row.get(4)?,
                    due_cards: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(stats)
    }

    /// Create a card in a deck, due for review immediately
    pub fn create_card(&self, deck_id: i64, front: &str, back: &str) -> Result<StoredCard> {
        self.get_deck(deck_id)?;

        let created_at = Utc::now();
        let state = MemoryState::new(created_at);
        self.conn.execute(
            "INSERT INTO cards (deck_id, front, back, ease_factor, interval, repetitions,
                                next_review, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                deck_id,
                front,
                back,
                state.ease_factor,
                state.interval,
                state.repetitions,
                state.next_review.to_rfc3339(),
                created_at.to_rfc3339(),
            ],
        )?;

        Ok(StoredCard {
            id: self.conn.last_insert_rowid(),
            deck_id,
            front: front.to_string(),
            back: back.to_string(),
            state,
            created_at,
        })
    }

    /// Get a card by ID
    pub fn get_card(&self, id: i64) -> Result<StoredCard> {
        let card = self.conn.query_row(
            "SELECT id, deck_id, front, back, ease_factor, interval, repetitions,
                    next_review, created_at
             FROM cards WHERE id = ?1",
            params![id],
            card_from_row,
        );

        match card {
            Ok(card) => Ok(card),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(Error::CardNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace a card's front and back text; scheduling state is untouched
    pub fn update_card(&self, id: i64, front: &str, back: &str) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE cards SET front = ?1, back = ?2 WHERE id = ?3",
            params![front, back, id],
        )?;
        if updated == 0 {
            return Err(Error::CardNotFound(id));
        }

        Ok(())
    }

    /// Delete a card and its review history
    pub fn delete_card(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM reviews WHERE card_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM cards WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(Error::CardNotFound(id));
        }

        tx.commit()?;

        Ok(())
    }

    /// All cards in a deck in creation order
    pub fn cards_for_deck(&self, deck_id: i64) -> Result<Vec<StoredCard>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, deck_id, front, back, ease_factor, interval, repetitions,
                    next_review, created_at
             FROM cards WHERE deck_id = ?1 ORDER BY id",
        )?;

        let cards = stmt
            .query_map(params![deck_id], card_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(cards)
    }

    /// Every card across all decks in creation order
    pub fn all_cards(&self) -> Result<Vec<StoredCard>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, deck_id, front, back, ease_factor, interval, repetitions,
                    next_review, created_at
             FROM cards ORDER BY id",
        )?;

        let cards = stmt
            .query_map([], card_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(cards)
    }

    /// Persist the outcome of one review: the card moves to `state` and a
    /// review row is appended. Both happen or neither does.
    pub fn apply_review(
        &mut self,
        card_id: i64,
        state: &MemoryState,
        rating: Rating,
        time_spent_secs: u32,
        session_id: Option<i64>,
    ) -> Result<Review> {
        let reviewed_at = Utc::now();
        let tx = self.conn.transaction()?;

        let updated = tx.execute(
            "UPDATE cards SET ease_factor = ?1, interval = ?2, repetitions = ?3,
                              next_review = ?4
             WHERE id = ?5",
            params![
                state.ease_factor,
                state.interval,
                state.repetitions,
                state.next_review.to_rfc3339(),
                card_id,
            ],
        )?;
        if updated == 0 {
            return Err(Error::CardNotFound(card_id));
        }

        tx.execute(
            "INSERT INTO reviews (card_id, session_id, rating, time_spent_secs, reviewed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                card_id,
                session_id,
                rating.as_u32(),
                time_spent_secs,
                reviewed_at.to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        tx.commit()?;
        log::debug!(
            "Card {card_id} rated {}; next review in {} days",
            rating.as_u32(),
            state.interval
        );

        Ok(Review {
            id,
            card_id,
            session_id,
            rating: rating.as_u32(),
            time_spent_secs,
            reviewed_at,
        })
    }

    /// Start a session row; totals stay zero until it completes
    pub fn create_session(&self, deck_id: Option<i64>, mode: StudyMode) -> Result<StoredSession> {
        if let Some(deck_id) = deck_id {
            self.get_deck(deck_id)?;
        }

        let started_at = Utc::now();
        self.conn.execute(
            "INSERT INTO sessions (deck_id, mode, started_at) VALUES (?1, ?2, ?3)",
            params![deck_id, mode.as_str(), started_at.to_rfc3339()],
        )?;

        Ok(StoredSession {
            id: self.conn.last_insert_rowid(),
            deck_id,
            mode,
            started_at,
            completed_at: None,
            cards_studied: 0,
            duration_secs: 0,
        })
    }

    /// Mark a session finished and record its totals
    pub fn complete_session(&self, id: i64, cards_studied: u32, duration_secs: u32) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE sessions SET completed_at = ?1, cards_studied = ?2, duration_secs = ?3
             WHERE id = ?4",
            params![Utc::now().to_rfc3339(), cards_studied, duration_secs, id],
        )?;
        if updated == 0 {
            return Err(Error::SessionNotFound(id));
        }
        log::info!("Session {id} completed: {cards_studied} cards in {duration_secs}s");

        Ok(())
    }

    /// Most recently completed sessions, newest first
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<StoredSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, deck_id, mode, started_at, completed_at, cards_studied, duration_secs
             FROM sessions WHERE completed_at IS NOT NULL
             ORDER BY completed_at DESC LIMIT ?1",
        )?;

        let sessions = stmt
            .query_map(params![limit as i64], session_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(sessions)
    }

    /// Distinct UTC days with at least one review, newest first
    pub fn review_days(&self) -> Result<Vec<NaiveDate>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT date(reviewed_at) FROM reviews ORDER BY 1 DESC")?;

        let days = stmt
            .query_map([], |row| {
                let day: String = row.get(0)?;
                day.parse().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(days)
    }

    /// Reviews recorded at or after `cutoff`, oldest first
    pub fn reviews_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Review>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, card_id, session_id, rating, time_spent_secs, reviewed_at
             FROM reviews WHERE reviewed_at >= ?1 ORDER BY reviewed_at ASC",
        )?;

        let reviews = stmt
            .query_map(params![cutoff.to_rfc3339()], review_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(reviews)
    }

    pub fn deck_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM decks", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn card_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Cards due now, optionally scoped to one deck
    pub fn due_count(&self, deck_id: Option<i64>) -> Result<i64> {
        let now = Utc::now().to_rfc3339();

        let count = match deck_id {
            Some(deck_id) => self.conn.query_row(
                "SELECT COUNT(*) FROM cards WHERE deck_id = ?1 AND next_review <= ?2",
                params![deck_id, now],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                "SELECT COUNT(*) FROM cards WHERE next_review <= ?1",
                params![now],
                |row| row.get(0),
            )?,
        };

        Ok(count)
    }

    /// Cards whose scheduling state has crossed the given thresholds
    pub fn mastered_count(&self, min_repetitions: u32, min_ease: f64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM cards WHERE repetitions >= ?1 AND ease_factor >= ?2",
            params![min_repetitions, min_ease],
            |row| row.get(0),
        )?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::schedule_at;
    use chrono::Duration;
    use tempfile::TempDir;

    fn open_storage() -> (TempDir, Storage) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(&dir.path().join("mnemo.db")).unwrap();
        (dir, storage)
    }

    fn future_state(days: i64) -> MemoryState {
        MemoryState {
            next_review: Utc::now() + Duration::days(days),
            ..MemoryState::new(Utc::now())
        }
    }

    #[test]
    fn test_create_and_get_deck() {
        let (_dir, storage) = open_storage();
        let deck = storage.create_deck("Spanish", Some("Core vocabulary")).unwrap();
        assert!(deck.id > 0);

        let fetched = storage.get_deck(deck.id).unwrap();
        assert_eq!(fetched.name, "Spanish");
        assert_eq!(fetched.description.as_deref(), Some("Core vocabulary"));
    }

    #[test]
    fn test_duplicate_deck_name_rejected() {
        let (_dir, storage) = open_storage();
        storage.create_deck("Spanish", None).unwrap();

        let err = storage.create_deck("Spanish", None).unwrap_err();
        assert!(matches!(err, Error::DuplicateDeck(name) if name == "Spanish"));
        assert_eq!(storage.deck_count().unwrap(), 1);
    }

    #[test]
    fn test_missing_deck() {
        let (_dir, storage) = open_storage();
        assert!(matches!(storage.get_deck(42), Err(Error::DeckNotFound(42))));
        assert!(storage.find_deck("nothing").unwrap().is_none());
    }

    #[test]
    fn test_list_decks_ordered_by_name() {
        let (_dir, storage) = open_storage();
        storage.create_deck("Physics", None).unwrap();
        storage.create_deck("Anatomy", None).unwrap();

        let names: Vec<String> = storage
            .list_decks()
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Anatomy", "Physics"]);
    }

    #[test]
    fn test_new_card_is_due_immediately() {
        let (_dir, storage) = open_storage();
        let deck = storage.create_deck("Spanish", None).unwrap();
        let card = storage.create_card(deck.id, "hola", "hello").unwrap();

        assert_eq!(card.state.ease_factor, 2.5);
        assert_eq!(card.state.interval, 0);
        assert_eq!(card.state.repetitions, 0);
        assert_eq!(storage.due_count(Some(deck.id)).unwrap(), 1);

        let fetched = storage.get_card(card.id).unwrap();
        assert_eq!(fetched, card);
    }

    #[test]
    fn test_create_card_requires_deck() {
        let (_dir, storage) = open_storage();
        let err = storage.create_card(7, "front", "back").unwrap_err();
        assert!(matches!(err, Error::DeckNotFound(7)));
    }

    #[test]
    fn test_update_card_text_only() {
        let (_dir, storage) = open_storage();
        let deck = storage.create_deck("Spanish", None).unwrap();
        let card = storage.create_card(deck.id, "hola", "helo").unwrap();

        storage.update_card(card.id, "hola", "hello").unwrap();
        let fetched = storage.get_card(card.id).unwrap();
        assert_eq!(fetched.back, "hello");
        assert_eq!(fetched.state, card.state);

        assert!(matches!(
            storage.update_card(99, "a", "b"),
            Err(Error::CardNotFound(99))
        ));
    }

    #[test]
    fn test_apply_review_updates_card_and_appends_review() {
        let (_dir, mut storage) = open_storage();
        let deck = storage.create_deck("Spanish", None).unwrap();
        let card = storage.create_card(deck.id, "hola", "hello").unwrap();

        let new_state = schedule_at(Rating::Good, &card.state, Utc::now());
        let review = storage
            .apply_review(card.id, &new_state, Rating::Good, 7, None)
            .unwrap();
        assert_eq!(review.rating, 3);
        assert_eq!(review.time_spent_secs, 7);
        assert_eq!(review.session_id, None);

        let fetched = storage.get_card(card.id).unwrap();
        assert_eq!(fetched.state, new_state);
        assert_eq!(storage.due_count(Some(deck.id)).unwrap(), 0);
    }

    #[test]
    fn test_apply_review_missing_card_leaves_no_trace() {
        let (_dir, mut storage) = open_storage();
        let err = storage
            .apply_review(99, &future_state(1), Rating::Good, 5, None)
            .unwrap_err();
        assert!(matches!(err, Error::CardNotFound(99)));

        let reviews = storage
            .reviews_since(Utc::now() - Duration::days(1))
            .unwrap();
        assert!(reviews.is_empty());
    }

    #[test]
    fn test_delete_card_removes_review_history() {
        let (_dir, mut storage) = open_storage();
        let deck = storage.create_deck("Spanish", None).unwrap();
        let card = storage.create_card(deck.id, "hola", "hello").unwrap();
        storage
            .apply_review(card.id, &future_state(1), Rating::Good, 4, None)
            .unwrap();

        storage.delete_card(card.id).unwrap();
        assert!(matches!(
            storage.get_card(card.id),
            Err(Error::CardNotFound(_))
        ));
        let reviews = storage
            .reviews_since(Utc::now() - Duration::days(1))
            .unwrap();
        assert!(reviews.is_empty());

        assert!(matches!(
            storage.delete_card(card.id),
            Err(Error::CardNotFound(_))
        ));
    }

    #[test]
    fn test_delete_deck_cascades_and_detaches_sessions() {
        let (_dir, mut storage) = open_storage();
        let deck = storage.create_deck("Spanish", None).unwrap();
        let card = storage.create_card(deck.id, "hola", "hello").unwrap();
        let session = storage
            .create_session(Some(deck.id), StudyMode::Flip)
            .unwrap();
        storage
            .apply_review(card.id, &future_state(1), Rating::Good, 4, Some(session.id))
            .unwrap();
        storage.complete_session(session.id, 1, 10).unwrap();

        storage.delete_deck(deck.id).unwrap();
        assert!(matches!(
            storage.get_deck(deck.id),
            Err(Error::DeckNotFound(_))
        ));
        assert!(matches!(
            storage.get_card(card.id),
            Err(Error::CardNotFound(_))
        ));
        assert_eq!(storage.card_count().unwrap(), 0);

        let sessions = storage.recent_sessions(10).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].deck_id, None);

        assert!(matches!(
            storage.delete_deck(deck.id),
            Err(Error::DeckNotFound(_))
        ));
    }

    #[test]
    fn test_cards_span_decks() {
        let (_dir, storage) = open_storage();
        let spanish = storage.create_deck("Spanish", None).unwrap();
        let physics = storage.create_deck("Physics", None).unwrap();
        storage.create_card(spanish.id, "hola", "hello").unwrap();
        storage.create_card(spanish.id, "adios", "goodbye").unwrap();
        storage.create_card(physics.id, "c", "299792458 m/s").unwrap();

        assert_eq!(storage.all_cards().unwrap().len(), 3);
        assert_eq!(storage.cards_for_deck(spanish.id).unwrap().len(), 2);
        assert_eq!(storage.cards_for_deck(physics.id).unwrap().len(), 1);
    }

    #[test]
    fn test_due_count_scopes_by_deck() {
        let (_dir, mut storage) = open_storage();
        let spanish = storage.create_deck("Spanish", None).unwrap();
        let physics = storage.create_deck("Physics", None).unwrap();
        let hola = storage.create_card(spanish.id, "hola", "hello").unwrap();
        storage.create_card(physics.id, "c", "299792458 m/s").unwrap();

        assert_eq!(storage.due_count(None).unwrap(), 2);

        storage
            .apply_review(hola.id, &future_state(3), Rating::Good, 5, None)
            .unwrap();
        assert_eq!(storage.due_count(None).unwrap(), 1);
        assert_eq!(storage.due_count(Some(spanish.id)).unwrap(), 0);
        assert_eq!(storage.due_count(Some(physics.id)).unwrap(), 1);
    }

    #[test]
    fn test_deck_stats_includes_empty_decks() {
        let (_dir, mut storage) = open_storage();
        let spanish = storage.create_deck("Spanish", None).unwrap();
        storage.create_deck("Empty", None).unwrap();
        storage.create_card(spanish.id, "hola", "hello").unwrap();
        let adios = storage.create_card(spanish.id, "adios", "goodbye").unwrap();
        storage
            .apply_review(adios.id, &future_state(3), Rating::Good, 5, None)
            .unwrap();

        let stats = storage.deck_stats().unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].deck.name, "Empty");
        assert_eq!(stats[0].total_cards, 0);
        assert_eq!(stats[0].due_cards, 0);
        assert_eq!(stats[1].deck.name, "Spanish");
        assert_eq!(stats[1].total_cards, 2);
        assert_eq!(stats[1].due_cards, 1);
    }

    #[test]
    fn test_session_lifecycle() {
        let (_dir, storage) = open_storage();
        let deck = storage.create_deck("Spanish", None).unwrap();

        let session = storage
            .create_session(Some(deck.id), StudyMode::Typing)
            .unwrap();
        assert_eq!(session.completed_at, None);
        assert!(storage.recent_sessions(10).unwrap().is_empty());

        storage.complete_session(session.id, 3, 95).unwrap();
        let sessions = storage.recent_sessions(10).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].mode, StudyMode::Typing);
        assert_eq!(sessions[0].cards_studied, 3);
        assert_eq!(sessions[0].duration_secs, 95);
        assert!(sessions[0].completed_at.is_some());

        assert!(matches!(
            storage.complete_session(99, 0, 0),
            Err(Error::SessionNotFound(99))
        ));
        assert!(matches!(
            storage.create_session(Some(41), StudyMode::Flip),
            Err(Error::DeckNotFound(41))
        ));
    }

    #[test]
    fn test_recent_sessions_newest_first() {
        let (_dir, storage) = open_storage();
        let first = storage.create_session(None, StudyMode::Flip).unwrap();
        let second = storage.create_session(None, StudyMode::Flip).unwrap();
        let third = storage.create_session(None, StudyMode::Flip).unwrap();

        storage.complete_session(first.id, 1, 5).unwrap();
        storage.complete_session(second.id, 2, 5).unwrap();
        storage.complete_session(third.id, 3, 5).unwrap();

        let ids: Vec<i64> = storage
            .recent_sessions(2)
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![third.id, second.id]);
    }

    #[test]
    fn test_review_days_are_distinct() {
        let (_dir, mut storage) = open_storage();
        let deck = storage.create_deck("Spanish", None).unwrap();
        let card = storage.create_card(deck.id, "hola", "hello").unwrap();

        storage
            .apply_review(card.id, &future_state(1), Rating::Good, 3, None)
            .unwrap();
        storage
            .apply_review(card.id, &future_state(2), Rating::Good, 3, None)
            .unwrap();

        let days = storage.review_days().unwrap();
        assert_eq!(days, vec![Utc::now().date_naive()]);
    }

    #[test]
    fn test_mastered_count_thresholds() {
        let (_dir, mut storage) = open_storage();
        let deck = storage.create_deck("Spanish", None).unwrap();
        let mastered = storage.create_card(deck.id, "uno", "one").unwrap();
        let lapsed = storage.create_card(deck.id, "dos", "two").unwrap();
        storage.create_card(deck.id, "tres", "three").unwrap();

        let strong = MemoryState {
            ease_factor: 2.5,
            repetitions: 3,
            ..future_state(15)
        };
        storage
            .apply_review(mastered.id, &strong, Rating::Good, 5, None)
            .unwrap();

        let weak = MemoryState {
            ease_factor: 2.1,
            repetitions: 6,
            ..future_state(4)
        };
        storage
            .apply_review(lapsed.id, &weak, Rating::Good, 5, None)
            .unwrap();

        assert_eq!(storage.mastered_count(3, 2.5).unwrap(), 1);
    }
}
