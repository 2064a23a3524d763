use thiserror::Error;

/// Errors surfaced by the study engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Ratings arrive as raw integers and are rejected before any
    /// scheduling or persistence happens.
    #[error("Invalid rating {0}: ratings run from 1 (Again) to 4 (Easy)")]
    InvalidRating(u32),

    #[error("Deck not found: {0}")]
    DeckNotFound(i64),

    #[error("Card not found: {0}")]
    CardNotFound(i64),

    #[error("Session not found: {0}")]
    SessionNotFound(i64),

    #[error("A deck named '{0}' already exists")]
    DuplicateDeck(String),

    #[error("Study session has no current card")]
    NoCurrentCard,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
