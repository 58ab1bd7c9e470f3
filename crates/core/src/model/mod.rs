mod card;
mod deck;
mod difficulty;
mod ids;
mod session;
mod stats;
mod tag;
mod user;

pub use ids::{CardId, DeckId, ParseIdError, UserId};

pub use card::{Card, CardDraft, CardError, MAX_CARD_TEXT_LEN, ValidatedCard};
pub use deck::{
    Deck, DeckDraft, DeckError, MAX_DECK_DESCRIPTION_LEN, MAX_DECK_NAME_LEN, Visibility,
};
pub use difficulty::{Difficulty, DifficultyFilter, ParseDifficultyError};
pub use session::{
    AnswerRecord, SessionError, SessionPhase, SessionStats, SessionSummary, StudySession,
};
pub use stats::{CardStats, StatsError, accuracy_percent};
pub use tag::{MAX_TAG_LEN, MAX_TAGS, TagError, TagName, TagSet};
pub use user::{Email, User, UserError, UserRole, Username};
