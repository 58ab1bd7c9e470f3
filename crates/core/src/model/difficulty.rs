use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid difficulty: {0}")]
pub struct ParseDifficultyError(String);

/// Static, user-chosen difficulty label for a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(ParseDifficultyError(s.to_owned())),
        }
    }
}

/// Card selection filter for listing and study sessions.
///
/// `All` is what the caller gets for "all", an empty string, or no filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DifficultyFilter {
    #[default]
    All,
    Only(Difficulty),
}

impl DifficultyFilter {
    #[must_use]
    pub fn matches(self, difficulty: Difficulty) -> bool {
        match self {
            DifficultyFilter::All => true,
            DifficultyFilter::Only(wanted) => wanted == difficulty,
        }
    }

    /// The difficulty to restrict to, if any.
    #[must_use]
    pub fn difficulty(self) -> Option<Difficulty> {
        match self {
            DifficultyFilter::All => None,
            DifficultyFilter::Only(d) => Some(d),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyFilter::All => "all",
            DifficultyFilter::Only(d) => d.as_str(),
        }
    }
}

impl From<Option<Difficulty>> for DifficultyFilter {
    fn from(value: Option<Difficulty>) -> Self {
        value.map_or(DifficultyFilter::All, DifficultyFilter::Only)
    }
}

impl fmt::Display for DifficultyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyFilter {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(DifficultyFilter::All);
        }
        trimmed.parse().map(DifficultyFilter::Only)
    }
}
