use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Longest tag name accepted, in characters.
pub const MAX_TAG_LEN: usize = 20;

/// Most tags a card or deck may carry.
pub const MAX_TAGS: usize = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TagError {
    #[error("tag name cannot be empty")]
    EmptyName,

    #[error("tag name exceeds {MAX_TAG_LEN} characters: {len}")]
    TooLong { len: usize },

    #[error("at most {MAX_TAGS} tags are allowed, got {count}")]
    TooMany { count: usize },
}

/// Validated tag name (trimmed, non-empty, at most 20 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagName(String);

impl TagName {
    /// Create a validated tag name.
    ///
    /// # Errors
    ///
    /// Returns `TagError::EmptyName` if the name is blank and
    /// `TagError::TooLong` past [`MAX_TAG_LEN`] characters.
    pub fn new(value: impl Into<String>) -> Result<Self, TagError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TagError::EmptyName);
        }
        let len = trimmed.chars().count();
        if len > MAX_TAG_LEN {
            return Err(TagError::TooLong { len });
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TagName {
    type Error = TagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TagName> for String {
    fn from(value: TagName) -> Self {
        value.0
    }
}

/// Ordered, duplicate-free set of at most [`MAX_TAGS`] tags.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<TagName>", into = "Vec<TagName>")]
pub struct TagSet(Vec<TagName>);

impl TagSet {
    /// Build a tag set, dropping repeats (first occurrence wins).
    ///
    /// # Errors
    ///
    /// Returns `TagError::TooMany` when more than [`MAX_TAGS`] distinct tags remain.
    pub fn new(tags: impl IntoIterator<Item = TagName>) -> Result<Self, TagError> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for tag in tags {
            if seen.insert(tag.as_str().to_string()) {
                out.push(tag);
            }
        }
        if out.len() > MAX_TAGS {
            return Err(TagError::TooMany { count: out.len() });
        }
        Ok(Self(out))
    }

    /// Parse raw strings into a tag set.
    ///
    /// # Errors
    ///
    /// Returns the first `TagError` encountered.
    pub fn parse<I, S>(raw: I) -> Result<Self, TagError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = raw
            .into_iter()
            .map(TagName::new)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(names)
    }

    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[TagName] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|t| t.as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagName> {
        self.0.iter()
    }
}

impl TryFrom<Vec<TagName>> for TagSet {
    type Error = TagError;

    fn try_from(value: Vec<TagName>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TagSet> for Vec<TagName> {
    fn from(value: TagSet) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_name_trims_and_limits_length() {
        assert_eq!(TagName::new("  verbs ").unwrap().as_str(), "verbs");
        assert_eq!(TagName::new("   ").unwrap_err(), TagError::EmptyName);
        let long = "x".repeat(21);
        assert_eq!(TagName::new(long).unwrap_err(), TagError::TooLong { len: 21 });
        assert!(TagName::new("x".repeat(20)).is_ok());
    }

    #[test]
    fn tag_set_dedups_before_counting() {
        let set = TagSet::parse(["a", "b", "a", "c", "d", "e", "b"]).unwrap();
        assert_eq!(set.len(), 5);
        assert_eq!(set.as_slice()[0].as_str(), "a");
    }

    #[test]
    fn tag_set_rejects_six_distinct() {
        let err = TagSet::parse(["a", "b", "c", "d", "e", "f"]).unwrap_err();
        assert_eq!(err, TagError::TooMany { count: 6 });
    }
}
