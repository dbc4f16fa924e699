//! Channel names.

use compact_str::CompactString;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// A validated channel name: 1 to 32 characters of `[a-z0-9_-]`.
///
/// Frame types sent by the server itself (`welcome`, `subscribed`, `pong`,
/// `error`) are reserved so published messages can't be confused with them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Channel(CompactString);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelNameError {
    #[error("channel name is empty")]
    Empty,
    #[error("channel name is {0} characters long, at most 32 allowed")]
    TooLong(usize),
    #[error("channel name contains invalid character {0:?}")]
    InvalidCharacter(char),
    #[error("channel name {0:?} is reserved")]
    Reserved(CompactString),
}

impl Channel {
    pub const MAX_LEN: usize = 32;
    pub const RESERVED: [&'static str; 4] = ["welcome", "subscribed", "pong", "error"];

    pub fn new(name: &str) -> Result<Self, ChannelNameError> {
        if name.is_empty() {
            return Err(ChannelNameError::Empty);
        }
        if name.len() > Self::MAX_LEN {
            return Err(ChannelNameError::TooLong(name.len()));
        }
        if let Some(c) = name
            .chars()
            .find(|c| !matches!(c, 'a'..='z' | '0'..='9' | '_' | '-'))
        {
            return Err(ChannelNameError::InvalidCharacter(c));
        }
        if Self::RESERVED.contains(&name) {
            return Err(ChannelNameError::Reserved(name.into()));
        }
        Ok(Self(name.into()))
    }

    /// Detector alerts.
    pub fn alerts() -> Self {
        Self(CompactString::const_new("alerts"))
    }

    /// Summaries of every ingested game.
    pub fn games() -> Self {
        Self(CompactString::const_new("games"))
    }

    /// Periodic pipeline metrics.
    pub fn metrics() -> Self {
        Self(CompactString::const_new("metrics"))
    }

    pub fn predictions() -> Self {
        Self(CompactString::const_new("predictions"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate a list of names, failing on the first bad one.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Self>, ChannelNameError> {
        names.iter().map(|n| Self::new(n.as_ref())).collect()
    }
}

impl FromStr for Channel {
    type Err = ChannelNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Channel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Channel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = CompactString::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_well_formed_names() {
        for name in ["alerts", "games", "nba-props", "week_12", "a", &"x".repeat(32)] {
            assert_eq!(Channel::new(name).unwrap().as_str(), name);
        }
        assert_eq!(Channel::alerts(), Channel::new("alerts").unwrap());
    }

    #[test]
    fn test_rejects_malformed_names() {
        assert_eq!(Channel::new(""), Err(ChannelNameError::Empty));
        assert_eq!(Channel::new(&"x".repeat(33)), Err(ChannelNameError::TooLong(33)));
        assert_eq!(Channel::new("Alerts"), Err(ChannelNameError::InvalidCharacter('A')));
        assert_eq!(Channel::new("a b"), Err(ChannelNameError::InvalidCharacter(' ')));
        assert_eq!(
            Channel::new("pong"),
            Err(ChannelNameError::Reserved("pong".into()))
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Channel = serde_json::from_str("\"metrics\"").unwrap();
        assert_eq!(ok, Channel::metrics());
        assert!(serde_json::from_str::<Channel>("\"no/slashes\"").is_err());
    }
}
