//! Token capability scopes.
//!
//! Scopes travel on the wire as a space-delimited string but are held as a typed set, so
//! containment is set membership rather than substring search.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::errors::TokenError;

/// A single capability granted by a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// Identify the user the token was issued for
    Identify,
    /// Manage AbandonAuth resources such as developer applications
    AbandonAuth,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Identify => "identify",
            Scope::AbandonAuth => "abandonauth",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = TokenError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "identify" => Ok(Scope::Identify),
            "abandonauth" => Ok(Scope::AbandonAuth),
            other => Err(TokenError::InvalidFormat(format!("unknown scope '{other}'"))),
        }
    }
}

/// Set of scopes carried by a token; never empty once minted
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopeSet(BTreeSet<Scope>);

impl ScopeSet {
    pub fn new<I: IntoIterator<Item = Scope>>(scopes: I) -> Self {
        Self(scopes.into_iter().collect())
    }

    /// Parse a space-delimited scope string; empty strings and unknown scopes are rejected
    pub fn parse(value: &str) -> Result<Self, TokenError> {
        let scopes = value
            .split_whitespace()
            .map(Scope::from_str)
            .collect::<Result<BTreeSet<_>, _>>()?;
        if scopes.is_empty() {
            return Err(TokenError::InvalidFormat("empty scope".to_string()));
        }
        Ok(Self(scopes))
    }

    pub fn contains(&self, scope: Scope) -> bool {
        self.0.contains(&scope)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.0.iter()
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(Scope::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(&joined)
    }
}

impl Serialize for ScopeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ScopeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        ScopeSet::parse(&value).map_err(serde::de::Error::custom)
    }
}
