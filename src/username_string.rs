use std::fmt::Formatter;
use std::ops::Deref;
use std::str::FromStr;

use serde::de::Unexpected::Str;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A validated username: one lowercase ascii letter followed by at least
/// one of `[a-z0-9_-]`. Matches the account names accepted at signup.
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct UsernameString(String);

impl FromStr for UsernameString {
    type Err = UsernameParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_lowercase())
            && s.len() >= 2
            && chars.all(|c| {
                c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'
            });
        if valid {
            Ok(UsernameString(s.to_string()))
        } else {
            Err(UsernameParseError)
        }
    }
}

impl Deref for UsernameString {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0[..]
    }
}

impl AsRef<str> for UsernameString {
    fn as_ref(&self) -> &str {
        &self.0[..]
    }
}

impl std::borrow::Borrow<str> for UsernameString {
    fn borrow(&self) -> &str {
        &self.0[..]
    }
}

impl std::fmt::Display for UsernameString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
#[error("invalid username")]
pub struct UsernameParseError;

impl Serialize for UsernameString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UsernameString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;
        impl<'de> serde::de::Visitor<'de> for Visitor {
            type Value = UsernameString;

            fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
                formatter.write_str("string containing a valid username")
            }

            fn visit_str<E>(self, v: &str) -> Result<UsernameString, E>
            where
                E: serde::de::Error,
            {
                UsernameString::from_str(v)
                    .map_err(|_| E::invalid_value(Str(v), &self))
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}
