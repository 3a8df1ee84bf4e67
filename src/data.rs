use std::cmp::min;
use std::fmt::Formatter;

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;

use crate::username_string::UsernameString;

/// Access level granted on a note, totally ordered: `None < Read < Write`.
#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub enum PermissionLevel {
    #[default]
    None,
    Read,
    Write,
}

impl PermissionLevel {
    /// Caps the level at `cap`.
    pub fn limit(self, cap: PermissionLevel) -> PermissionLevel {
        min(self, cap)
    }
}

// The snapshot encodes levels as "0"/"r"/"w"; unknown strings decode as
// None so old snapshots with retired levels stay loadable.
impl Serialize for PermissionLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(match self {
            PermissionLevel::None => "0",
            PermissionLevel::Read => "r",
            PermissionLevel::Write => "w",
        })
    }
}

impl<'de> Deserialize<'de> for PermissionLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;
        impl<'de> serde::de::Visitor<'de> for Visitor {
            type Value = PermissionLevel;

            fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
                formatter.write_str("permission level string")
            }

            fn visit_str<E>(self, v: &str) -> Result<PermissionLevel, E>
            where
                E: Error,
            {
                Ok(match v {
                    "r" => PermissionLevel::Read,
                    "w" => PermissionLevel::Write,
                    _ => PermissionLevel::None,
                })
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}

/// Composite identity of a note. Ids are opaque strings assigned by the
/// caller (in practice uuids picked at creation).
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct NoteKey {
    pub owner: UsernameString,
    pub id: String,
}

impl NoteKey {
    pub fn new(owner: UsernameString, id: impl Into<String>) -> Self {
        NoteKey { owner, id: id.into() }
    }
}

/// Per-note metadata. `owner` is fixed at creation; everything else is
/// mutated through the metadata store's per-key operations.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub owner: String,
    pub public: PermissionLevel,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub modified: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub accessed: Option<OffsetDateTime>,
    #[serde(default)]
    pub deleted: bool,
}

impl NoteRecord {
    /// Effective access level of `accessor` on this note. The owner always
    /// holds Write; everyone else gets the public level capped at Read, so
    /// a stored public Write can never grant a non-owner write access.
    pub fn effective_level(&self, accessor: &str) -> PermissionLevel {
        if accessor == self.owner {
            PermissionLevel::Write
        } else {
            self.public.limit(PermissionLevel::Read)
        }
    }
}

/// Identity on whose behalf an operation runs, as established by the
/// session layer. An anonymous principal has the empty effective username,
/// which can never match an owner and is therefore always capped to the
/// note's public level.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AuthPrincipal {
    Anonymous,
    Authenticated(UsernameString),
}

impl AuthPrincipal {
    pub fn effective_username(&self) -> &str {
        match self {
            AuthPrincipal::Anonymous => "",
            AuthPrincipal::Authenticated(username) => username,
        }
    }

    pub fn authenticated_username(&self) -> Option<&UsernameString> {
        match self {
            AuthPrincipal::Anonymous => None,
            AuthPrincipal::Authenticated(username) => Some(username),
        }
    }
}
