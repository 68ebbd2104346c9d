//! Immutable, type-tagged identifiers for graph entities
//!
//! An [`Identifier`] is 16 bytes long. Byte 0 is reserved for the
//! [`EntityKind`] tag of the entity that generated it and bytes 1..16 are
//! drawn from a cryptographically secure source, giving 120 bits of
//! randomness. The textual form is always 32 lowercase hex characters.
//!
//! The all-zero value is reserved for the root graph context and is returned
//! by [`Identifier::root`].

use crate::error::{Error, Result};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Kind tag stored in byte 0 of generated identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum EntityKind {
    Graph = 0x01,
    Node = 0x02,
    Edge = 0x03,
}

impl EntityKind {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(Self::Graph),
            0x02 => Some(Self::Node),
            0x03 => Some(Self::Edge),
            _ => None,
        }
    }

    /// Label given to entities of this kind when none is supplied
    pub fn default_label(self) -> &'static str {
        match self {
            Self::Graph => "Graph",
            Self::Node => "Node",
            Self::Edge => "Edge",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Graph => "graph",
            Self::Node => "node",
            Self::Edge => "edge",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "graph" => Ok(Self::Graph),
            "node" => Ok(Self::Node),
            "edge" => Ok(Self::Edge),
            other => Err(format!("unknown entity kind: {}", other)),
        }
    }
}

/// Unique identifier for any graph entity
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier([u8; Identifier::LEN]);

impl Identifier {
    /// Width in bytes
    pub const LEN: usize = 16;

    /// Width of the textual form
    pub const TEXT_LEN: usize = 32;

    /// Generate a fresh identifier using the thread-local CSPRNG.
    pub fn generate(kind: EntityKind) -> Self {
        Self::generate_with(kind, &mut rand::thread_rng())
    }

    /// Generate a fresh identifier drawing randomness from `rng`.
    pub fn generate_with<R: RngCore + ?Sized>(kind: EntityKind, rng: &mut R) -> Self {
        let mut bytes = [0u8; Self::LEN];
        rng.fill_bytes(&mut bytes[1..]);
        bytes[0] = kind.tag();
        Self(bytes)
    }

    /// Parse the 32 hex character textual form.
    ///
    /// Upper- and lowercase digits are accepted; the stored value always
    /// renders back as lowercase.
    pub fn from_string(text: &str) -> Result<Self> {
        if text.len() != Self::TEXT_LEN || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::MalformedIdentifier(text.to_string()));
        }
        let mut bytes = [0u8; Self::LEN];
        hex::decode_to_slice(text, &mut bytes)
            .map_err(|_| Error::MalformedIdentifier(text.to_string()))?;
        Ok(Self(bytes))
    }

    /// The reserved all-zero identifier of the outermost graph context
    pub const fn root() -> Self {
        Self([0u8; Self::LEN])
    }

    pub fn is_root(&self) -> bool {
        self.0 == [0u8; Self::LEN]
    }

    /// Kind tag carried in byte 0, `None` for the root or unknown tags
    pub fn kind(&self) -> Option<EntityKind> {
        EntityKind::from_tag(self.0[0])
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Value equality against another identifier or its textual form.
    ///
    /// Text that does not parse never compares equal.
    pub fn equals<T: AsIdentifier + ?Sized>(&self, other: &T) -> bool {
        other.as_identifier().is_some_and(|id| id == *self)
    }
}

impl From<[u8; Identifier::LEN]> for Identifier {
    fn from(bytes: [u8; Identifier::LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self)
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}

impl PartialEq<str> for Identifier {
    fn eq(&self, other: &str) -> bool {
        self.equals(other)
    }
}

impl PartialEq<&str> for Identifier {
    fn eq(&self, other: &&str) -> bool {
        self.equals(*other)
    }
}

impl PartialEq<String> for Identifier {
    fn eq(&self, other: &String) -> bool {
        self.equals(other.as_str())
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_string(&text).map_err(serde::de::Error::custom)
    }
}

/// Values that can be compared with an [`Identifier`]
pub trait AsIdentifier {
    fn as_identifier(&self) -> Option<Identifier>;
}

impl AsIdentifier for Identifier {
    fn as_identifier(&self) -> Option<Identifier> {
        Some(*self)
    }
}

impl AsIdentifier for str {
    fn as_identifier(&self) -> Option<Identifier> {
        Identifier::from_string(self).ok()
    }
}

impl AsIdentifier for String {
    fn as_identifier(&self) -> Option<Identifier> {
        self.as_str().as_identifier()
    }
}
