// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decentralized identifiers of the form `name@address/terminal`.
//!
//! The address is derived from a [`Meta`](crate::meta::Meta) and encodes the entity type in its
//! first byte, followed by a BLAKE3 digest of the fingerprint (or public key) and a short
//! checksum. Addresses which don't follow this scheme are still accepted as opaque strings so that
//! identifiers of foreign systems round-trip unchanged.
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Length of the digest part of a derived address.
pub const DIGEST_LEN: usize = 20;

/// Length of the checksum part of a derived address.
pub const CHECKSUM_LEN: usize = 4;

/// Total length of a derived address in bytes.
pub const ADDRESS_LEN: usize = 1 + DIGEST_LEN + CHECKSUM_LEN;

/// Kind of entity an address belongs to, encoded as network byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntityType {
    User = 0x00,
    Group = 0x01,
    Station = 0x02,
    Bot = 0x04,
}

impl EntityType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::User),
            0x01 => Some(Self::Group),
            0x02 => Some(Self::Station),
            0x04 => Some(Self::Bot),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn is_group(self) -> bool {
        matches!(self, Self::Group)
    }
}

/// Address part of an identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Derives an address from identity key material (a fingerprint or public key bytes).
    pub fn derive(entity_type: EntityType, data: &[u8]) -> Self {
        let digest = blake3::hash(data);

        let mut bytes = Vec::with_capacity(ADDRESS_LEN);
        bytes.push(entity_type.to_byte());
        bytes.extend_from_slice(&digest.as_bytes()[..DIGEST_LEN]);

        let checksum = blake3::hash(&bytes);
        bytes.extend_from_slice(&checksum.as_bytes()[..CHECKSUM_LEN]);

        Self(hex::encode(bytes))
    }

    /// Returns the entity type if this is a derived address with a correct checksum.
    pub fn entity_type(&self) -> Option<EntityType> {
        let bytes = hex::decode(&self.0).ok()?;
        if bytes.len() != ADDRESS_LEN {
            return None;
        }

        let (body, checksum) = bytes.split_at(1 + DIGEST_LEN);
        if &blake3::hash(body).as_bytes()[..CHECKSUM_LEN] != checksum {
            return None;
        }

        EntityType::from_byte(body[0])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = IdentifierError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.is_empty() {
            return Err(IdentifierError::EmptyAddress);
        }

        if value.contains(['@', '/']) {
            return Err(IdentifierError::InvalidAddress(value.to_string()));
        }

        Ok(Self(value.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a user, group or other entity.
///
/// Two identifiers are equal if name and address match, the terminal only names a device or
/// session of the same entity.
#[derive(Clone, Debug, Eq)]
pub struct Identifier {
    name: Option<String>,
    address: Address,
    terminal: Option<String>,
}

impl Identifier {
    pub fn new(name: Option<&str>, address: Address, terminal: Option<&str>) -> Self {
        Self {
            name: name.filter(|name| !name.is_empty()).map(str::to_string),
            address,
            terminal: terminal
                .filter(|terminal| !terminal.is_empty())
                .map(str::to_string),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn terminal(&self) -> Option<&str> {
        self.terminal.as_deref()
    }

    /// Returns the same identifier without terminal.
    pub fn without_terminal(&self) -> Self {
        Self {
            name: self.name.clone(),
            address: self.address.clone(),
            terminal: None,
        }
    }

    pub fn entity_type(&self) -> Option<EntityType> {
        self.address.entity_type()
    }

    pub fn is_user(&self) -> bool {
        self.entity_type() == Some(EntityType::User)
    }

    pub fn is_group(&self) -> bool {
        self.entity_type().is_some_and(EntityType::is_group)
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.address == other.address
    }
}

impl Hash for Identifier {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.address.hash(state);
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.is_empty() {
            return Err(IdentifierError::Empty);
        }

        let (rest, terminal) = match value.split_once('/') {
            Some((rest, terminal)) => (rest, Some(terminal)),
            None => (value, None),
        };

        let (name, address) = match rest.split_once('@') {
            Some((name, address)) => (Some(name), address),
            None => (None, rest),
        };

        Ok(Self::new(name, address.parse()?, terminal))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name}@")?;
        }
        write!(f, "{}", self.address)?;
        if let Some(terminal) = &self.terminal {
            write!(f, "/{terminal}")?;
        }
        Ok(())
    }
}

impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("identifier string is empty")]
    Empty,

    #[error("identifier has an empty address")]
    EmptyAddress,

    #[error("invalid address '{0}'")]
    InvalidAddress(String),
}
