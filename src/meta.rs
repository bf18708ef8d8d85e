// SPDX-License-Identifier: MIT OR Apache-2.0

//! Self-certifying identity roots.
//!
//! A [`Meta`] binds a public key to an identity. Seed-based meta types additionally carry a
//! human-readable seed and a fingerprint, the signature over the seed made by the key owner. The
//! address of an identifier is derived from the fingerprint (or the key when there is no seed),
//! so nobody can claim an identifier without holding the matching private key.
//!
//! Metas received from the network are untrusted until [`Meta::validate`] checked them. The
//! result is cached, a meta never changes after construction.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::Fields;
use crate::crypto::{KeyRegistry, PrivateKey, PublicKey, match_sign_key};
use crate::identifier::{Address, EntityType, Identifier};
use crate::status::Status;

/// Algorithm family of a meta.
///
/// Families with an odd code require a seed and fingerprint.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaType {
    #[default]
    Mkm,
    Btc,
    ExBtc,
    Eth,
    ExEth,
}

impl MetaType {
    pub fn code(&self) -> u8 {
        match self {
            MetaType::Mkm => 1,
            MetaType::Btc => 2,
            MetaType::ExBtc => 3,
            MetaType::Eth => 4,
            MetaType::ExEth => 5,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            1 => Some(MetaType::Mkm),
            2 => Some(MetaType::Btc),
            3 => Some(MetaType::ExBtc),
            4 => Some(MetaType::Eth),
            5 => Some(MetaType::ExEth),
            _ => None,
        }
    }

    pub fn has_seed(&self) -> bool {
        self.code() & 1 == 1
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetaType::Mkm => "mkm",
            MetaType::Btc => "btc",
            MetaType::ExBtc => "exbtc",
            MetaType::Eth => "eth",
            MetaType::ExEth => "exeth",
        }
    }

    /// Reads a meta type from its name or numeric code.
    pub fn from_value(value: &Value) -> Result<Self, MetaError> {
        match value {
            Value::String(name) => name.parse(),
            Value::Number(number) => number
                .as_u64()
                .and_then(Self::from_code)
                .ok_or_else(|| MetaError::UnknownType(number.to_string())),
            _ => Err(MetaError::InvalidField("type")),
        }
    }
}

impl FromStr for MetaType {
    type Err = MetaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "mkm" | "1" => Ok(MetaType::Mkm),
            "btc" | "2" => Ok(MetaType::Btc),
            "exbtc" | "3" => Ok(MetaType::ExBtc),
            "eth" | "4" => Ok(MetaType::Eth),
            "exeth" | "5" => Ok(MetaType::ExEth),
            _ => Err(MetaError::UnknownType(value.to_string())),
        }
    }
}

impl fmt::Display for MetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity root binding a public key (and optionally a seed) to an identifier.
#[derive(Clone, Debug)]
pub struct Meta {
    meta_type: MetaType,
    public_key: Arc<dyn PublicKey>,
    seed: Option<String>,
    fingerprint: Option<Vec<u8>>,
    status: Status,
}

impl Meta {
    /// Creates a meta from local key material.
    ///
    /// Seed-based types need a non-empty seed and the private key matching `public_key` to sign
    /// the fingerprint. The returned meta is valid.
    pub fn create(
        meta_type: MetaType,
        public_key: Arc<dyn PublicKey>,
        seed: Option<&str>,
        signer: Option<&dyn PrivateKey>,
    ) -> Result<Self, MetaError> {
        let (seed, fingerprint) = if meta_type.has_seed() {
            let seed = seed
                .filter(|seed| !seed.is_empty())
                .ok_or(MetaError::MissingSeed)?;
            let signer = signer.ok_or(MetaError::MissingSigner)?;
            debug_assert!(
                match_sign_key(signer, public_key.as_ref()),
                "fingerprint signer does not match meta key"
            );

            (Some(seed.to_string()), Some(signer.sign(seed.as_bytes())))
        } else {
            if seed.is_some() {
                return Err(MetaError::UnexpectedSeed(meta_type));
            }
            (None, None)
        };

        Ok(Self {
            meta_type,
            public_key,
            seed,
            fingerprint,
            status: Status::Valid,
        })
    }

    /// Creates a meta for the public key of the given private key.
    pub fn generate(
        meta_type: MetaType,
        private_key: &dyn PrivateKey,
        seed: Option<&str>,
    ) -> Result<Self, MetaError> {
        Self::create(meta_type, private_key.public_key(), seed, Some(private_key))
    }

    /// Reads an unverified meta from untrusted fields.
    pub fn from_fields(registry: &KeyRegistry, fields: &Fields) -> Result<Self, MetaError> {
        let meta_type = fields
            .get("type")
            .ok_or(MetaError::MissingField("type"))
            .and_then(MetaType::from_value)?;

        let public_key = registry
            .parse_public_key(fields.get("key").ok_or(MetaError::MissingField("key"))?)
            .ok_or(MetaError::InvalidField("key"))?;

        let seed = match fields.get("seed") {
            None | Some(Value::Null) => None,
            Some(Value::String(seed)) => Some(seed.clone()),
            Some(_) => return Err(MetaError::InvalidField("seed")),
        };

        let fingerprint = match fields.get("fingerprint") {
            None | Some(Value::Null) => None,
            Some(Value::String(fingerprint)) => Some(hex::decode(fingerprint)?),
            Some(_) => return Err(MetaError::InvalidField("fingerprint")),
        };

        Ok(Self {
            meta_type,
            public_key,
            seed,
            fingerprint,
            status: Status::Unverified,
        })
    }

    /// Reads an unverified meta from untrusted fields, `None` if they are malformed.
    pub fn parse(registry: &KeyRegistry, fields: &Fields) -> Option<Self> {
        Self::from_fields(registry, fields)
            .inspect_err(|err| debug!("ignoring meta: {err}"))
            .ok()
    }

    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("type".into(), Value::from(self.meta_type.as_str()));
        fields.insert("key".into(), self.public_key.to_fields().to_value());
        if let Some(seed) = &self.seed {
            fields.insert("seed".into(), Value::from(seed.as_str()));
        }
        if let Some(fingerprint) = &self.fingerprint {
            fields.insert("fingerprint".into(), Value::from(hex::encode(fingerprint)));
        }
        fields
    }

    /// Checks the fingerprint binding, returns true if the meta can be trusted.
    ///
    /// Only the first call does the work, the result is kept for the lifetime of the meta.
    pub fn validate(&mut self) -> bool {
        if self.status == Status::Unverified {
            self.status = if self.check() {
                Status::Valid
            } else {
                debug!(meta_type = %self.meta_type, "meta failed validation");
                Status::Invalid
            };
        }

        self.status.is_valid()
    }

    fn check(&self) -> bool {
        match (self.meta_type.has_seed(), &self.seed, &self.fingerprint) {
            (true, Some(seed), Some(fingerprint)) => {
                !seed.is_empty()
                    && !fingerprint.is_empty()
                    && self.public_key.verify(seed.as_bytes(), fingerprint)
            }
            (false, None, None) => true,
            _ => false,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn meta_type(&self) -> MetaType {
        self.meta_type
    }

    pub fn public_key(&self) -> &Arc<dyn PublicKey> {
        &self.public_key
    }

    pub fn seed(&self) -> Option<&str> {
        self.seed.as_deref()
    }

    pub fn fingerprint(&self) -> Option<&[u8]> {
        self.fingerprint.as_deref()
    }

    /// Derives the address of this identity for the given entity type.
    pub fn generate_address(&self, entity_type: EntityType) -> Address {
        match &self.fingerprint {
            Some(fingerprint) => Address::derive(entity_type, fingerprint),
            None => Address::derive(entity_type, &self.public_key.data()),
        }
    }

    /// Derives the identifier of this identity, named after the seed.
    pub fn generate_identifier(
        &self,
        entity_type: EntityType,
        terminal: Option<&str>,
    ) -> Identifier {
        Identifier::new(
            self.seed.as_deref(),
            self.generate_address(entity_type),
            terminal,
        )
    }

    /// Returns true if the identifier was derived from this meta.
    ///
    /// Identifiers with opaque addresses never match.
    pub fn matches_identifier(&self, identifier: &Identifier) -> bool {
        if identifier.name() != self.seed.as_deref() {
            return false;
        }

        match identifier.entity_type() {
            Some(entity_type) => &self.generate_address(entity_type) == identifier.address(),
            None => false,
        }
    }

    /// Returns true if the given key is the key of this meta.
    pub fn matches_public_key(&self, public_key: &dyn PublicKey) -> bool {
        public_key.algorithm() == self.public_key.algorithm()
            && public_key.data() == self.public_key.data()
    }
}

#[derive(Debug, Error)]
pub enum MetaError {
    #[error("unknown meta type '{0}'")]
    UnknownType(String),

    #[error("meta is missing field '{0}'")]
    MissingField(&'static str),

    #[error("meta has invalid field '{0}'")]
    InvalidField(&'static str),

    #[error("invalid fingerprint encoding: {0}")]
    InvalidFingerprint(#[from] hex::FromHexError),

    #[error("meta type requires a non-empty seed")]
    MissingSeed,

    #[error("meta type requires a private key to sign the fingerprint")]
    MissingSigner,

    #[error("meta type '{0}' does not take a seed")]
    UnexpectedSeed(MetaType),
}
