// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key algebra for signing, verifying, encrypting and decrypting data with pluggable algorithms.
//!
//! Every key carries an algorithm tag and its raw key material. What a key can do is expressed by
//! capability traits: [`SymmetricKey`] encrypts and decrypts, [`PublicKey`] verifies (and
//! optionally encrypts), [`PrivateKey`] signs (and optionally decrypts) and knows its public
//! counterpart.
//!
//! Keys are created and parsed through a [`KeyRegistry`] which maps algorithm names to factories.
//! The registry is populated once at startup and handed by reference to everything that needs
//! to turn structured key fields into keys.
//!
//! ## Example
//!
//! ```
//! use dim_core::crypto::{ED25519, KeyRegistry, match_sign_key};
//!
//! let registry = KeyRegistry::with_defaults();
//!
//! let private_key = registry.generate_private_key(ED25519).unwrap();
//! let public_key = private_key.public_key();
//!
//! let signature = private_key.sign(b"Hello, Panda!");
//! assert!(public_key.verify(b"Hello, Panda!", &signature));
//! assert!(match_sign_key(private_key.as_ref(), public_key.as_ref()));
//! ```
mod curve25519;
mod ed25519;
mod registry;
mod xchacha20;

use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Fields;

pub use curve25519::{Curve25519KeyFactory, Curve25519PrivateKey, Curve25519PublicKey};
pub use ed25519::{Ed25519KeyFactory, Ed25519PrivateKey, Ed25519PublicKey};
pub use registry::{KeyRegistry, PrivateKeyFactory, PublicKeyFactory, SymmetricKeyFactory};
pub use xchacha20::{XChaCha20Key, XChaCha20KeyFactory, x_aead_decrypt, x_aead_encrypt};

/// Ed25519 signatures.
pub const ED25519: &str = "ed25519";

/// Ed25519 signatures bundled with X25519 sealed-box encryption.
pub const CURVE25519: &str = "curve25519";

/// XChaCha20-Poly1305 authenticated symmetric encryption.
pub const XCHACHA20_POLY1305: &str = "xchacha20poly1305";

/// Fixed value used to probe if two keys belong together.
const PROBE: &[u8] = b"dim-core: are we a matching pair?";

/// Structured representation of a key as it appears in metas, documents and messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyFields {
    pub algorithm: String,

    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,

    /// Algorithm-specific extra fields.
    #[serde(flatten)]
    pub extras: Fields,
}

impl KeyFields {
    pub fn new(algorithm: &str, data: Vec<u8>) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            data,
            extras: Fields::new(),
        }
    }

    /// Reads key fields from a structured value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, KeyError> {
        Self::deserialize(value).map_err(|err| KeyError::InvalidFields(err.to_string()))
    }

    pub fn to_value(&self) -> serde_json::Value {
        // Key fields only contain strings and maps, this can't fail
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Any key with an algorithm tag and raw key material.
pub trait CryptographyKey: Debug + Send + Sync {
    fn algorithm(&self) -> &str;

    /// Raw key material.
    fn data(&self) -> Vec<u8>;

    fn to_fields(&self) -> KeyFields {
        KeyFields::new(self.algorithm(), self.data())
    }
}

pub trait EncryptKey: CryptographyKey {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeyError>;
}

pub trait DecryptKey: CryptographyKey {
    /// Returns `None` if the ciphertext was not meant for this key or was tampered with.
    fn decrypt(&self, ciphertext: &[u8]) -> Option<Vec<u8>>;
}

pub trait SignKey: CryptographyKey {
    fn sign(&self, bytes: &[u8]) -> Vec<u8>;
}

pub trait VerifyKey: CryptographyKey {
    fn verify(&self, bytes: &[u8], signature: &[u8]) -> bool;
}

/// Secret key which encrypts and decrypts data.
pub trait SymmetricKey: EncryptKey + DecryptKey {}

/// Public half of an asymmetric key pair.
pub trait PublicKey: VerifyKey {
    /// Returns an encryption view on this key if the algorithm supports it.
    fn as_encrypt_key(&self) -> Option<&dyn EncryptKey> {
        None
    }
}

/// Private half of an asymmetric key pair.
pub trait PrivateKey: SignKey {
    fn public_key(&self) -> Arc<dyn PublicKey>;

    /// Returns a decryption view on this key if the algorithm supports it.
    fn as_decrypt_key(&self) -> Option<&dyn DecryptKey> {
        None
    }
}

/// Returns true if data encrypted with the public key can be decrypted with the private key.
pub fn match_encrypt_key(public_key: &dyn PublicKey, private_key: &dyn PrivateKey) -> bool {
    let (Some(encrypt_key), Some(decrypt_key)) =
        (public_key.as_encrypt_key(), private_key.as_decrypt_key())
    else {
        return false;
    };

    match encrypt_key.encrypt(PROBE) {
        Ok(ciphertext) => decrypt_key.decrypt(&ciphertext).as_deref() == Some(PROBE),
        Err(_) => false,
    }
}

/// Returns true if signatures from the private key verify against the public key.
pub fn match_sign_key(private_key: &dyn PrivateKey, public_key: &dyn PublicKey) -> bool {
    let signature = private_key.sign(PROBE);
    public_key.verify(PROBE, &signature)
}

/// Two symmetric keys are equal if one decrypts what the other encrypted.
///
/// Raw bytes are not compared as the same key can have multiple encodings.
pub fn symmetric_keys_equal(a: &dyn SymmetricKey, b: &dyn SymmetricKey) -> bool {
    match a.encrypt(PROBE) {
        Ok(ciphertext) => b.decrypt(&ciphertext).as_deref() == Some(PROBE),
        Err(_) => false,
    }
}

/// Two private keys are equal if they produce signatures verifying against each other's
/// public key.
pub fn private_keys_equal(a: &dyn PrivateKey, b: &dyn PrivateKey) -> bool {
    match_sign_key(a, b.public_key().as_ref()) && match_sign_key(b, a.public_key().as_ref())
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("no key factory registered for algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("invalid key length {0} bytes, expected {1} bytes")]
    InvalidLength(usize, usize),

    #[error("invalid key fields: {0}")]
    InvalidFields(String),

    #[error("key with algorithm '{0}' handed to '{1}' factory")]
    AlgorithmMismatch(String, String),

    #[error("invalid ed25519 key: {0}")]
    Ed25519(#[from] ed25519_dalek::SignatureError),

    #[error("could not derive encryption key")]
    KeyDerivation,

    #[error("could not encrypt with xchacha20poly1305 aead: {0}")]
    Encrypt(chacha20poly1305::Error),

    #[error("could not decrypt with xchacha20poly1305 aead: {0}")]
    Decrypt(chacha20poly1305::Error),
}

/// Checks that key fields are meant for a factory of the given algorithm and returns the raw key
/// material as a fixed-size array.
pub(crate) fn key_data<const N: usize>(
    fields: &KeyFields,
    algorithm: &str,
) -> Result<[u8; N], KeyError> {
    if fields.algorithm != algorithm {
        return Err(KeyError::AlgorithmMismatch(
            fields.algorithm.clone(),
            algorithm.to_string(),
        ));
    }

    fields
        .data
        .as_slice()
        .try_into()
        .map_err(|_| KeyError::InvalidLength(fields.data.len(), N))
}

#[cfg(test)]
mod tests {
    use super::{
        CURVE25519, ED25519, KeyRegistry, XCHACHA20_POLY1305, match_encrypt_key, match_sign_key,
        private_keys_equal, symmetric_keys_equal,
    };

    #[test]
    fn sign_keys_match() {
        let registry = KeyRegistry::with_defaults();

        let private_key = registry.generate_private_key(ED25519).unwrap();
        let other_private_key = registry.generate_private_key(ED25519).unwrap();

        assert!(match_sign_key(
            private_key.as_ref(),
            private_key.public_key().as_ref()
        ));
        assert!(!match_sign_key(
            private_key.as_ref(),
            other_private_key.public_key().as_ref()
        ));
    }

    #[test]
    fn encrypt_keys_match() {
        let registry = KeyRegistry::with_defaults();

        let private_key = registry.generate_private_key(CURVE25519).unwrap();
        let other_private_key = registry.generate_private_key(CURVE25519).unwrap();

        assert!(match_encrypt_key(
            private_key.public_key().as_ref(),
            private_key.as_ref()
        ));
        assert!(!match_encrypt_key(
            other_private_key.public_key().as_ref(),
            private_key.as_ref()
        ));

        // Ed25519 keys can't encrypt at all
        let sign_only = registry.generate_private_key(ED25519).unwrap();
        assert!(!match_encrypt_key(
            sign_only.public_key().as_ref(),
            sign_only.as_ref()
        ));
    }

    #[test]
    fn symmetric_key_equality() {
        let registry = KeyRegistry::with_defaults();

        let key = registry.generate_symmetric_key(XCHACHA20_POLY1305).unwrap();
        let same_key = registry.parse_symmetric_key(&key.to_fields().to_value()).unwrap();
        let other_key = registry.generate_symmetric_key(XCHACHA20_POLY1305).unwrap();

        assert!(symmetric_keys_equal(key.as_ref(), same_key.as_ref()));
        assert!(!symmetric_keys_equal(key.as_ref(), other_key.as_ref()));
    }

    #[test]
    fn private_key_equality() {
        let registry = KeyRegistry::with_defaults();

        let private_key = registry.generate_private_key(CURVE25519).unwrap();
        let same_private_key = registry
            .parse_private_key(&private_key.to_fields().to_value())
            .unwrap();
        let other_private_key = registry.generate_private_key(CURVE25519).unwrap();

        assert!(private_keys_equal(
            private_key.as_ref(),
            same_private_key.as_ref()
        ));
        assert!(!private_keys_equal(
            private_key.as_ref(),
            other_private_key.as_ref()
        ));
    }
}
