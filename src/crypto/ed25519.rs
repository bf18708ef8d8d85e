// SPDX-License-Identifier: MIT OR Apache-2.0

//! Edwards-Curve Digital Signature Algorithm (EdDSA) related to Curve25519 using SHA-512.
use std::sync::Arc;

use ed25519_dalek::{
    PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH, Signature, Signer, SigningKey, Verifier, VerifyingKey,
};
use rand::rngs::OsRng;

use crate::crypto::{
    CryptographyKey, ED25519, KeyError, KeyFields, PrivateKey, PrivateKeyFactory, PublicKey,
    PublicKeyFactory, SignKey, VerifyKey, key_data,
};

/// Private Ed25519 key used for signing.
#[derive(Clone, Debug)]
pub struct Ed25519PrivateKey(SigningKey);

impl Ed25519PrivateKey {
    /// Generates a new private key using the systems random number generator (CSPRNG) as a seed.
    pub fn new() -> Self {
        let mut csprng = OsRng;
        Self(SigningKey::generate(&mut csprng))
    }

    pub fn from_bytes(bytes: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self(SigningKey::from_bytes(bytes))
    }
}

impl Default for Ed25519PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptographyKey for Ed25519PrivateKey {
    fn algorithm(&self) -> &str {
        ED25519
    }

    fn data(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }
}

impl SignKey for Ed25519PrivateKey {
    fn sign(&self, bytes: &[u8]) -> Vec<u8> {
        self.0.sign(bytes).to_bytes().to_vec()
    }
}

impl PrivateKey for Ed25519PrivateKey {
    fn public_key(&self) -> Arc<dyn PublicKey> {
        Arc::new(Ed25519PublicKey(self.0.verifying_key()))
    }
}

/// Public Ed25519 key used for verifying signatures.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ed25519PublicKey(VerifyingKey);

impl Ed25519PublicKey {
    pub fn from_bytes(bytes: &[u8; PUBLIC_KEY_LENGTH]) -> Result<Self, KeyError> {
        Ok(Self(VerifyingKey::from_bytes(bytes)?))
    }
}

impl CryptographyKey for Ed25519PublicKey {
    fn algorithm(&self) -> &str {
        ED25519
    }

    fn data(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }
}

impl VerifyKey for Ed25519PublicKey {
    fn verify(&self, bytes: &[u8], signature: &[u8]) -> bool {
        match Signature::from_slice(signature) {
            Ok(signature) => self.0.verify(bytes, &signature).is_ok(),
            Err(_) => false,
        }
    }
}

impl PublicKey for Ed25519PublicKey {}

/// Factory for Ed25519 key pairs.
#[derive(Copy, Clone, Debug, Default)]
pub struct Ed25519KeyFactory;

impl PublicKeyFactory for Ed25519KeyFactory {
    fn parse(&self, fields: &KeyFields) -> Result<Arc<dyn PublicKey>, KeyError> {
        let bytes = key_data::<PUBLIC_KEY_LENGTH>(fields, ED25519)?;
        Ok(Arc::new(Ed25519PublicKey::from_bytes(&bytes)?))
    }
}

impl PrivateKeyFactory for Ed25519KeyFactory {
    fn generate(&self) -> Result<Arc<dyn PrivateKey>, KeyError> {
        Ok(Arc::new(Ed25519PrivateKey::new()))
    }

    fn parse(&self, fields: &KeyFields) -> Result<Arc<dyn PrivateKey>, KeyError> {
        let bytes = key_data::<SECRET_KEY_LENGTH>(fields, ED25519)?;
        Ok(Arc::new(Ed25519PrivateKey::from_bytes(&bytes)))
    }
}
