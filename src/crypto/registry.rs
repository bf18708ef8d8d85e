// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::crypto::{
    CURVE25519, Curve25519KeyFactory, ED25519, Ed25519KeyFactory, KeyError, KeyFields, PrivateKey,
    PublicKey, SymmetricKey, XCHACHA20_POLY1305, XChaCha20KeyFactory,
};

/// Creates and parses symmetric keys of one algorithm.
pub trait SymmetricKeyFactory: Send + Sync {
    fn generate(&self) -> Result<Arc<dyn SymmetricKey>, KeyError>;

    fn parse(&self, fields: &KeyFields) -> Result<Arc<dyn SymmetricKey>, KeyError>;
}

/// Parses public keys of one algorithm.
pub trait PublicKeyFactory: Send + Sync {
    fn parse(&self, fields: &KeyFields) -> Result<Arc<dyn PublicKey>, KeyError>;
}

/// Creates and parses private keys of one algorithm.
pub trait PrivateKeyFactory: Send + Sync {
    fn generate(&self) -> Result<Arc<dyn PrivateKey>, KeyError>;

    fn parse(&self, fields: &KeyFields) -> Result<Arc<dyn PrivateKey>, KeyError>;
}

/// Algorithm-keyed registry of key factories.
///
/// Populated once during startup, read-only afterwards. Generating a key for an algorithm without
/// a registered factory fails with [`KeyError::UnsupportedAlgorithm`], parsing such a key returns
/// `None`.
#[derive(Default)]
pub struct KeyRegistry {
    symmetric: HashMap<String, Box<dyn SymmetricKeyFactory>>,
    public: HashMap<String, Box<dyn PublicKeyFactory>>,
    private: HashMap<String, Box<dyn PrivateKeyFactory>>,
}

impl KeyRegistry {
    /// Returns an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a registry with all bundled algorithms.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register_symmetric_key_factory(XCHACHA20_POLY1305, XChaCha20KeyFactory);

        registry.register_public_key_factory(ED25519, Ed25519KeyFactory);
        registry.register_private_key_factory(ED25519, Ed25519KeyFactory);

        registry.register_public_key_factory(CURVE25519, Curve25519KeyFactory);
        registry.register_private_key_factory(CURVE25519, Curve25519KeyFactory);

        registry
    }

    pub fn register_symmetric_key_factory<F>(&mut self, algorithm: &str, factory: F)
    where
        F: SymmetricKeyFactory + 'static,
    {
        self.symmetric
            .insert(algorithm.to_string(), Box::new(factory));
    }

    pub fn register_public_key_factory<F>(&mut self, algorithm: &str, factory: F)
    where
        F: PublicKeyFactory + 'static,
    {
        self.public.insert(algorithm.to_string(), Box::new(factory));
    }

    pub fn register_private_key_factory<F>(&mut self, algorithm: &str, factory: F)
    where
        F: PrivateKeyFactory + 'static,
    {
        self.private.insert(algorithm.to_string(), Box::new(factory));
    }

    pub fn generate_symmetric_key(
        &self,
        algorithm: &str,
    ) -> Result<Arc<dyn SymmetricKey>, KeyError> {
        self.symmetric
            .get(algorithm)
            .ok_or_else(|| KeyError::UnsupportedAlgorithm(algorithm.to_string()))?
            .generate()
    }

    pub fn generate_private_key(&self, algorithm: &str) -> Result<Arc<dyn PrivateKey>, KeyError> {
        self.private
            .get(algorithm)
            .ok_or_else(|| KeyError::UnsupportedAlgorithm(algorithm.to_string()))?
            .generate()
    }

    pub fn parse_symmetric_key(&self, value: &Value) -> Option<Arc<dyn SymmetricKey>> {
        let result = KeyFields::from_value(value).and_then(|fields| {
            self.symmetric
                .get(&fields.algorithm)
                .ok_or_else(|| KeyError::UnsupportedAlgorithm(fields.algorithm.clone()))?
                .parse(&fields)
        });

        result
            .inspect_err(|err| debug!("ignoring symmetric key: {err}"))
            .ok()
    }

    pub fn parse_public_key(&self, value: &Value) -> Option<Arc<dyn PublicKey>> {
        let result = KeyFields::from_value(value).and_then(|fields| {
            self.public
                .get(&fields.algorithm)
                .ok_or_else(|| KeyError::UnsupportedAlgorithm(fields.algorithm.clone()))?
                .parse(&fields)
        });

        result
            .inspect_err(|err| debug!("ignoring public key: {err}"))
            .ok()
    }

    pub fn parse_private_key(&self, value: &Value) -> Option<Arc<dyn PrivateKey>> {
        let result = KeyFields::from_value(value).and_then(|fields| {
            self.private
                .get(&fields.algorithm)
                .ok_or_else(|| KeyError::UnsupportedAlgorithm(fields.algorithm.clone()))?
                .parse(&fields)
        });

        result
            .inspect_err(|err| debug!("ignoring private key: {err}"))
            .ok()
    }
}

impl fmt::Debug for KeyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut symmetric: Vec<&String> = self.symmetric.keys().collect();
        let mut public: Vec<&String> = self.public.keys().collect();
        let mut private: Vec<&String> = self.private.keys().collect();
        symmetric.sort();
        public.sort();
        private.sort();

        f.debug_struct("KeyRegistry")
            .field("symmetric", &symmetric)
            .field("public", &public)
            .field("private", &private)
            .finish()
    }
}
