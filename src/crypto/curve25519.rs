// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ed25519 signing keys bundled with X25519 keys for encryption towards the key owner.
//!
//! Encryption uses a sealed-box construction: an ephemeral X25519 secret agrees on a shared secret
//! with the recipient, HKDF-SHA256 derives an XChaCha20-Poly1305 key from it and the ephemeral
//! public key travels in front of the nonce and ciphertext.
//!
//! Raw key material is the 32-byte Ed25519 part followed by the 32-byte X25519 part.
use std::fmt;
use std::sync::Arc;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey, StaticSecret};

use crate::crypto::xchacha20::{
    KEY_SIZE, NONCE_SIZE, XAeadKey, XAeadNonce, random_nonce, x_aead_decrypt, x_aead_encrypt,
};
use crate::crypto::{
    CURVE25519, CryptographyKey, DecryptKey, EncryptKey, KeyError, KeyFields, PrivateKey,
    PrivateKeyFactory, PublicKey, PublicKeyFactory, SignKey, VerifyKey, key_data,
};

/// Size of the bundled key material.
pub const BUNDLE_SIZE: usize = 64;

const X25519_SIZE: usize = 32;

const SEALED_BOX_INFO: &[u8] = b"dim-core sealed box v1";

fn derive_key(
    shared_secret: &[u8],
    ephemeral_public: &X25519PublicKey,
    recipient_public: &X25519PublicKey,
) -> Result<XAeadKey, KeyError> {
    let salt = [
        ephemeral_public.as_bytes().as_slice(),
        recipient_public.as_bytes().as_slice(),
    ]
    .concat();
    let hkdf = Hkdf::<Sha256>::new(Some(&salt), shared_secret);

    let mut key = [0u8; KEY_SIZE];
    hkdf.expand(SEALED_BOX_INFO, &mut key)
        .map_err(|_| KeyError::KeyDerivation)?;
    Ok(key)
}

/// Private curve25519 key bundle, signs and decrypts.
#[derive(Clone)]
pub struct Curve25519PrivateKey {
    signing_key: SigningKey,
    secret: StaticSecret,
}

impl Curve25519PrivateKey {
    pub fn new() -> Self {
        let mut csprng = OsRng;
        Self {
            signing_key: SigningKey::generate(&mut csprng),
            secret: StaticSecret::random_from_rng(csprng),
        }
    }

    pub fn from_bytes(bytes: &[u8; BUNDLE_SIZE]) -> Self {
        let (signing_bytes, secret_bytes) = bytes.split_at(X25519_SIZE);
        let mut signing = [0u8; X25519_SIZE];
        let mut secret = [0u8; X25519_SIZE];
        signing.copy_from_slice(signing_bytes);
        secret.copy_from_slice(secret_bytes);

        Self {
            signing_key: SigningKey::from_bytes(&signing),
            secret: StaticSecret::from(secret),
        }
    }

    fn public(&self) -> Curve25519PublicKey {
        Curve25519PublicKey {
            verifying_key: self.signing_key.verifying_key(),
            public: X25519PublicKey::from(&self.secret),
        }
    }
}

impl Default for Curve25519PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Curve25519PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Curve25519PrivateKey")
            .field("public", &self.public())
            .finish_non_exhaustive()
    }
}

impl CryptographyKey for Curve25519PrivateKey {
    fn algorithm(&self) -> &str {
        CURVE25519
    }

    fn data(&self) -> Vec<u8> {
        [self.signing_key.to_bytes(), self.secret.to_bytes()].concat()
    }
}

impl SignKey for Curve25519PrivateKey {
    fn sign(&self, bytes: &[u8]) -> Vec<u8> {
        self.signing_key.sign(bytes).to_bytes().to_vec()
    }
}

impl DecryptKey for Curve25519PrivateKey {
    fn decrypt(&self, ciphertext: &[u8]) -> Option<Vec<u8>> {
        if ciphertext.len() < X25519_SIZE + NONCE_SIZE {
            return None;
        }

        let (ephemeral_public, rest) = ciphertext.split_at(X25519_SIZE);
        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

        let ephemeral_public: [u8; X25519_SIZE] = ephemeral_public.try_into().ok()?;
        let ephemeral_public = X25519PublicKey::from(ephemeral_public);
        let nonce: XAeadNonce = nonce.try_into().ok()?;

        let shared_secret = self.secret.diffie_hellman(&ephemeral_public);
        let key = derive_key(
            shared_secret.as_bytes(),
            &ephemeral_public,
            &X25519PublicKey::from(&self.secret),
        )
        .ok()?;

        x_aead_decrypt(&key, ciphertext, nonce).ok()
    }
}

impl PrivateKey for Curve25519PrivateKey {
    fn public_key(&self) -> Arc<dyn PublicKey> {
        Arc::new(self.public())
    }

    fn as_decrypt_key(&self) -> Option<&dyn DecryptKey> {
        Some(self)
    }
}

/// Public curve25519 key bundle, verifies and encrypts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Curve25519PublicKey {
    verifying_key: VerifyingKey,
    public: X25519PublicKey,
}

impl Curve25519PublicKey {
    pub fn from_bytes(bytes: &[u8; BUNDLE_SIZE]) -> Result<Self, KeyError> {
        let (verifying_bytes, public_bytes) = bytes.split_at(X25519_SIZE);
        let mut verifying = [0u8; X25519_SIZE];
        let mut public = [0u8; X25519_SIZE];
        verifying.copy_from_slice(verifying_bytes);
        public.copy_from_slice(public_bytes);

        Ok(Self {
            verifying_key: VerifyingKey::from_bytes(&verifying)?,
            public: X25519PublicKey::from(public),
        })
    }
}

impl CryptographyKey for Curve25519PublicKey {
    fn algorithm(&self) -> &str {
        CURVE25519
    }

    fn data(&self) -> Vec<u8> {
        [self.verifying_key.to_bytes(), self.public.to_bytes()].concat()
    }
}

impl VerifyKey for Curve25519PublicKey {
    fn verify(&self, bytes: &[u8], signature: &[u8]) -> bool {
        match Signature::from_slice(signature) {
            Ok(signature) => self.verifying_key.verify(bytes, &signature).is_ok(),
            Err(_) => false,
        }
    }
}

impl EncryptKey for Curve25519PublicKey {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeyError> {
        let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_public = X25519PublicKey::from(&ephemeral_secret);

        let shared_secret = ephemeral_secret.diffie_hellman(&self.public);
        let key = derive_key(shared_secret.as_bytes(), &ephemeral_public, &self.public)?;

        let nonce = random_nonce();
        let ciphertext = x_aead_encrypt(&key, plaintext, nonce)?;

        Ok([
            ephemeral_public.as_bytes().as_slice(),
            nonce.as_slice(),
            ciphertext.as_slice(),
        ]
        .concat())
    }
}

impl PublicKey for Curve25519PublicKey {
    fn as_encrypt_key(&self) -> Option<&dyn EncryptKey> {
        Some(self)
    }
}

/// Factory for curve25519 key bundles.
#[derive(Copy, Clone, Debug, Default)]
pub struct Curve25519KeyFactory;

impl PublicKeyFactory for Curve25519KeyFactory {
    fn parse(&self, fields: &KeyFields) -> Result<Arc<dyn PublicKey>, KeyError> {
        let bytes = key_data::<BUNDLE_SIZE>(fields, CURVE25519)?;
        Ok(Arc::new(Curve25519PublicKey::from_bytes(&bytes)?))
    }
}

impl PrivateKeyFactory for Curve25519KeyFactory {
    fn generate(&self) -> Result<Arc<dyn PrivateKey>, KeyError> {
        Ok(Arc::new(Curve25519PrivateKey::new()))
    }

    fn parse(&self, fields: &KeyFields) -> Result<Arc<dyn PrivateKey>, KeyError> {
        let bytes = key_data::<BUNDLE_SIZE>(fields, CURVE25519)?;
        Ok(Arc::new(Curve25519PrivateKey::from_bytes(&bytes)))
    }
}
