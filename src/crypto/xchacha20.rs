// SPDX-License-Identifier: MIT OR Apache-2.0

//! XChaCha20Poly1305 is a ChaCha20Poly1305 AEAD variant with an extended 192-bit (24-byte) nonce.
use std::fmt;
use std::sync::Arc;

use chacha20poly1305::aead::Aead;
use chacha20poly1305::{Key, KeyInit, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{
    CryptographyKey, DecryptKey, EncryptKey, KeyError, KeyFields, SymmetricKey,
    SymmetricKeyFactory, XCHACHA20_POLY1305, key_data,
};

pub const NONCE_SIZE: usize = 24;

pub const KEY_SIZE: usize = 32;

pub type XAeadNonce = [u8; NONCE_SIZE];

pub type XAeadKey = [u8; KEY_SIZE];

pub fn x_aead_encrypt(
    key: &XAeadKey,
    plaintext: &[u8],
    nonce: XAeadNonce,
) -> Result<Vec<u8>, KeyError> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(KeyError::Encrypt)
}

pub fn x_aead_decrypt(
    key: &XAeadKey,
    ciphertext_tag: &[u8],
    nonce: XAeadNonce,
) -> Result<Vec<u8>, KeyError> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(XNonce::from_slice(&nonce), ciphertext_tag)
        .map_err(KeyError::Decrypt)
}

pub(crate) fn random_nonce() -> XAeadNonce {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Secret XChaCha20-Poly1305 key.
///
/// Ciphertexts are prefixed with the random nonce they were encrypted with.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct XChaCha20Key(XAeadKey);

impl XChaCha20Key {
    pub fn new() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_bytes(bytes: XAeadKey) -> Self {
        Self(bytes)
    }
}

impl Default for XChaCha20Key {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for XChaCha20Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("XChaCha20Key").field(&"***").finish()
    }
}

impl CryptographyKey for XChaCha20Key {
    fn algorithm(&self) -> &str {
        XCHACHA20_POLY1305
    }

    fn data(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl EncryptKey for XChaCha20Key {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, KeyError> {
        let nonce = random_nonce();
        let ciphertext = x_aead_encrypt(&self.0, plaintext, nonce)?;
        Ok([nonce.as_slice(), ciphertext.as_slice()].concat())
    }
}

impl DecryptKey for XChaCha20Key {
    fn decrypt(&self, ciphertext: &[u8]) -> Option<Vec<u8>> {
        if ciphertext.len() < NONCE_SIZE {
            return None;
        }

        let (nonce, ciphertext) = ciphertext.split_at(NONCE_SIZE);
        let nonce: XAeadNonce = nonce.try_into().ok()?;
        x_aead_decrypt(&self.0, ciphertext, nonce).ok()
    }
}

impl SymmetricKey for XChaCha20Key {}

/// Factory for XChaCha20-Poly1305 keys.
#[derive(Copy, Clone, Debug, Default)]
pub struct XChaCha20KeyFactory;

impl SymmetricKeyFactory for XChaCha20KeyFactory {
    fn generate(&self) -> Result<Arc<dyn SymmetricKey>, KeyError> {
        Ok(Arc::new(XChaCha20Key::new()))
    }

    fn parse(&self, fields: &KeyFields) -> Result<Arc<dyn SymmetricKey>, KeyError> {
        let bytes = key_data::<KEY_SIZE>(fields, XCHACHA20_POLY1305)?;
        Ok(Arc::new(XChaCha20Key::from_bytes(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use crate::crypto::{DecryptKey, EncryptKey};

    use super::{XAeadKey, XAeadNonce, XChaCha20Key, x_aead_decrypt, x_aead_encrypt};

    #[test]
    fn encrypt_decrypt() {
        let key: XAeadKey = [7; 32];
        let nonce: XAeadNonce = [1; 24];

        let ciphertext = x_aead_encrypt(&key, b"Hello, Panda!", nonce).unwrap();
        let plaintext = x_aead_decrypt(&key, &ciphertext, nonce).unwrap();

        assert_eq!(plaintext, b"Hello, Panda!");
    }

    #[test]
    fn symmetric_key() {
        let key = XChaCha20Key::new();

        let ciphertext = key.encrypt(b"Hello, Panda!").unwrap();
        assert_eq!(key.decrypt(&ciphertext).unwrap(), b"Hello, Panda!");

        // Every encryption uses a fresh nonce
        assert_ne!(ciphertext, key.encrypt(b"Hello, Panda!").unwrap());
    }

    #[test]
    fn decryption_failed() {
        let key = XChaCha20Key::new();
        let ciphertext = key.encrypt(b"Hello, Panda!").unwrap();

        assert!(XChaCha20Key::new().decrypt(&ciphertext).is_none());

        // Tampered ciphertext
        let mut tampered = ciphertext.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 1;
        assert!(key.decrypt(&tampered).is_none());

        // Too short to even hold a nonce
        assert!(key.decrypt(&ciphertext[..10]).is_none());
    }
}
