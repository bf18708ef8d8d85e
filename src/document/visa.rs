// SPDX-License-Identifier: MIT OR Apache-2.0

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use serde_json::Value;

use crate::Fields;
use crate::crypto::{KeyRegistry, PublicKey};
use crate::document::{Document, DocumentError, VISA};
use crate::identifier::Identifier;

/// User profile carrying the key others encrypt messages for the user with.
///
/// The visa key is separate from the meta key, it can be rotated by signing a new visa.
#[derive(Clone, Debug)]
pub struct Visa(Document);

impl Visa {
    pub fn new(identifier: Identifier) -> Self {
        Self(Document::new(identifier, VISA))
    }

    pub fn parse(fields: &Fields) -> Option<Self> {
        Document::parse(fields).and_then(|document| Self::try_from(document).ok())
    }

    /// Returns the visa key if it is present and supports encryption.
    pub fn public_key(&self, registry: &KeyRegistry) -> Option<Arc<dyn PublicKey>> {
        let public_key = registry.parse_public_key(self.property("key")?)?;
        public_key.as_encrypt_key().is_some().then_some(public_key)
    }

    pub fn set_public_key(&mut self, public_key: &dyn PublicKey) {
        self.set_property("key", Some(public_key.to_fields().to_value()));
    }

    /// Avatar URL.
    pub fn avatar(&self) -> Option<&str> {
        self.property("avatar").and_then(Value::as_str)
    }

    pub fn set_avatar(&mut self, avatar: Option<&str>) {
        self.set_property("avatar", avatar.map(Value::from));
    }

    pub fn into_document(self) -> Document {
        self.0
    }
}

impl TryFrom<Document> for Visa {
    type Error = DocumentError;

    fn try_from(document: Document) -> Result<Self, Self::Error> {
        if document.doc_type() != VISA {
            return Err(DocumentError::TypeMismatch {
                expected: VISA,
                found: document.doc_type().to_string(),
            });
        }

        Ok(Self(document))
    }
}

impl Deref for Visa {
    type Target = Document;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Visa {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use crate::crypto::{CURVE25519, ED25519, KeyRegistry};
    use crate::document::{BULLETIN, Document, DocumentError};
    use crate::test_utils::user_identifier;

    use super::Visa;

    #[test]
    fn visa_key() {
        let registry = KeyRegistry::with_defaults();
        let meta_key = registry.generate_private_key(ED25519).unwrap();
        let visa_key = registry.generate_private_key(CURVE25519).unwrap();

        let mut visa = Visa::new(user_identifier());
        visa.set_public_key(visa_key.public_key().as_ref());
        visa.set_avatar(Some("https://example.org/alice.png"));
        visa.sign(meta_key.as_ref()).unwrap();

        let mut received = Visa::parse(&visa.to_fields()).unwrap();
        assert!(received.verify(meta_key.public_key().as_ref()));
        assert_eq!(received.avatar(), Some("https://example.org/alice.png"));
        assert_eq!(
            received.public_key(&registry).unwrap().data(),
            visa_key.public_key().data()
        );
    }

    #[test]
    fn sign_only_visa_key_is_ignored() {
        let registry = KeyRegistry::with_defaults();
        let sign_only = registry.generate_private_key(ED25519).unwrap();

        let mut visa = Visa::new(user_identifier());
        visa.set_public_key(sign_only.public_key().as_ref());
        assert!(visa.property("key").is_some());
        assert!(visa.public_key(&registry).is_none());
    }

    #[test]
    fn type_mismatch() {
        let document = Document::new(user_identifier(), BULLETIN);
        assert!(matches!(
            Visa::try_from(document),
            Err(DocumentError::TypeMismatch { .. })
        ));
    }
}
