// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mutable, independently signed profile documents attached to an identity.
//!
//! A [`Document`] keeps its properties in a map. Signing serializes the properties into JSON with
//! sorted keys, signs the UTF-8 bytes with the identity's meta key and keeps data and signature
//! next to the properties. Changing any property drops data and signature again, the document has
//! to be re-signed before anyone can verify it.
//!
//! ```text
//! Unsigned --sign--> Signed (valid) --set_property--> Dirty (unverified) --sign--> Signed
//! ```
//!
//! Property edits can be batched, signing only happens once at the end.
//!
//! Documents arrive from remote peers, so one carrying data without signature (or the other way
//! around) is logged and marked invalid on verification instead of being asserted against.
//!
//! [`Visa`] and [`Bulletin`] are typed views for user and group documents.
mod bulletin;
mod visa;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::Fields;
use crate::crypto::{PrivateKey, PublicKey};
use crate::identifier::{Identifier, IdentifierError};
use crate::status::Status;
use crate::timestamp::Timestamp;

pub use bulletin::Bulletin;
pub use visa::Visa;

/// Document type of user profiles.
pub const VISA: &str = "visa";

/// Document type of group profiles.
pub const BULLETIN: &str = "bulletin";

/// Signed profile document.
#[derive(Clone, Debug)]
pub struct Document {
    identifier: Identifier,
    doc_type: String,
    properties: Fields,
    data: Option<String>,
    signature: Option<Vec<u8>>,
    status: Status,
}

impl Document {
    /// Creates a fresh, unsigned document.
    pub fn new(identifier: Identifier, doc_type: &str) -> Self {
        let mut properties = Fields::new();
        properties.insert("type".into(), Value::from(doc_type));
        properties.insert("created_time".into(), Timestamp::now().to_value());

        Self {
            identifier,
            doc_type: doc_type.to_string(),
            properties,
            data: None,
            signature: None,
            status: Status::Unverified,
        }
    }

    /// Reads a document from untrusted fields.
    ///
    /// The properties are decoded from the signed data, the document stays unverified until
    /// [`Document::verify`] was called.
    pub fn from_fields(fields: &Fields) -> Result<Self, DocumentError> {
        let identifier: Identifier = match fields.get("did") {
            Some(Value::String(did)) => did.parse()?,
            Some(_) => return Err(DocumentError::InvalidField("did")),
            None => return Err(DocumentError::MissingField("did")),
        };

        let data = match fields.get("data") {
            None | Some(Value::Null) => None,
            Some(Value::String(data)) => Some(data.clone()),
            Some(_) => return Err(DocumentError::InvalidField("data")),
        };

        let signature = match fields.get("signature") {
            None | Some(Value::Null) => None,
            Some(Value::String(signature)) => Some(hex::decode(signature)?),
            Some(_) => return Err(DocumentError::InvalidField("signature")),
        };

        let properties = match &data {
            Some(data) => {
                serde_json::from_str::<Fields>(data).map_err(DocumentError::MalformedData)?
            }
            None => Fields::new(),
        };

        let doc_type = fields
            .get("type")
            .or_else(|| properties.get("type"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                if identifier.is_group() {
                    BULLETIN.to_string()
                } else {
                    VISA.to_string()
                }
            });

        Ok(Self {
            identifier,
            doc_type,
            properties,
            data,
            signature,
            status: Status::Unverified,
        })
    }

    /// Reads a document from untrusted fields, `None` if they are malformed.
    pub fn parse(fields: &Fields) -> Option<Self> {
        Self::from_fields(fields)
            .inspect_err(|err| debug!("ignoring document: {err}"))
            .ok()
    }

    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("did".into(), Value::from(self.identifier.to_string()));
        fields.insert("type".into(), Value::from(self.doc_type.as_str()));
        if let Some(data) = &self.data {
            fields.insert("data".into(), Value::from(data.as_str()));
        }
        if let Some(signature) = &self.signature {
            fields.insert("signature".into(), Value::from(hex::encode(signature)));
        }
        fields
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    pub fn properties(&self) -> &Fields {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Sets or, with `None`, removes a property.
    ///
    /// The document needs to be signed again afterwards.
    pub fn set_property(&mut self, name: &str, value: Option<Value>) {
        match value {
            Some(value) => {
                self.properties.insert(name.to_string(), value);
            }
            None => {
                self.properties.remove(name);
            }
        }

        self.data = None;
        self.signature = None;
        self.status = Status::Unverified;
    }

    /// Signed JSON form of the properties.
    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_valid(&self) -> bool {
        self.status.is_valid()
    }

    /// Checks the signature against the given public key.
    ///
    /// A document verified once stays valid until one of its properties changes. Documents with
    /// data but no signature (or the other way around) are invalid whatever key is given.
    pub fn verify(&mut self, public_key: &dyn PublicKey) -> bool {
        if self.status == Status::Valid {
            return true;
        }

        match (&self.data, &self.signature) {
            (Some(data), Some(signature)) => {
                if public_key.verify(data.as_bytes(), signature) {
                    self.status = Status::Valid;
                } else {
                    debug!(identifier = %self.identifier, "document signature does not verify");
                    self.status = Status::Invalid;
                }
            }
            (None, None) => {
                // Nothing signed yet
                return false;
            }
            _ => {
                warn!(identifier = %self.identifier, "document with data or signature missing");
                self.status = Status::Invalid;
            }
        }

        self.status.is_valid()
    }

    /// Signs the properties and returns the signature.
    ///
    /// Stamps a fresh `time` property before serializing. Signing an already valid document
    /// returns its current signature.
    pub fn sign(&mut self, private_key: &dyn PrivateKey) -> Result<Vec<u8>, DocumentError> {
        if self.status == Status::Valid {
            if let Some(signature) = &self.signature {
                return Ok(signature.clone());
            }
        }

        self.properties
            .insert("time".into(), Timestamp::now().to_value());

        let data = serde_json::to_string(&self.properties).map_err(DocumentError::Encode)?;
        let signature = private_key.sign(data.as_bytes());

        self.data = Some(data);
        self.signature = Some(signature.clone());
        self.status = Status::Valid;

        Ok(signature)
    }

    /// Name of the entity.
    pub fn name(&self) -> Option<&str> {
        self.property("name").and_then(Value::as_str)
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.set_property("name", name.map(Value::from));
    }

    /// Time of the last signing.
    pub fn time(&self) -> Option<Timestamp> {
        self.property("time").and_then(Timestamp::from_value)
    }

    pub fn created_time(&self) -> Option<Timestamp> {
        self.property("created_time").and_then(Timestamp::from_value)
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is missing field '{0}'")]
    MissingField(&'static str),

    #[error("document has invalid field '{0}'")]
    InvalidField(&'static str),

    #[error("invalid document identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    #[error("invalid signature encoding: {0}")]
    InvalidSignature(#[from] hex::FromHexError),

    #[error("document data is not a JSON map: {0}")]
    MalformedData(serde_json::Error),

    #[error("could not encode document properties: {0}")]
    Encode(serde_json::Error),

    #[error("expected '{expected}' document, got '{found}'")]
    TypeMismatch { expected: &'static str, found: String },
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::Fields;
    use crate::crypto::{CURVE25519, ED25519, KeyRegistry};
    use crate::status::Status;
    use crate::test_utils::{document_fields, user_identifier};

    use super::{BULLETIN, Document, VISA};

    #[test]
    fn fresh_document() {
        let document = Document::new(user_identifier(), VISA);

        assert_eq!(document.doc_type(), VISA);
        assert_eq!(document.property("type"), Some(&json!(VISA)));
        assert!(document.created_time().is_some());
        assert!(document.time().is_none());
        assert!(document.data().is_none());
        assert!(document.signature().is_none());
        assert_eq!(document.status(), Status::Unverified);
    }

    #[test]
    fn sign_and_verify() {
        let registry = KeyRegistry::with_defaults();
        let private_key = registry.generate_private_key(ED25519).unwrap();

        let mut document = Document::new(user_identifier(), VISA);
        document.set_name(Some("Alice"));
        document.sign(private_key.as_ref()).unwrap();

        assert!(document.is_valid());
        assert!(document.time().is_some());
        assert!(document.verify(private_key.public_key().as_ref()));

        // Anyone receiving the document can verify it as well
        let mut received = Document::parse(&document.to_fields()).unwrap();
        assert_eq!(received.status(), Status::Unverified);
        assert_eq!(received.name(), Some("Alice"));
        assert!(received.verify(private_key.public_key().as_ref()));
    }

    #[test]
    fn verify_with_wrong_key() {
        let registry = KeyRegistry::with_defaults();
        let private_key = registry.generate_private_key(ED25519).unwrap();
        let other_key = registry.generate_private_key(CURVE25519).unwrap();

        let mut document = Document::new(user_identifier(), VISA);
        document.sign(private_key.as_ref()).unwrap();

        let mut received = Document::parse(&document.to_fields()).unwrap();
        assert!(!received.verify(other_key.public_key().as_ref()));
        assert_eq!(received.status(), Status::Invalid);

        // Check can be repeated with the right key
        assert!(received.verify(private_key.public_key().as_ref()));
    }

    #[test]
    fn sign_is_idempotent() {
        let registry = KeyRegistry::with_defaults();
        let private_key = registry.generate_private_key(ED25519).unwrap();

        let mut document = Document::new(user_identifier(), VISA);
        let signature = document.sign(private_key.as_ref()).unwrap();
        let data = document.data().map(str::to_string);

        assert_eq!(document.sign(private_key.as_ref()).unwrap(), signature);
        assert_eq!(document.data().map(str::to_string), data);
    }

    #[test]
    fn mutation_requires_signing_again() {
        let registry = KeyRegistry::with_defaults();
        let private_key = registry.generate_private_key(ED25519).unwrap();
        let public_key = private_key.public_key();

        let mut document = Document::new(user_identifier(), VISA);
        document.sign(private_key.as_ref()).unwrap();
        assert!(document.verify(public_key.as_ref()));

        document.set_property("avatar", Some(json!("https://example.org/a.png")));
        assert!(document.data().is_none());
        assert!(document.signature().is_none());
        assert_eq!(document.status(), Status::Unverified);
        assert!(!document.verify(public_key.as_ref()));

        // Removing properties counts as well
        document.sign(private_key.as_ref()).unwrap();
        document.set_property("avatar", None);
        assert!(document.property("avatar").is_none());
        assert!(!document.verify(public_key.as_ref()));

        document.sign(private_key.as_ref()).unwrap();
        assert!(document.verify(public_key.as_ref()));
    }

    #[test]
    fn inconsistent_document_is_invalid() {
        let registry = KeyRegistry::with_defaults();
        let private_key = registry.generate_private_key(ED25519).unwrap();

        let mut document = Document::new(user_identifier(), VISA);
        document.sign(private_key.as_ref()).unwrap();

        // Data without signature
        let mut fields = document.to_fields();
        fields.remove("signature");

        let mut received = Document::parse(&fields).unwrap();
        assert!(received.data().is_some());
        assert!(!received.verify(private_key.public_key().as_ref()));
        assert_eq!(received.status(), Status::Invalid);

        // Signature without data
        let mut fields = document.to_fields();
        fields.remove("data");

        let mut received = Document::parse(&fields).unwrap();
        assert!(received.signature().is_some());
        assert!(!received.verify(private_key.public_key().as_ref()));
        assert_eq!(received.status(), Status::Invalid);
    }

    #[test]
    fn tampered_data() {
        let registry = KeyRegistry::with_defaults();
        let private_key = registry.generate_private_key(ED25519).unwrap();

        let mut document = Document::new(user_identifier(), VISA);
        document.set_name(Some("Alice"));
        document.sign(private_key.as_ref()).unwrap();

        let data = document.data().unwrap().replace("Alice", "Mallory");
        let mut fields = document.to_fields();
        fields.insert("data".into(), Value::from(data));

        let mut received = Document::parse(&fields).unwrap();
        assert_eq!(received.name(), Some("Mallory"));
        assert!(!received.verify(private_key.public_key().as_ref()));
    }

    #[test]
    fn serialization_is_sorted() {
        let registry = KeyRegistry::with_defaults();
        let private_key = registry.generate_private_key(ED25519).unwrap();

        let mut document = Document::new(user_identifier(), VISA);
        document.set_property("zebra", Some(json!(1)));
        document.set_property("aardvark", Some(json!(2)));
        document.sign(private_key.as_ref()).unwrap();

        let data = document.data().unwrap();
        let aardvark = data.find("aardvark").unwrap();
        let created_time = data.find("created_time").unwrap();
        let zebra = data.find("zebra").unwrap();
        assert!(aardvark < created_time && created_time < zebra);
    }

    #[test]
    fn malformed_documents() {
        // Missing identifier
        assert!(Document::parse(&Fields::new()).is_none());

        // Data is not a map
        assert!(Document::parse(&document_fields(json!({ "data": "[1, 2]" }))).is_none());
        assert!(Document::parse(&document_fields(json!({ "data": "{" }))).is_none());

        // Signature not hex
        assert!(
            Document::parse(&document_fields(json!({ "data": "{}", "signature": "xyz" })))
                .is_none()
        );
    }

    #[test]
    fn document_type_fallback() {
        // Declared type
        let document = Document::parse(&document_fields(json!({ "type": BULLETIN }))).unwrap();
        assert_eq!(document.doc_type(), BULLETIN);

        // Type from signed properties
        let document =
            Document::parse(&document_fields(json!({ "data": "{\"type\":\"bulletin\"}" })))
                .unwrap();
        assert_eq!(document.doc_type(), BULLETIN);

        // Guessed from the identifier
        let document = Document::parse(&document_fields(json!({}))).unwrap();
        assert_eq!(document.doc_type(), VISA);
    }
}
