// SPDX-License-Identifier: MIT OR Apache-2.0

use std::ops::{Deref, DerefMut};

use serde_json::Value;
use tracing::debug;

use crate::Fields;
use crate::document::{BULLETIN, Document, DocumentError};
use crate::identifier::Identifier;

/// Group profile naming the founder and assistants of a group.
#[derive(Clone, Debug)]
pub struct Bulletin(Document);

impl Bulletin {
    pub fn new(identifier: Identifier) -> Self {
        Self(Document::new(identifier, BULLETIN))
    }

    pub fn parse(fields: &Fields) -> Option<Self> {
        Document::parse(fields).and_then(|document| Self::try_from(document).ok())
    }

    pub fn founder(&self) -> Option<Identifier> {
        self.property("founder")
            .and_then(Value::as_str)
            .and_then(|founder| founder.parse().ok())
    }

    pub fn set_founder(&mut self, founder: &Identifier) {
        self.set_property("founder", Some(Value::from(founder.to_string())));
    }

    /// Assistants of the group, malformed entries are skipped.
    pub fn assistants(&self) -> Vec<Identifier> {
        let Some(Value::Array(assistants)) = self.property("assistants") else {
            return Vec::new();
        };

        assistants
            .iter()
            .filter_map(|assistant| {
                let parsed = assistant.as_str().and_then(|value| value.parse().ok());
                if parsed.is_none() {
                    debug!(%assistant, "ignoring malformed assistant");
                }
                parsed
            })
            .collect()
    }

    pub fn set_assistants(&mut self, assistants: &[Identifier]) {
        let value = (!assistants.is_empty()).then(|| {
            Value::Array(
                assistants
                    .iter()
                    .map(|assistant| Value::from(assistant.to_string()))
                    .collect(),
            )
        });
        self.set_property("assistants", value);
    }

    pub fn into_document(self) -> Document {
        self.0
    }
}

impl TryFrom<Document> for Bulletin {
    type Error = DocumentError;

    fn try_from(document: Document) -> Result<Self, Self::Error> {
        if document.doc_type() != BULLETIN {
            return Err(DocumentError::TypeMismatch {
                expected: BULLETIN,
                found: document.doc_type().to_string(),
            });
        }

        Ok(Self(document))
    }
}

impl Deref for Bulletin {
    type Target = Document;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Bulletin {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::crypto::{ED25519, KeyRegistry};
    use crate::identifier::Identifier;
    use crate::test_utils::{group_identifier, user_identifier};

    use super::Bulletin;

    #[test]
    fn founder_and_assistants() {
        let registry = KeyRegistry::with_defaults();
        let founder_key = registry.generate_private_key(ED25519).unwrap();

        let founder = user_identifier();
        let assistant: Identifier = "bot@assistant".parse().unwrap();

        let mut bulletin = Bulletin::new(group_identifier());
        bulletin.set_name(Some("Pandas"));
        bulletin.set_founder(&founder);
        bulletin.set_assistants(&[assistant.clone()]);
        bulletin.sign(founder_key.as_ref()).unwrap();

        let mut received = Bulletin::parse(&bulletin.to_fields()).unwrap();
        assert!(received.verify(founder_key.public_key().as_ref()));
        assert_eq!(received.name(), Some("Pandas"));
        assert_eq!(received.founder(), Some(founder));
        assert_eq!(received.assistants(), vec![assistant]);

        // Clearing the list removes the property
        received.set_assistants(&[]);
        assert!(received.property("assistants").is_none());
        assert!(received.assistants().is_empty());
    }

    #[test]
    fn malformed_assistants() {
        let mut bulletin = Bulletin::new(group_identifier());
        bulletin.set_property("assistants", Some(json!(["bot@assistant", 42, ""])));

        assert_eq!(bulletin.assistants().len(), 1);
    }
}
