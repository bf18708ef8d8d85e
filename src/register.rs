// SPDX-License-Identifier: MIT OR Apache-2.0

//! Creates local users and groups.
//!
//! A new user gets a meta key rooting the identity and a separate visa key others encrypt
//! messages with. The visa is signed with the meta key. A new group is rooted in the founder's
//! key, its bulletin is signed by the founder.
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::crypto::{KeyError, KeyRegistry, PrivateKey};
use crate::document::{Bulletin, DocumentError, Visa};
use crate::identifier::{EntityType, Identifier};
use crate::meta::{Meta, MetaError};

/// Seed of user metas, the human-readable name lives in the visa.
pub const USER_SEED: &str = "user";

/// Locally created user with all key material.
#[derive(Clone, Debug)]
pub struct User {
    pub identifier: Identifier,
    pub meta: Meta,
    pub private_key: Arc<dyn PrivateKey>,
    pub visa_key: Arc<dyn PrivateKey>,
    pub visa: Visa,
}

/// Locally created group.
#[derive(Clone, Debug)]
pub struct Group {
    pub identifier: Identifier,
    pub meta: Meta,
    pub bulletin: Bulletin,
}

/// Creates users and groups with the configured meta type and key algorithms.
#[derive(Debug)]
pub struct Register<'a> {
    config: &'a Config,
    registry: &'a KeyRegistry,
}

impl<'a> Register<'a> {
    pub fn new(config: &'a Config, registry: &'a KeyRegistry) -> Self {
        Self { config, registry }
    }

    /// Creates a user with a signed visa carrying name, avatar and visa key.
    pub fn create_user(&self, name: &str, avatar: Option<&str>) -> Result<User, RegisterError> {
        let private_key = self
            .registry
            .generate_private_key(&self.config.meta_key_algorithm)?;
        let meta = Meta::generate(
            self.config.meta_type,
            private_key.as_ref(),
            self.seed(USER_SEED),
        )?;
        let identifier = meta.generate_identifier(EntityType::User, None);

        let visa_key = self
            .registry
            .generate_private_key(&self.config.visa_key_algorithm)?;
        if visa_key.as_decrypt_key().is_none() {
            return Err(RegisterError::VisaKeyCannotDecrypt(
                self.config.visa_key_algorithm.clone(),
            ));
        }

        let mut visa = Visa::new(identifier.clone());
        visa.set_name(Some(name));
        visa.set_avatar(avatar);
        visa.set_public_key(visa_key.public_key().as_ref());
        visa.sign(private_key.as_ref())?;

        debug!(%identifier, "created user");

        Ok(User {
            identifier,
            meta,
            private_key,
            visa_key,
            visa,
        })
    }

    /// Creates a group founded by the owner of `founder_key`.
    ///
    /// The seed becomes the name part of the group identifier.
    pub fn create_group(
        &self,
        founder: &Identifier,
        founder_key: &dyn PrivateKey,
        name: &str,
        seed: &str,
    ) -> Result<Group, RegisterError> {
        let meta = Meta::generate(self.config.meta_type, founder_key, self.seed(seed))?;
        let identifier = meta.generate_identifier(EntityType::Group, None);

        let mut bulletin = Bulletin::new(identifier.clone());
        bulletin.set_name(Some(name));
        bulletin.set_founder(founder);
        bulletin.sign(founder_key)?;

        debug!(%identifier, %founder, "created group");

        Ok(Group {
            identifier,
            meta,
            bulletin,
        })
    }

    fn seed<'s>(&self, seed: &'s str) -> Option<&'s str> {
        self.config.meta_type.has_seed().then_some(seed)
    }
}

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Meta(#[from] MetaError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("visa key algorithm '{0}' does not support encryption")]
    VisaKeyCannotDecrypt(String),
}
