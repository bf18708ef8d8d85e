// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dim-core` is the trust and protocol-dispatch layer of a decentralized-identity messaging
//! protocol.
//!
//! Identities are rooted in a self-certifying [`Meta`](meta::Meta): a public key, optionally
//! bound to a human-readable seed through a fingerprint signature. On top of an identity live
//! mutable, independently signed [`Document`](document::Document)s: a [`Visa`](document::Visa)
//! describes a user, a [`Bulletin`](document::Bulletin) describes a group. All signing and
//! verification goes through the pluggable key algebra in [`crypto`].
//!
//! Incoming protocol messages arrive as structured key-value [`Fields`]. The factory chain in
//! [`content`] turns them into typed content and commands, the [`dispatch`] module resolves a
//! processor for them through a cached, creator-backed lookup.
//!
//! The crate performs no I/O. Storage, transport and sessions are collaborators which hand data
//! in and take results out.
pub mod config;
pub mod content;
pub mod crypto;
pub mod dispatch;
pub mod document;
pub mod identifier;
pub mod meta;
pub mod notification;
pub mod register;
mod status;
#[cfg(test)]
mod test_utils;
mod timestamp;

pub use config::Config;
pub use identifier::{Address, EntityType, Identifier, IdentifierError};
pub use meta::{Meta, MetaError, MetaType};
pub use status::Status;
pub use timestamp::Timestamp;

/// Structured key-value representation of protocol data (metas, documents, contents, keys).
pub type Fields = serde_json::Map<String, serde_json::Value>;
