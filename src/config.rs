// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for identity creation and content parsing.
use serde::{Deserialize, Serialize};

use crate::crypto::{CURVE25519, ED25519};
use crate::meta::MetaType;

/// Default capacity of the notification channel.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 128;

/// Configuration parameters for local identities and the message processor.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Meta type of newly created users and groups.
    pub meta_type: MetaType,

    /// Algorithm of the key rooting new identities.
    pub meta_key_algorithm: String,

    /// Algorithm of the visa key others encrypt messages with. Needs to support encryption.
    pub visa_key_algorithm: String,

    /// Treat every command carrying a `group` field as a group command, regardless of its command
    /// name. Some senders rely on this.
    pub group_command_fallback: bool,

    /// Number of notifications buffered for slow subscribers before they start missing some.
    pub notification_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta_type: MetaType::Mkm,
            meta_key_algorithm: ED25519.to_string(),
            visa_key_algorithm: CURVE25519.to_string(),
            group_command_fallback: true,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::meta::MetaType;

    use super::Config;

    #[test]
    fn partial_config() {
        let config: Config = serde_json::from_value(json!({
            "meta_type": "btc",
            "group_command_fallback": false,
        }))
        .unwrap();

        assert_eq!(config.meta_type, MetaType::Btc);
        assert!(!config.group_command_fallback);
        assert_eq!(config.visa_key_algorithm, Config::default().visa_key_algorithm);
    }
}
