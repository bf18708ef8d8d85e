// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// UNIX timestamp in seconds.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn new(seconds: u64) -> Self {
        Self(seconds)
    }

    pub fn now() -> Self {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_secs())
            .unwrap_or_default();
        Self(seconds)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Reads a timestamp from a structured value.
    ///
    /// Some senders encode time as float, the fraction gets dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number
                .as_u64()
                .or_else(|| number.as_f64().filter(|secs| *secs >= 0.0).map(|secs| secs as u64))
                .map(Self),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::from(self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
