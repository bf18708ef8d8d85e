// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::Fields;
use crate::content::Content;
use crate::dispatch::{ContentProcessor, ProcessorCreator};
use crate::identifier::{Address, EntityType, Identifier};

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

pub fn user_identifier() -> Identifier {
    Identifier::new(
        Some("alice"),
        Address::derive(EntityType::User, b"alice"),
        None,
    )
}

pub fn group_identifier() -> Identifier {
    Identifier::new(
        Some("pandas"),
        Address::derive(EntityType::Group, b"pandas"),
        None,
    )
}

pub fn content_fields(value: Value) -> Fields {
    match value {
        Value::Object(fields) => fields,
        _ => panic!("content fields need to be a map"),
    }
}

/// Document fields for [`user_identifier`] unless `did` is given.
pub fn document_fields(value: Value) -> Fields {
    let mut fields = content_fields(value);
    fields
        .entry("did")
        .or_insert_with(|| Value::from(user_identifier().to_string()));
    fields
}

/// Processor answering every content with itself.
#[derive(Debug)]
pub struct EchoProcessor;

impl ContentProcessor for EchoProcessor {
    fn process_content(&self, content: &Content) -> Vec<Content> {
        vec![content.clone()]
    }
}

/// Creator which knows a fixed set of content types and commands and counts its calls.
#[derive(Debug, Default)]
pub struct CountingCreator {
    content_types: Mutex<HashSet<String>>,
    commands: HashSet<String>,
    content_calls: Mutex<HashMap<String, usize>>,
    delay: bool,
    pub calls: AtomicUsize,
}

impl CountingCreator {
    pub fn new(content_types: &[&str], commands: &[&str]) -> Self {
        Self {
            content_types: Mutex::new(content_types.iter().map(|s| s.to_string()).collect()),
            commands: commands.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Yields a couple of times before creating, so concurrent lookups overlap.
    pub fn with_delay(mut self) -> Self {
        self.delay = true;
        self
    }

    pub fn enable_content_type(&self, content_type: &str) {
        self.content_types
            .lock()
            .unwrap()
            .insert(content_type.to_string());
    }

    pub fn content_calls(&self, content_type: &str) -> usize {
        self.content_calls
            .lock()
            .unwrap()
            .get(content_type)
            .copied()
            .unwrap_or_default()
    }

    async fn pause(&self) {
        if self.delay {
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
        }
    }
}

impl ProcessorCreator for CountingCreator {
    async fn create_content_processor(
        &self,
        content_type: &str,
    ) -> Option<Arc<dyn ContentProcessor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .content_calls
            .lock()
            .unwrap()
            .entry(content_type.to_string())
            .or_default() += 1;
        self.pause().await;

        let known = self.content_types.lock().unwrap().contains(content_type);
        known.then(|| Arc::new(EchoProcessor) as Arc<dyn ContentProcessor>)
    }

    async fn create_command_processor(
        &self,
        _content_type: &str,
        command: &str,
    ) -> Option<Arc<dyn ContentProcessor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        self.commands
            .contains(command)
            .then(|| Arc::new(EchoProcessor) as Arc<dyn ContentProcessor>)
    }
}
