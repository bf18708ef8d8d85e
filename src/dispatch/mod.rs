// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolves processors for typed contents.
//!
//! Processors are expensive to build and cheap to reuse. The [`ProcessorFactory`] asks a
//! [`ProcessorCreator`] for a processor the first time a content type or command name shows up
//! and keeps it for all later lookups. Creators which don't know a key return `None`, this is
//! not remembered so a creator which learns about new keys later still gets asked. Unknown keys
//! leave no trace in the caches, peers can't grow them by sending made-up content types or
//! command names.
//!
//! Lookup order, first match wins:
//!
//! 1. commands: processor for the command name
//! 2. group commands: processor for [`GROUP`]
//! 3. processor for the content type
//!
//! The factory is shared by all tasks processing messages. Its caches hold a fair read-write
//! lock only while looking up or inserting an entry, never while a creator runs. Concurrent
//! lookups of a missing key wait for the same creator call.
mod processor;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, trace};

use crate::content::{Content, GROUP};

pub use processor::{CONTENT_NOT_SUPPORTED, MessageProcessor};

/// Acts on parsed contents and returns responses for the sender.
pub trait ContentProcessor: Send + Sync {
    fn process_content(&self, content: &Content) -> Vec<Content>;
}

/// Creates processors on demand.
pub trait ProcessorCreator: Send + Sync {
    /// Returns a processor for contents of the given type, `None` if there is none.
    fn create_content_processor(
        &self,
        content_type: &str,
    ) -> impl Future<Output = Option<Arc<dyn ContentProcessor>>> + Send;

    /// Returns a processor for the named command, `None` if there is none.
    fn create_command_processor(
        &self,
        content_type: &str,
        command: &str,
    ) -> impl Future<Output = Option<Arc<dyn ContentProcessor>>> + Send;
}

type ProcessorCell = Arc<OnceCell<Arc<dyn ContentProcessor>>>;

/// Creator returned no processor.
struct NotCreated;

#[derive(Default)]
struct ProcessorCache {
    cells: RwLock<HashMap<String, ProcessorCell>>,
}

impl ProcessorCache {
    async fn cell(&self, key: &str) -> ProcessorCell {
        if let Some(cell) = self.cells.read().await.get(key) {
            return cell.clone();
        }

        self.cells
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    async fn get_or_create<F, Fut>(&self, key: &str, create: F) -> Option<Arc<dyn ContentProcessor>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<Arc<dyn ContentProcessor>>>,
    {
        let cell = self.cell(key).await;

        if let Some(processor) = cell.get() {
            trace!(key, "processor cache hit");
            return Some(processor.clone());
        }

        let result = cell
            .get_or_try_init(move || async move {
                debug!(key, "creating processor");
                create().await.ok_or(NotCreated)
            })
            .await
            .cloned();

        match result {
            Ok(processor) => Some(processor),
            Err(NotCreated) => {
                debug!(key, "no processor available");
                self.forget(key, cell).await;
                None
            }
        }
    }

    /// Drops the entry of a key nobody has a processor for.
    ///
    /// Keys come from remote peers, entries are only kept for created processors. The entry stays
    /// when another lookup already holds the cell, that lookup retries creation and cleans up.
    async fn forget(&self, key: &str, cell: ProcessorCell) {
        let mut cells = self.cells.write().await;

        // One reference is held by the map, one by us
        let unused = !cell.initialized() && Arc::strong_count(&cell) <= 2;
        let current = cells.get(key).is_some_and(|entry| Arc::ptr_eq(entry, &cell));

        // Released under the lock, so the last failed lookup sees no other holder
        drop(cell);

        if unused && current {
            cells.remove(key);
        }
    }

    async fn len(&self) -> usize {
        self.cells
            .read()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }
}

/// Cached processor lookup backed by a [`ProcessorCreator`].
pub struct ProcessorFactory<C> {
    creator: C,
    content_processors: ProcessorCache,
    command_processors: ProcessorCache,
}

impl<C> ProcessorFactory<C>
where
    C: ProcessorCreator,
{
    pub fn new(creator: C) -> Self {
        Self {
            creator,
            content_processors: ProcessorCache::default(),
            command_processors: ProcessorCache::default(),
        }
    }

    /// Returns the processor responsible for the content, `None` if nobody handles it.
    pub async fn resolve(&self, content: &Content) -> Option<Arc<dyn ContentProcessor>> {
        let content_type = content.content_type();

        if let Some(command) = content.as_command() {
            let name = command.command_name();
            if let Some(processor) = self.command_processor(content_type, name).await {
                return Some(processor);
            }

            if content.as_group_command().is_some() && name != GROUP {
                if let Some(processor) = self.command_processor(content_type, GROUP).await {
                    return Some(processor);
                }
            }
        }

        self.content_processor(content_type).await
    }

    /// Returns the processor for a content type.
    pub async fn content_processor(&self, content_type: &str) -> Option<Arc<dyn ContentProcessor>> {
        self.content_processors
            .get_or_create(content_type, || {
                self.creator.create_content_processor(content_type)
            })
            .await
    }

    /// Returns the processor for a command name.
    pub async fn command_processor(
        &self,
        content_type: &str,
        command: &str,
    ) -> Option<Arc<dyn ContentProcessor>> {
        self.command_processors
            .get_or_create(command, || {
                self.creator.create_command_processor(content_type, command)
            })
            .await
    }

    /// Number of cached content and command processors.
    pub async fn cached(&self) -> (usize, usize) {
        (
            self.content_processors.len().await,
            self.command_processors.len().await,
        )
    }

    pub fn creator(&self) -> &C {
        &self.creator
    }
}

impl<C> fmt::Debug for ProcessorFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorFactory").finish_non_exhaustive()
    }
}
