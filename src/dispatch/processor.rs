// SPDX-License-Identifier: MIT OR Apache-2.0

use serde_json::Value;
use tracing::{debug, warn};

use crate::Fields;
use crate::content::{BaseContent, Content, ContentFactories, RECEIPT};
use crate::dispatch::{ProcessorCreator, ProcessorFactory};
use crate::notification::{Notification, NotificationCenter};

/// Receipt text for contents nobody can handle.
pub const CONTENT_NOT_SUPPORTED: &str = "Content not support.";

/// Parses incoming contents and hands them to their processor.
///
/// Contents which can't be parsed or have no processor are answered with a receipt and reported
/// to the notification center, they never fail the pipeline.
#[derive(Debug)]
pub struct MessageProcessor<C> {
    factories: ContentFactories,
    dispatcher: ProcessorFactory<C>,
    notifications: NotificationCenter,
}

impl<C> MessageProcessor<C>
where
    C: ProcessorCreator,
{
    pub fn new(factories: ContentFactories, creator: C, notifications: NotificationCenter) -> Self {
        Self {
            factories,
            dispatcher: ProcessorFactory::new(creator),
            notifications,
        }
    }

    pub fn factories(&self) -> &ContentFactories {
        &self.factories
    }

    pub fn dispatcher(&self) -> &ProcessorFactory<C> {
        &self.dispatcher
    }

    /// Processes raw content fields and returns the responses.
    pub async fn process(&self, fields: Fields) -> Vec<Content> {
        let content_type = fields
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);
        let sn = fields.get("sn").and_then(Value::as_u64);

        let Some(content) = self.factories.parse(fields) else {
            warn!(?content_type, "dropping malformed content");
            self.notifications.post(Notification::ContentMalformed {
                content_type: content_type.clone(),
            });
            return vec![receipt(content_type.as_deref(), sn, None)];
        };

        self.process_content(&content).await
    }

    /// Processes already parsed content and returns the responses.
    pub async fn process_content(&self, content: &Content) -> Vec<Content> {
        match self.dispatcher.resolve(content).await {
            Some(processor) => processor.process_content(content),
            None => {
                let command = content.as_command();
                debug!(
                    content_type = content.content_type(),
                    command = command.map(|command| command.command_name()),
                    "content not supported"
                );

                self.notifications.post(Notification::ContentUnsupported {
                    content_type: content.content_type().to_string(),
                    command: command.map(|command| command.command_name().to_string()),
                });

                vec![receipt(
                    Some(content.content_type()),
                    command.map(|command| command.sn()),
                    command.map(|command| command.command_name()),
                )]
            }
        }
    }
}

fn receipt(content_type: Option<&str>, sn: Option<u64>, command: Option<&str>) -> Content {
    let mut original = Fields::new();
    if let Some(content_type) = content_type {
        original.insert("type".into(), Value::from(content_type));
    }
    if let Some(sn) = sn {
        original.insert("sn".into(), Value::from(sn));
    }
    if let Some(command) = command {
        original.insert("command".into(), Value::from(command));
    }

    Content::Base(
        BaseContent::new(RECEIPT)
            .with("text", CONTENT_NOT_SUPPORTED)
            .with("original", Value::Object(original)),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::config::Config;
    use crate::content::{COMMAND, ContentFactories, RECEIPT, TEXT};
    use crate::notification::{Notification, NotificationCenter};
    use crate::test_utils::{CountingCreator, content_fields, setup_logging};

    use super::{CONTENT_NOT_SUPPORTED, MessageProcessor};

    fn processor(
        content_types: &[&str],
        commands: &[&str],
    ) -> (MessageProcessor<CountingCreator>, NotificationCenter) {
        let config = Config::default();
        let notifications = NotificationCenter::from_config(&config);
        let processor = MessageProcessor::new(
            ContentFactories::with_defaults(&config),
            CountingCreator::new(content_types, commands),
            notifications.clone(),
        );
        (processor, notifications)
    }

    #[tokio::test]
    async fn process_supported_content() {
        let (processor, notifications) = processor(&[TEXT], &[]);
        let mut subscription = notifications.subscribe();

        let responses = processor
            .process(content_fields(json!({ "type": TEXT, "text": "Hello, Panda!" })))
            .await;

        // Test processor echoes the content
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].content_type(), TEXT);
        assert!(subscription.try_recv().is_none());
    }

    #[tokio::test]
    async fn unsupported_content() {
        setup_logging();

        let (processor, notifications) = processor(&[TEXT], &[]);
        let mut subscription = notifications.subscribe();

        let responses = processor
            .process(content_fields(
                json!({ "type": COMMAND, "sn": 9, "command": "handshake" }),
            ))
            .await;

        assert_eq!(responses.len(), 1);
        let receipt = responses[0].base();
        assert_eq!(receipt.content_type(), RECEIPT);
        assert_eq!(receipt.get("text"), Some(&json!(CONTENT_NOT_SUPPORTED)));
        assert_eq!(
            receipt.get("original"),
            Some(&json!({ "type": COMMAND, "sn": 9, "command": "handshake" }))
        );

        assert_eq!(
            subscription.try_recv(),
            Some(Notification::ContentUnsupported {
                content_type: COMMAND.to_string(),
                command: Some("handshake".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn malformed_content() {
        let (processor, notifications) = processor(&[COMMAND], &[]);
        let mut subscription = notifications.subscribe();

        let responses = processor
            .process(content_fields(json!({ "type": COMMAND, "sn": 1 })))
            .await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].content_type(), RECEIPT);
        assert_eq!(
            subscription.try_recv(),
            Some(Notification::ContentMalformed {
                content_type: Some(COMMAND.to_string()),
            })
        );
    }
}
