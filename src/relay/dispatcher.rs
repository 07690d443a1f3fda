//! Inbound dispatcher
//!
//! Applies one upstream message to the registry and acknowledges it back to
//! the device. Registry state is the source of truth: an acknowledgment that
//! fails or times out is logged and reported, never rolled back.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::command::{
    InboundCommand, ACTION_KEY, REGISTER_NEW_CLIENT, STATUS_KEY, STATUS_REGISTERED,
    STATUS_UNREGISTERED, UNREGISTER_CLIENT,
};
use super::live::LiveFeed;
use crate::error::Result;
use crate::gateway::{Data, Priority, UpstreamMessage, XmppMessage, XmppTransport};
use crate::registry::Registry;

/// What a dispatch did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Device registered; `created` is false for a relabel
    Registered { created: bool, acked: bool },
    /// Device removed
    Unregistered { acked: bool },
    /// Control traffic or an unknown action
    Ignored,
}

/// Applies decoded inbound commands to the registry
#[derive(Clone)]
pub struct Dispatcher {
    registry: Registry,
    acks: Arc<dyn XmppTransport>,
    live: LiveFeed,
    ack_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: Registry,
        acks: Arc<dyn XmppTransport>,
        live: LiveFeed,
        ack_timeout: Duration,
    ) -> Self {
        Dispatcher {
            registry,
            acks,
            live,
            ack_timeout,
        }
    }

    /// Dispatch one upstream message.
    ///
    /// Decode failures and unregistering an unknown device are returned as
    /// errors and leave the registry untouched.
    pub async fn dispatch(&self, message: &UpstreamMessage) -> Result<DispatchOutcome> {
        self.live.publish(message);

        if !message.is_data_message() {
            debug!(
                message_type = ?message.message_type,
                message_id = %message.message_id,
                error = ?message.error,
                "Gateway control message"
            );
            return Ok(DispatchOutcome::Ignored);
        }

        match InboundCommand::decode(&message.data)? {
            InboundCommand::Register { token, label } => {
                let (_, created) = self.registry.register(&token, Some(label)).await?;
                info!(token = %token, created, "Client registered");
                let acked = self
                    .send_ack(&token, REGISTER_NEW_CLIENT, STATUS_REGISTERED)
                    .await;
                Ok(DispatchOutcome::Registered { created, acked })
            }
            InboundCommand::Unregister { token } => {
                self.registry.unregister(&token).await?;
                info!(token = %token, "Client unregistered");
                let acked = self
                    .send_ack(&token, UNREGISTER_CLIENT, STATUS_UNREGISTERED)
                    .await;
                Ok(DispatchOutcome::Unregistered { acked })
            }
            InboundCommand::Unknown => {
                debug!(from = %message.from, "Ignoring upstream message without known action");
                Ok(DispatchOutcome::Ignored)
            }
        }
    }

    /// Dispatch and log the result; used by the listener loop
    pub async fn handle(&self, message: &UpstreamMessage) {
        match self.dispatch(message).await {
            Ok(outcome) => debug!(message_id = %message.message_id, ?outcome, "Dispatched"),
            Err(e) => warn!(
                message_id = %message.message_id,
                from = %message.from,
                "Dispatch failed: {}",
                e
            ),
        }
    }

    async fn send_ack(&self, token: &str, action: &str, status: &str) -> bool {
        let mut data = Data::new();
        data.insert(ACTION_KEY.to_string(), Value::from(action));
        data.insert(STATUS_KEY.to_string(), Value::from(status));
        let ack = XmppMessage::data_message(token, data).with_priority(Priority::High);

        match tokio::time::timeout(self.ack_timeout, self.acks.send_xmpp(ack)).await {
            Ok(Ok(response)) => {
                debug!(token, message_id = %response.message_id, status, "Ack sent");
                true
            }
            Ok(Err(e)) => {
                warn!(token, "Sending ack failed: {}", e);
                false
            }
            Err(_) => {
                warn!(token, "Sending ack timed out after {:?}", self.ack_timeout);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::gateway::XmppResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAcks {
        sent: Mutex<Vec<XmppMessage>>,
    }

    #[async_trait]
    impl XmppTransport for RecordingAcks {
        async fn send_xmpp(&self, message: XmppMessage) -> Result<XmppResponse> {
            self.sent.lock().unwrap().push(message);
            Ok(XmppResponse {
                message_id: "ack-1".into(),
            })
        }
    }

    struct FailingAcks;

    #[async_trait]
    impl XmppTransport for FailingAcks {
        async fn send_xmpp(&self, _message: XmppMessage) -> Result<XmppResponse> {
            Err(Error::Transport("bridge down".into()))
        }
    }

    struct StalledAcks;

    #[async_trait]
    impl XmppTransport for StalledAcks {
        async fn send_xmpp(&self, _message: XmppMessage) -> Result<XmppResponse> {
            std::future::pending::<Result<XmppResponse>>().await
        }
    }

    fn upstream(value: serde_json::Value) -> UpstreamMessage {
        UpstreamMessage::data("device", serde_json::from_value(value).unwrap())
    }

    fn dispatcher_with(acks: Arc<dyn XmppTransport>) -> (Dispatcher, Registry) {
        let registry = Registry::in_memory();
        let dispatcher = Dispatcher::new(
            registry.clone(),
            acks,
            LiveFeed::new(),
            Duration::from_millis(200),
        );
        (dispatcher, registry)
    }

    #[tokio::test]
    async fn test_register_creates_and_acks() {
        let acks = Arc::new(RecordingAcks::default());
        let (dispatcher, registry) = dispatcher_with(acks.clone());

        let outcome = dispatcher
            .dispatch(&upstream(json!({
                "action": "register_new_client",
                "registration_token": "T2",
                "stringIdentifier": "B"
            })))
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Registered { created: true, acked: true });
        let clients = registry.list().await.unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].registration_token, "T2");
        assert_eq!(clients[0].string_identifier.as_deref(), Some("B"));

        let sent = acks.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "T2");
        assert_eq!(sent[0].priority, Some(Priority::High));
        let data = sent[0].data.as_ref().unwrap();
        assert_eq!(data["status"], "registered");
        assert_eq!(data["action"], "register_new_client");
    }

    #[tokio::test]
    async fn test_repeat_register_updates_label() {
        let (dispatcher, registry) = dispatcher_with(Arc::new(RecordingAcks::default()));
        let first = upstream(json!({
            "action": "register_new_client",
            "registration_token": "T3",
            "stringIdentifier": "old"
        }));
        let second = upstream(json!({
            "action": "register_new_client",
            "registration_token": "T3",
            "stringIdentifier": "new"
        }));

        dispatcher.dispatch(&first).await.unwrap();
        let outcome = dispatcher.dispatch(&second).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Registered { created: false, acked: true });
        let clients = registry.list().await.unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].string_identifier.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_unregister_present_deletes_and_acks() {
        let acks = Arc::new(RecordingAcks::default());
        let (dispatcher, registry) = dispatcher_with(acks.clone());
        registry.register("T4", None).await.unwrap();

        let outcome = dispatcher
            .dispatch(&upstream(json!({
                "action": "unregister_client",
                "registration_token": "T4"
            })))
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Unregistered { acked: true });
        assert!(!registry.exists("T4").await);
        let sent = acks.sent.lock().unwrap();
        assert_eq!(sent[0].data.as_ref().unwrap()["status"], "unregistered");
    }

    #[tokio::test]
    async fn test_unregister_absent_is_reported_without_ack() {
        let acks = Arc::new(RecordingAcks::default());
        let (dispatcher, registry) = dispatcher_with(acks.clone());

        let err = dispatcher
            .dispatch(&upstream(json!({
                "action": "unregister_client",
                "registration_token": "tokenX"
            })))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert!(registry.list().await.unwrap().is_empty());
        assert!(acks.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_decode_failure_leaves_registry_unchanged() {
        let acks = Arc::new(RecordingAcks::default());
        let (dispatcher, registry) = dispatcher_with(acks.clone());
        registry.register("keep", Some("me".into())).await.unwrap();

        let err = dispatcher
            .dispatch(&upstream(json!({
                "action": "register_new_client",
                "registration_token": "T5"
            })))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Decode { ref field } if field == "stringIdentifier"));
        assert_eq!(
            registry.list().await.unwrap(),
            vec![crate::registry::ClientRecord::new("keep", Some("me".into()))]
        );
        assert!(acks.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_control_messages_are_ignored() {
        let acks = Arc::new(RecordingAcks::default());
        let (dispatcher, registry) = dispatcher_with(acks.clone());

        let unknown = upstream(json!({ "action": "say_hello" }));
        assert_eq!(dispatcher.dispatch(&unknown).await.unwrap(), DispatchOutcome::Ignored);

        let mut nack = upstream(json!({
            "action": "register_new_client",
            "registration_token": "T6",
            "stringIdentifier": "C"
        }));
        nack.message_type = Some("nack".into());
        assert_eq!(dispatcher.dispatch(&nack).await.unwrap(), DispatchOutcome::Ignored);

        assert!(registry.list().await.unwrap().is_empty());
        assert!(acks.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_ack_keeps_mutation() {
        let (dispatcher, registry) = dispatcher_with(Arc::new(FailingAcks));

        let outcome = dispatcher
            .dispatch(&upstream(json!({
                "action": "register_new_client",
                "registration_token": "T7",
                "stringIdentifier": "D"
            })))
            .await
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Registered { created: true, acked: false });
        assert!(registry.exists("T7").await);
    }

    #[tokio::test]
    async fn test_stalled_ack_is_bounded() {
        let (dispatcher, registry) = dispatcher_with(Arc::new(StalledAcks));

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            dispatcher.dispatch(&upstream(json!({
                "action": "register_new_client",
                "registration_token": "T8",
                "stringIdentifier": "E"
            }))),
        )
        .await
        .expect("dispatch must not hang on a stalled gateway")
        .unwrap();

        assert_eq!(outcome, DispatchOutcome::Registered { created: true, acked: false });
        assert!(registry.exists("T8").await);
    }

    #[tokio::test]
    async fn test_event_mirrored_to_live_viewer() {
        let registry = Registry::in_memory();
        let live = LiveFeed::new();
        let mut viewer = live.attach();
        let dispatcher = Dispatcher::new(
            registry,
            Arc::new(RecordingAcks::default()),
            live,
            Duration::from_millis(200),
        );

        let message = upstream(json!({ "action": "say_hello" }));
        dispatcher.dispatch(&message).await.unwrap();

        assert_eq!(viewer.recv().await.unwrap(), message);
    }
}
