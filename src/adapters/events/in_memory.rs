//! In-process event bus.
//!
//! Delivers events synchronously to subscribed handlers and keeps every
//! published envelope for inspection. Used by the integration tests and
//! by the binary, which has no external broker to publish to.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::{EventHandler, EventPublisher, EventSubscriber};

/// In-memory event bus.
///
/// # Panics
///
/// Methods panic if an internal lock is poisoned.
#[derive(Default)]
pub struct InMemoryEventBus {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    published: RwLock<Vec<EventEnvelope>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    // === Inspection ===

    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .clone()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.filtered(|e| e.event_type == event_type)
    }

    pub fn events_for_aggregate(&self, aggregate_id: &str) -> Vec<EventEnvelope> {
        self.filtered(|e| e.aggregate_id == aggregate_id)
    }

    /// Deserialized payloads of every event of a type, in publish order.
    ///
    /// Envelopes whose payload doesn't match `T` are skipped.
    pub fn payloads_of<T>(&self, event_type: &str) -> Vec<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.events_of_type(event_type)
            .iter()
            .filter_map(|e| e.payload_as::<T>().ok())
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .len()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .iter()
            .any(|e| e.event_type == event_type)
    }

    pub fn clear(&self) {
        self.published
            .write()
            .expect("InMemoryEventBus: published lock poisoned")
            .clear();
    }

    fn filtered(&self, predicate: impl Fn(&EventEnvelope) -> bool) -> Vec<EventEnvelope> {
        self.published
            .read()
            .expect("InMemoryEventBus: published lock poisoned")
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    fn handlers_for(&self, event_type: &str) -> Vec<Arc<dyn EventHandler>> {
        self.handlers
            .read()
            .expect("InMemoryEventBus: handlers lock poisoned")
            .get(event_type)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        self.published
            .write()
            .expect("InMemoryEventBus: published lock poisoned")
            .push(event.clone());

        // Handlers are cloned out so no lock is held across an await.
        let mut failures = Vec::new();
        for handler in self.handlers_for(&event.event_type) {
            if let Err(err) = handler.handle(event.clone()).await {
                tracing::warn!(
                    handler = handler.name(),
                    event_type = %event.event_type,
                    error = %err,
                    "Event handler failed"
                );
                failures.push(format!("{}: {}", handler.name(), err));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::InternalError,
                format!(
                    "{} handler(s) failed for {}: {}",
                    failures.len(),
                    event.event_type,
                    failures.join("; ")
                ),
            ))
        }
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.subscribe_all(&[event_type], handler);
    }

    fn subscribe_all(&self, event_types: &[&str], handler: Arc<dyn EventHandler>) {
        let mut handlers = self
            .handlers
            .write()
            .expect("InMemoryEventBus: handlers lock poisoned");
        for event_type in event_types {
            handlers
                .entry((*event_type).to_string())
                .or_default()
                .push(Arc::clone(&handler));
        }
    }
}
