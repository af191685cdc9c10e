//! services/scheduler/src/adapters/events.rs
//!
//! An `EventPublisher` that writes each domain event to the log as JSON.
//! A broker-backed publisher would implement the same port.

use async_trait::async_trait;
use intake_scheduler_core::domain::DomainEvent;
use intake_scheduler_core::ports::{EventPublisher, PortError, PortResult};
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

impl TracingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) -> PortResult<()> {
        for event in events {
            let payload =
                serde_json::to_string(&event).map_err(|e| PortError::Unexpected(e.to_string()))?;
            info!(target: "domain_events", %payload, "Domain event.");
        }
        Ok(())
    }
}
