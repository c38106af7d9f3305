use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::change::ChangeEvent;
use crate::errors::DeliveryError;

/// Best-effort sink for price change events. Callers never retry within a run.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &ChangeEvent) -> Result<(), DeliveryError>;
}

/// Used when no transport is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, event: &ChangeEvent) -> Result<(), DeliveryError> {
        debug!(
            event_name = "notify.noop",
            barcode = %event.barcode,
            direction = event.direction.as_str(),
            "notification transport disabled; dropping change event"
        );
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryNotifier {
    events: Arc<Mutex<Vec<ChangeEvent>>>,
}

impl InMemoryNotifier {
    pub fn events(&self) -> Vec<ChangeEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, event: &ChangeEvent) -> Result<(), DeliveryError> {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
        Ok(())
    }
}
