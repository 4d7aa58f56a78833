//! In-memory subscription type catalogue.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SubscriptionTypeId};
use crate::domain::subscription::SubscriptionType;
use crate::ports::SubscriptionTypeReader;

/// Subscription types held in memory.
///
/// # Panics
///
/// Methods panic if the internal lock is poisoned.
#[derive(Default, Clone)]
pub struct InMemorySubscriptionTypeReader {
    types: Arc<RwLock<HashMap<SubscriptionTypeId, SubscriptionType>>>,
}

impl InMemorySubscriptionTypeReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, subscription_type: SubscriptionType) {
        self.types
            .write()
            .expect("InMemorySubscriptionTypeReader: lock poisoned")
            .insert(subscription_type.id, subscription_type);
    }

    pub fn with(self, subscription_type: SubscriptionType) -> Self {
        self.insert(subscription_type);
        self
    }
}

#[async_trait]
impl SubscriptionTypeReader for InMemorySubscriptionTypeReader {
    async fn find_by_id(
        &self,
        id: &SubscriptionTypeId,
    ) -> Result<Option<SubscriptionType>, DomainError> {
        Ok(self
            .types
            .read()
            .expect("InMemorySubscriptionTypeReader: lock poisoned")
            .get(id)
            .cloned())
    }
}
