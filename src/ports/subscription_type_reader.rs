//! Subscription type reader port (read-only view of the product catalogue).

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SubscriptionTypeId};
use crate::domain::subscription::SubscriptionType;

#[async_trait]
pub trait SubscriptionTypeReader: Send + Sync {
    /// Find a subscription type with its items.
    async fn find_by_id(
        &self,
        id: &SubscriptionTypeId,
    ) -> Result<Option<SubscriptionType>, DomainError>;
}
