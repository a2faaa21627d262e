//! Change notifications for the persisted collections.
//!
//! Services publish an event after every successful commit. Subscribers pick
//! the collection they care about; transport (websocket, SSE, logging) is up
//! to the consumer.

use std::fmt;

use tokio::sync::broadcast;
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Accounts,
    Payments,
    BillingConfig,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collection::Accounts => "accounts",
            Collection::Payments => "payments",
            Collection::BillingConfig => "billingConfig",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    AccountsChanged { account_ids: Vec<String> },
    AccountRemoved { account_id: String },
    PaymentRecorded { receipt_id: String, account_id: String },
    PaymentDeleted { receipt_id: String },
    BillingConfigSaved,
}

impl ChangeEvent {
    pub fn collection(&self) -> Collection {
        match self {
            ChangeEvent::AccountsChanged { .. } | ChangeEvent::AccountRemoved { .. } => Collection::Accounts,
            ChangeEvent::PaymentRecorded { .. } | ChangeEvent::PaymentDeleted { .. } => Collection::Payments,
            ChangeEvent::BillingConfigSaved => Collection::BillingConfig,
        }
    }
}

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish an event and return how many subscribers will see it.
    /// Having no subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                debug!("No change feed subscribers for {} event", event.collection());
                0
            }
        }
    }

    pub fn subscribe(&self, collection: Collection) -> Subscription {
        Subscription {
            collection: Some(collection),
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to every collection
    pub fn subscribe_all(&self) -> Subscription {
        Subscription {
            collection: None,
            receiver: self.sender.subscribe(),
        }
    }
}

pub struct Subscription {
    collection: Option<Collection>,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    /// Next event for this subscription, or `None` once the feed is closed.
    /// A subscriber that falls behind skips the missed events.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.collection.map_or(true, |c| c == event.collection()) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Change feed subscriber lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_filters_by_collection() {
        let feed = ChangeFeed::new();
        let mut payments = feed.subscribe(Collection::Payments);

        feed.publish(ChangeEvent::BillingConfigSaved);
        feed.publish(ChangeEvent::PaymentRecorded {
            receipt_id: "RCPT-20250301-ABCDEF".to_string(),
            account_id: "m1".to_string(),
        });

        let event = payments.next().await.unwrap();
        assert_eq!(event.collection(), Collection::Payments);
    }

    #[tokio::test]
    async fn test_subscribe_all_sees_everything() {
        let feed = ChangeFeed::new();
        let mut all = feed.subscribe_all();
        feed.publish(ChangeEvent::BillingConfigSaved);
        feed.publish(ChangeEvent::AccountRemoved {
            account_id: "m2".to_string(),
        });
        assert_eq!(all.next().await.unwrap(), ChangeEvent::BillingConfigSaved);
        assert_eq!(all.next().await.unwrap().collection(), Collection::Accounts);
    }

    #[tokio::test]
    async fn test_closed_feed_ends_subscription() {
        let feed = ChangeFeed::new();
        let mut sub = feed.subscribe(Collection::Accounts);
        drop(feed);
        assert!(sub.next().await.is_none());
    }

    #[test]
    fn test_publish_without_subscribers() {
        assert_eq!(ChangeFeed::new().publish(ChangeEvent::BillingConfigSaved), 0);
    }

    #[test]
    fn test_publish_counts_subscribers() {
        let feed = ChangeFeed::new();
        let _accounts = feed.subscribe(Collection::Accounts);
        let _all = feed.subscribe_all();
        assert_eq!(feed.publish(ChangeEvent::BillingConfigSaved), 2);
    }
}
