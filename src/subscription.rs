//! Declarative query subscriptions attached to a sync session.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::model::{BookRecord, Model, UserSession};
use crate::session::Identity;

/// Which records of a collection a subscription covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    All,
    ById(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySubscription {
    pub name: String,
    pub collection: String,
    pub query: Query,
}

impl QuerySubscription {
    pub fn matches(&self, collection: &str, id: &str) -> bool {
        self.collection == collection
            && match &self.query {
                Query::All => true,
                Query::ById(wanted) => wanted == id,
            }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSpec {
    pub subscriptions: Vec<QuerySubscription>,
    /// Re-evaluate the subscription set every time the session opens. When
    /// false, a set already registered for the identity is kept as is.
    pub rerun_on_open: bool,
}

impl SubscriptionSpec {
    pub fn covers(&self, collection: &str, id: &str) -> bool {
        self.subscriptions
            .iter()
            .any(|subscription| subscription.matches(collection, id))
    }

    pub fn get(&self, name: &str) -> Option<&QuerySubscription> {
        self.subscriptions.iter().find(|s| s.name == name)
    }
}

/// Caller context a session is opened from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// App start: subscriptions are re-evaluated on every open.
    Launch,
    /// Re-open after registration: the existing subscription set is reused.
    AfterRegistration,
}

impl OpenMode {
    pub fn rerun_on_open(&self) -> bool {
        matches!(self, OpenMode::Launch)
    }
}

pub struct SubscriptionConfigurator {
    catalog_name: String,
    user_name: String,
}

impl SubscriptionConfigurator {
    pub fn new(config: &Config) -> Self {
        Self {
            catalog_name: config.catalog_subscription.clone(),
            user_name: config.user_subscription.clone(),
        }
    }

    /// The book catalog plus the single user record of `identity`.
    pub fn build(&self, identity: &Identity, mode: OpenMode) -> SubscriptionSpec {
        SubscriptionSpec {
            subscriptions: vec![
                QuerySubscription {
                    name: self.catalog_name.clone(),
                    collection: BookRecord::COLLECTION.to_string(),
                    query: Query::All,
                },
                QuerySubscription {
                    name: self.user_name.clone(),
                    collection: UserSession::COLLECTION.to_string(),
                    query: Query::ById(identity.id.clone()),
                },
            ],
            rerun_on_open: mode.rerun_on_open(),
        }
    }
}
