use serde::{Deserialize, Serialize};
use subs_types::subscription::{NewSubscription, Subscription};
use subs_types::YearMonth;
use uuid::Uuid;

pub mod controllers;
pub mod memory;
pub mod repository;
#[cfg(test)]
pub mod testing;
pub mod validation;

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CreateRequest {
    pub service_name: String,
    pub price: i64,
    pub user_id: String,
    pub start_date: YearMonth,
    pub end_date: YearMonth,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct UpdateRequest {
    pub id: String,
    pub service_name: String,
    pub price: i64,
    pub user_id: String,
    pub start_date: YearMonth,
    pub end_date: YearMonth,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TotalCostQuery {
    pub user_id: String,
    pub service_name: String,
    pub from: String,
    pub to: String,
}

/// Read view of a subscription. The identifier is not part of it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionDto {
    pub service_name: String,
    pub price: i64,
    pub user_id: String,
    pub start_date: YearMonth,
    pub end_date: YearMonth,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    #[serde(rename = "subscription created")]
    Created,
    #[serde(rename = "subscription updated")]
    Updated,
    #[serde(rename = "subscription deleted")]
    Deleted,
}

/// Body returned by create, update and delete.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MutationResponse {
    pub subscription_id: String,
    pub status: MutationStatus,
}

impl MutationResponse {
    pub fn new(id: &Uuid, status: MutationStatus) -> Self {
        Self {
            subscription_id: id.to_string(),
            status,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ListResponse {
    pub subscriptions: Vec<SubscriptionDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TotalCostResponse {
    pub user_id: String,
    pub service_name: String,
    pub from: YearMonth,
    pub to: YearMonth,
    pub total_cost: i64,
}

impl From<CreateRequest> for NewSubscription {
    fn from(req: CreateRequest) -> Self {
        let CreateRequest {
            service_name,
            price,
            user_id,
            start_date,
            end_date,
        } = req;
        NewSubscription {
            service_name,
            price,
            user_id,
            start_date,
            end_date,
        }
    }
}

impl UpdateRequest {
    /// `id` is the already validated form of `self.id`.
    pub fn into_subscription(self, id: Uuid) -> Subscription {
        let UpdateRequest {
            service_name,
            price,
            user_id,
            start_date,
            end_date,
            ..
        } = self;
        Subscription {
            id,
            service_name,
            price,
            user_id,
            start_date,
            end_date,
        }
    }
}

impl From<Subscription> for SubscriptionDto {
    fn from(sub: Subscription) -> Self {
        let Subscription {
            service_name,
            price,
            user_id,
            start_date,
            end_date,
            ..
        } = sub;
        SubscriptionDto {
            service_name,
            price,
            user_id,
            start_date,
            end_date,
        }
    }
}

impl From<Vec<Subscription>> for ListResponse {
    fn from(subs: Vec<Subscription>) -> Self {
        ListResponse {
            subscriptions: subs.into_iter().map(SubscriptionDto::from).collect(),
        }
    }
}
