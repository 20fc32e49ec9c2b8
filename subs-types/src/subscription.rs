use crate::year_month::YearMonth;
use typesafe_repository::macros::Id;
use typesafe_repository::prelude::*;
use uuid::Uuid;

pub mod repository;

/// Stored subscription record. `id` is assigned by the repository on creation.
#[derive(Id, Debug, Clone, PartialEq, Eq)]
#[Id(get_id, ref_id)]
pub struct Subscription {
    #[id]
    pub id: Uuid,
    pub service_name: String,
    pub price: i64,
    pub user_id: String,
    pub start_date: YearMonth,
    pub end_date: YearMonth,
}

/// Subscription that has not been persisted yet and has no identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub service_name: String,
    pub price: i64,
    pub user_id: String,
    pub start_date: YearMonth,
    pub end_date: YearMonth,
}

impl NewSubscription {
    pub fn with_id(self, id: Uuid) -> Subscription {
        let Self {
            service_name,
            price,
            user_id,
            start_date,
            end_date,
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

impl Subscription {
    /// Inclusive overlap of `[start_date, end_date]` with `[from, to]`.
    pub fn overlaps(&self, from: YearMonth, to: YearMonth) -> bool {
        self.start_date <= to && self.end_date >= from
    }
}

/// Parameters of the total cost aggregation.
///
/// Empty `service_name` or `user_id` means the filter is not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalCostFilter {
    pub service_name: String,
    pub user_id: String,
    pub from: YearMonth,
    pub to: YearMonth,
}

impl TotalCostFilter {
    pub fn has_valid_period(&self) -> bool {
        self.from <= self.to
    }

    pub fn matches(&self, sub: &Subscription) -> bool {
        (self.service_name.is_empty() || sub.service_name == self.service_name)
            && (self.user_id.is_empty() || sub.user_id == self.user_id)
            && sub.overlaps(self.from, self.to)
    }
}
