use crate::subscription::{CreateRequest, TotalCostQuery, UpdateRequest};
use derive_more::{Display, Error};
use itertools::Itertools;
use std::fmt;
use subs_types::YearMonth;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    pub message: String,
}

/// Every rule a request broke, rendered as `field: message` pairs joined
/// with `; `.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    violations: Vec<Violation>,
}

impl ValidationError {
    pub fn single<M: Into<String>>(field: &'static str, message: M) -> Self {
        let mut err = Self::default();
        err.push(field, message);
        err
    }

    pub fn push<M: Into<String>>(&mut self, field: &'static str, message: M) {
        self.violations.push(Violation {
            field,
            message: message.into(),
        });
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .join("; ");
        f.write_str(&joined)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("must be a valid GUID: \"{input}\"")]
pub struct InvalidGuid {
    #[error(ignore)]
    input: String,
}

pub fn validate_guid(id: &str) -> Result<Uuid, InvalidGuid> {
    Uuid::parse_str(id).map_err(|_| InvalidGuid {
        input: id.to_string(),
    })
}

fn check_guid(errs: &mut ValidationError, field: &'static str, id: &str) {
    if let Err(err) = validate_guid(id) {
        errs.push(field, err.to_string());
    }
}

fn check_fields(
    errs: &mut ValidationError,
    service_name: &str,
    price: i64,
    user_id: &str,
    start_date: YearMonth,
    end_date: YearMonth,
) {
    if service_name.trim().is_empty() {
        errs.push("service_name", "required");
    }
    if price < 0 {
        errs.push("price", "must be >= 0");
    }
    check_guid(errs, "user_id", user_id);
    if start_date.is_unset() {
        errs.push("start_date", "required (MM-YYYY)");
    }
    if end_date.is_unset() {
        errs.push("end_date", "required (MM-YYYY)");
    }
    if !start_date.is_unset() && !end_date.is_unset() && start_date > end_date {
        errs.push("date range", "start_date must be <= end_date");
    }
}

pub fn validate_create_request(req: &CreateRequest) -> Result<(), ValidationError> {
    let mut errs = ValidationError::default();
    check_fields(
        &mut errs,
        &req.service_name,
        req.price,
        &req.user_id,
        req.start_date,
        req.end_date,
    );
    errs.into_result()
}

pub fn validate_update_request(req: &UpdateRequest) -> Result<(), ValidationError> {
    let mut errs = ValidationError::default();
    check_guid(&mut errs, "id", &req.id);
    check_fields(
        &mut errs,
        &req.service_name,
        req.price,
        &req.user_id,
        req.start_date,
        req.end_date,
    );
    errs.into_result()
}

pub fn validate_total_cost_query(
    query: &TotalCostQuery,
    from: YearMonth,
    to: YearMonth,
) -> Result<(), ValidationError> {
    let mut errs = ValidationError::default();
    if query.user_id.is_empty() {
        errs.push("user_id", "required");
    } else {
        check_guid(&mut errs, "user_id", &query.user_id);
    }
    if query.service_name.trim().is_empty() {
        errs.push("service_name", "required");
    }
    if from.is_unset() {
        errs.push("from", "required (MM-YYYY)");
    }
    if to.is_unset() {
        errs.push("to", "required (MM-YYYY)");
    }
    if !from.is_unset() && !to.is_unset() && from > to {
        errs.push("date range", "from must be <= to");
    }
    errs.into_result()
}
