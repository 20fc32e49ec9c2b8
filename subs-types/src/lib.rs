#![deny(clippy::unwrap_used)]

pub mod deadline;
pub mod subscription;
pub mod year_month;

pub use deadline::Deadline;
pub use year_month::YearMonth;
