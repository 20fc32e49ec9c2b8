#![deny(clippy::unwrap_used)]

use actix_web::web;
use refinery::embed_migrations;
use std::time::Duration;

pub mod config;
pub mod control;
pub mod health;
pub mod subscription;

embed_migrations!("./migrations");

/// Upper bound on every repository call made while serving a request.
pub const REPOSITORY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct SqlWrapper<T>(pub T);

impl<T> SqlWrapper<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> SqlWrapper<T> {
    pub fn from_sql<R>(r: R) -> Result<T, <Self as TryFrom<R>>::Error>
    where
        Self: TryFrom<R>,
    {
        r.try_into().map(|w: Self| w.0)
    }
}

/// Registers every route together with the extractor settings they rely on.
pub fn configure(cfg: &mut web::ServiceConfig) {
    use subscription::controllers;

    cfg.app_data(control::json_config())
        .app_data(control::query_config())
        .app_data(control::path_config())
        .service(controllers::create_subscription)
        .service(controllers::list_subscriptions)
        // Must precede the `{id}` routes.
        .service(controllers::total_cost)
        .service(controllers::get_subscription)
        .service(controllers::update_subscription)
        .service(controllers::delete_subscription)
        .service(health::liveness)
        .service(health::readiness)
        .default_service(web::route().to(control::not_found));
}
