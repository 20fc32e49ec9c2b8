use actix_web::middleware::Logger;
use actix_web::{web::Data, App, HttpServer};
use anyhow::Context;
use std::env;
use std::sync::Arc;
use subs_tracker::config::{Config, Storage};
use subs_tracker::control::{RepositoryBudget, RequestIdMiddlewareFactory};
use subs_tracker::subscription::memory::InMemorySubscriptionRepository;
use subs_tracker::subscription::repository::PostgresSubscriptionRepository;
use subs_tracker::{configure, REPOSITORY_TIMEOUT};
use subs_types::subscription::repository::SubscriptionRepository;
use tokio::signal;
use tokio_util::sync::CancellationToken;

async fn connect(config: &Config) -> Result<Arc<dyn SubscriptionRepository>, anyhow::Error> {
    let (mut client, connection) = config
        .pg_config()
        .connect(tokio_postgres::NoTls)
        .await
        .context("Unable to connect to postgres db")?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            log::error!("connection error: {}", e);
        }
    });
    let report = subs_tracker::migrations::runner()
        .run_async(&mut client)
        .await?;
    log::info!(
        "Applied {} migration(s)",
        report.applied_migrations().len()
    );
    Ok(Arc::new(PostgresSubscriptionRepository::new(Arc::new(
        client,
    ))))
}

#[actix_web::main]
async fn main() -> Result<(), anyhow::Error> {
    if let Err(env::VarError::NotPresent) = env::var("RUST_LOG") {
        env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::formatted_timed_builder()
        .parse_default_env()
        .init();

    Config::load_dotenv()?;
    let config = Config::from_env()?;
    log::info!("Starting with {config}");

    let repo: Arc<dyn SubscriptionRepository> = match config.storage {
        Storage::Postgres => connect(&config).await?,
        Storage::Memory => {
            log::warn!("Using in-memory storage, data is lost on restart");
            Arc::new(InMemorySubscriptionRepository::new())
        }
    };

    let token = CancellationToken::new();
    let t = token.clone();
    tokio::spawn(async {
        let token = t;
        match signal::ctrl_c().await {
            Ok(_) => {
                log::info!("Shutting down");
                token.cancel()
            }
            Err(err) => log::error!("Unable to listen to shutdown: {err}"),
        }
    });

    let port = config.app_port;
    let budget = RepositoryBudget::new(REPOSITORY_TIMEOUT, token);
    log::info!("Listening on 0.0.0.0:{port}");
    HttpServer::new(move || {
        App::new()
            .wrap(RequestIdMiddlewareFactory)
            .wrap(Logger::new(
                "req_id=%{x-request-id}o %a \"%r\" %s %b %Dms",
            ))
            .app_data(Data::new(repo.clone()))
            .app_data(Data::new(budget.clone()))
            .configure(configure)
    })
    .bind(("0.0.0.0", port))
    .with_context(|| format!("Failed to bind server to 0.0.0.0:{port}. Is the port already in use?"))?
    .shutdown_timeout(5)
    .run()
    .await?;
    Ok(())
}
