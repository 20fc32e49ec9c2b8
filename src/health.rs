use crate::control::{ControllerError, RepositoryBudget, Response};
use crate::subscription::controllers::Repository;
use actix_web::{get, web::Data, HttpResponse};

#[get("/healthz")]
async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json("ok")
}

/// Ready once the repository answers a ping within the request budget.
#[get("/readyz")]
async fn readiness(repo: Repository, budget: Data<RepositoryBudget>) -> Response {
    let deadline = budget.deadline();
    match deadline.run(repo.ping(&deadline)).await {
        Ok(()) => Ok(HttpResponse::Ok().json("ready")),
        Err(err) => {
            log::error!("Readiness check failed: {err}");
            Err(ControllerError::ServiceUnavailable)
        }
    }
}
