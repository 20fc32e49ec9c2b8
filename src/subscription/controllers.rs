use crate::control::{ControllerError, RepositoryBudget, RequestId, Response};
use crate::subscription::validation::{
    validate_create_request, validate_guid, validate_total_cost_query, validate_update_request,
    ValidationError,
};
use crate::subscription::{
    CreateRequest, ListResponse, MutationResponse, MutationStatus, SubscriptionDto,
    TotalCostQuery, TotalCostResponse, UpdateRequest,
};
use actix_web::{
    delete, get, post, put,
    web::{Data, Json, Path, Query},
    HttpResponse,
};
use std::sync::Arc;
use subs_types::subscription::repository::{RepositoryError, SubscriptionRepository};
use subs_types::subscription::TotalCostFilter;
use subs_types::YearMonth;
use uuid::Uuid;

pub type Repository = Data<Arc<dyn SubscriptionRepository>>;

fn invalid(rid: &RequestId, op: &str, err: ValidationError) -> ControllerError {
    log::warn!("req_id={rid} op={op} validation error: {err}");
    ControllerError::InvalidInput(err)
}

fn failed(rid: &RequestId, op: &str, err: RepositoryError) -> ControllerError {
    match &err {
        RepositoryError::NotFound => log::warn!("req_id={rid} op={op} subscription not found"),
        RepositoryError::Timeout => log::error!("req_id={rid} op={op} request timed out"),
        _ => log::error!("req_id={rid} op={op} repository error: {err}"),
    }
    err.into()
}

fn path_id(rid: &RequestId, op: &str, raw: &str) -> Result<Uuid, ControllerError> {
    validate_guid(raw).map_err(|err| {
        log::warn!("req_id={rid} op={op} bad path id: {err}");
        ControllerError::InvalidEncoding(format!("id: {err}"))
    })
}

fn month(rid: &RequestId, field: &str, raw: &str) -> Result<YearMonth, ControllerError> {
    raw.parse().map_err(|err| {
        log::warn!("req_id={rid} op=total_cost bad {field}: {err}");
        ControllerError::InvalidEncoding(format!("{field}: {err}"))
    })
}

#[post("/v1/subscriptions")]
async fn create_subscription(
    rid: RequestId,
    repo: Repository,
    budget: Data<RepositoryBudget>,
    req: Json<CreateRequest>,
) -> Response {
    let req = req.into_inner();
    validate_create_request(&req).map_err(|err| invalid(&rid, "create", err))?;
    let deadline = budget.deadline();
    let sub = deadline
        .run(repo.add(&deadline, req.into()))
        .await
        .map_err(|err| failed(&rid, "create", err))?;
    log::info!("req_id={rid} op=create subscription created id={}", sub.id);
    Ok(HttpResponse::Ok().json(MutationResponse::new(&sub.id, MutationStatus::Created)))
}

// Registered ahead of `get_subscription`, which would otherwise capture
// `totalcost` as an id.
#[get("/v1/subscriptions/totalcost")]
async fn total_cost(
    rid: RequestId,
    repo: Repository,
    budget: Data<RepositoryBudget>,
    query: Query<TotalCostQuery>,
) -> Response {
    let query = query.into_inner();
    let from = month(&rid, "from", &query.from)?;
    let to = month(&rid, "to", &query.to)?;
    validate_total_cost_query(&query, from, to).map_err(|err| invalid(&rid, "total_cost", err))?;
    let TotalCostQuery {
        user_id,
        service_name,
        ..
    } = query;
    let filter = TotalCostFilter {
        service_name,
        user_id,
        from,
        to,
    };
    let deadline = budget.deadline();
    let total_cost = deadline
        .run(repo.total_cost(&deadline, &filter))
        .await
        .map_err(|err| failed(&rid, "total_cost", err))?;
    log::info!(
        "req_id={rid} op=total_cost user_id={} service_name={} period={from}..{to} total_cost={total_cost}",
        filter.user_id,
        filter.service_name,
    );
    let TotalCostFilter {
        service_name,
        user_id,
        ..
    } = filter;
    Ok(HttpResponse::Ok().json(TotalCostResponse {
        user_id,
        service_name,
        from,
        to,
        total_cost,
    }))
}

#[get("/v1/subscriptions/{id}")]
async fn get_subscription(
    rid: RequestId,
    repo: Repository,
    budget: Data<RepositoryBudget>,
    path: Path<String>,
) -> Response {
    let id = path_id(&rid, "get", &path)?;
    let deadline = budget.deadline();
    let sub = deadline
        .run(repo.get(&deadline, &id))
        .await
        .map_err(|err| failed(&rid, "get", err))?;
    log::info!("req_id={rid} op=get subscription returned id={id}");
    Ok(HttpResponse::Ok().json(SubscriptionDto::from(sub)))
}

#[put("/v1/subscriptions/{id}")]
async fn update_subscription(
    rid: RequestId,
    repo: Repository,
    budget: Data<RepositoryBudget>,
    path: Path<String>,
    req: Json<UpdateRequest>,
) -> Response {
    let id = path_id(&rid, "update", &path)?;
    let req = req.into_inner();
    let mut errs = validate_update_request(&req).err().unwrap_or_default();
    if validate_guid(&req.id).is_ok_and(|body_id| body_id != id) {
        errs.push("id", "does not match the id in the path");
    }
    if !errs.is_empty() {
        return Err(invalid(&rid, "update", errs));
    }
    let deadline = budget.deadline();
    deadline
        .run(repo.update(&deadline, req.into_subscription(id)))
        .await
        .map_err(|err| failed(&rid, "update", err))?;
    log::info!("req_id={rid} op=update subscription updated id={id}");
    Ok(HttpResponse::Ok().json(MutationResponse::new(&id, MutationStatus::Updated)))
}

#[delete("/v1/subscriptions/{id}")]
async fn delete_subscription(
    rid: RequestId,
    repo: Repository,
    budget: Data<RepositoryBudget>,
    path: Path<String>,
) -> Response {
    let id = path_id(&rid, "delete", &path)?;
    let deadline = budget.deadline();
    deadline
        .run(repo.remove(&deadline, &id))
        .await
        .map_err(|err| failed(&rid, "delete", err))?;
    log::info!("req_id={rid} op=delete subscription deleted id={id}");
    Ok(HttpResponse::Ok().json(MutationResponse::new(&id, MutationStatus::Deleted)))
}

#[get("/v1/subscriptions")]
async fn list_subscriptions(
    rid: RequestId,
    repo: Repository,
    budget: Data<RepositoryBudget>,
) -> Response {
    let deadline = budget.deadline();
    let subs = deadline
        .run(repo.list(&deadline))
        .await
        .map_err(|err| failed(&rid, "list", err))?;
    log::info!("req_id={rid} op=list returned {} subscriptions", subs.len());
    Ok(HttpResponse::Ok().json(ListResponse::from(subs)))
}
