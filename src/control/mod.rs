use crate::subscription::validation::ValidationError;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{JsonPayloadError, PathError, QueryPayloadError},
    http::{
        header::{HeaderName, HeaderValue},
        StatusCode,
    },
    web::{JsonConfig, PathConfig, QueryConfig},
    FromRequest, HttpMessage, HttpRequest, HttpResponse,
};
use derive_more::{Display, Error};
use futures::future::{ready, LocalBoxFuture, Ready};
use log_error::LogError;
use serde::Serialize;
use std::rc::Rc;
use std::time::Duration;
use subs_types::subscription::repository::RepositoryError;
use subs_types::Deadline;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type Response = Result<HttpResponse, ControllerError>;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Display, Error)]
pub enum ControllerError {
    #[error(ignore)]
    #[display("{_0}")]
    InvalidEncoding(String),
    #[error(ignore)]
    #[display("{_0}")]
    InvalidInput(ValidationError),
    #[display("not found")]
    NotFound,
    #[display("request timed out")]
    TimedOut,
    #[error(ignore)]
    #[display("internal server error: {_0}")]
    InternalServerError(anyhow::Error),
    #[display("service unavailable")]
    ServiceUnavailable,
}

impl ControllerError {
    /// Text placed in the `error` field of the response body. Backend
    /// failures never leak their details.
    pub fn public_message(&self) -> String {
        use ControllerError::*;
        match self {
            InvalidEncoding(msg) => msg.clone(),
            InvalidInput(err) => err.to_string(),
            NotFound | TimedOut => self.to_string(),
            InternalServerError(_) | ServiceUnavailable => String::new(),
        }
    }
}

impl From<RepositoryError> for ControllerError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Timeout => Self::TimedOut,
            RepositoryError::InvalidPeriod => {
                Self::InvalidInput(ValidationError::single("date range", "from must be <= to"))
            }
            RepositoryError::Backend(err) => Self::InternalServerError(err),
        }
    }
}

impl From<ValidationError> for ControllerError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidInput(err)
    }
}

impl From<anyhow::Error> for ControllerError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalServerError(err)
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl actix_web::error::ResponseError for ControllerError {
    fn status_code(&self) -> StatusCode {
        use ControllerError::*;
        match self {
            InvalidEncoding(_) | InvalidInput(_) => StatusCode::BAD_REQUEST,
            NotFound => StatusCode::NOT_FOUND,
            TimedOut => StatusCode::GATEWAY_TIMEOUT,
            InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.public_message(),
        })
    }
}

pub async fn not_found() -> Response {
    Err(ControllerError::NotFound)
}

/// Extractor settings that report malformed input with the same
/// `{"error": ...}` body as every other failure.
pub fn json_config() -> JsonConfig {
    JsonConfig::default().error_handler(|err: JsonPayloadError, _| {
        log::warn!("Unable to decode JSON body: {err}");
        ControllerError::InvalidEncoding("invalid JSON".to_string()).into()
    })
}

pub fn query_config() -> QueryConfig {
    QueryConfig::default().error_handler(|err: QueryPayloadError, _| {
        log::warn!("Unable to decode query string: {err}");
        ControllerError::InvalidEncoding("invalid query string".to_string()).into()
    })
}

pub fn path_config() -> PathConfig {
    PathConfig::default().error_handler(|err: PathError, _| {
        log::warn!("Unable to decode path: {err}");
        ControllerError::InvalidEncoding("invalid path".to_string()).into()
    })
}

/// Time budget handed to every repository call made by a handler.
#[derive(Clone)]
pub struct RepositoryBudget {
    timeout: Duration,
    shutdown: CancellationToken,
}

impl RepositoryBudget {
    pub fn new(timeout: Duration, shutdown: CancellationToken) -> Self {
        Self { timeout, shutdown }
    }

    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.timeout, &self.shutdown)
    }
}

/// Correlation id of the current request, see [`RequestIdMiddlewareFactory`].
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub struct RequestId(pub String);

impl FromRequest for RequestId {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let id = req
            .extensions()
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(|| RequestId(Uuid::new_v4().to_string()));
        ready(Ok(id))
    }
}

/// Tags each request with `X-Request-ID`, reusing the inbound header when
/// the client supplies one.
pub struct RequestIdMiddlewareFactory;

impl<S, B: 'static> Transform<S, ServiceRequest> for RequestIdMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Transform = RequestIdMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestIdMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestIdMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestIdMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        req.extensions_mut().insert(RequestId(id.clone()));
        let service = self.service.clone();
        Box::pin(async move {
            let mut res = service.call(req).await?;
            if let Some(value) = HeaderValue::from_str(&id)
                .log_error("Unable to encode request id header")
            {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::{call_service, init_service, read_body, TestRequest};
    use actix_web::{get, App, ResponseError};

    #[get("/echo")]
    async fn echo(id: RequestId) -> HttpResponse {
        HttpResponse::Ok().body(id.0)
    }

    #[actix_web::test]
    async fn generates_request_id() {
        let app = init_service(App::new().wrap(RequestIdMiddlewareFactory).service(echo)).await;
        let res = call_service(&app, TestRequest::get().uri("/echo").to_request()).await;
        let header = res
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(Uuid::parse_str(&header).is_ok());
        let body = read_body(res).await;
        assert_eq!(body, header.as_bytes());
    }

    #[actix_web::test]
    async fn reuses_inbound_request_id() {
        let app = init_service(App::new().wrap(RequestIdMiddlewareFactory).service(echo)).await;
        let req = TestRequest::get()
            .uri("/echo")
            .insert_header(("X-Request-ID", "abc-123"))
            .to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.headers().get(REQUEST_ID_HEADER).unwrap(), "abc-123");
        assert_eq!(read_body(res).await, "abc-123".as_bytes());
    }

    #[test]
    fn classifies_repository_errors() {
        let cases = [
            (RepositoryError::NotFound, StatusCode::NOT_FOUND, "not found"),
            (RepositoryError::Timeout, StatusCode::GATEWAY_TIMEOUT, "request timed out"),
            (
                RepositoryError::Backend(anyhow::anyhow!("password authentication failed")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "",
            ),
            (
                RepositoryError::InvalidPeriod,
                StatusCode::BAD_REQUEST,
                "date range: from must be <= to",
            ),
        ];
        for (err, status, message) in cases {
            let err = ControllerError::from(err);
            assert_eq!(err.status_code(), status);
            assert_eq!(err.public_message(), message);
        }
    }
}
