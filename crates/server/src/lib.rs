pub mod error;

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, FromRequestParts, Path, Query, State, rejection::PathRejection,
    },
    http::{StatusCode, request::Parts},
    routing::{MethodFilter, on},
};
use axum_idempotent::{IdempotentLayer, IdempotentOptions};
use opbind_sdk::prelude::*;
use ruts::{
    CookieOptions, SessionLayer, store::memory::MemoryStore, tower_cookies::CookieManagerLayer,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tokio::{io, net::ToSocketAddrs};
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, warn};

use crate::error::{Error, ErrorStatus};

const DEFAULT_BODY_LIMIT: usize = 256 * 1024;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_IDEMPOTENCY_TTL_SECS: i64 = 60 * 5;

/// HTTP methods an operation can be exposed through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl ApiMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiMethod::Get => "GET",
            ApiMethod::Post => "POST",
            ApiMethod::Put => "PUT",
            ApiMethod::Patch => "PATCH",
            ApiMethod::Delete => "DELETE",
        }
    }

    fn filter(&self) -> MethodFilter {
        match self {
            ApiMethod::Get => MethodFilter::GET,
            ApiMethod::Post => MethodFilter::POST,
            ApiMethod::Put => MethodFilter::PUT,
            ApiMethod::Patch => MethodFilter::PATCH,
            ApiMethod::Delete => MethodFilter::DELETE,
        }
    }

    /// Methods with side effects get idempotency key handling.
    fn is_mutating(&self) -> bool {
        !matches!(self, ApiMethod::Get)
    }
}

/// Maps API routes to operations.
///
/// Each route binds its operation from the path variables merged with the
/// query string and, for requests with a JSON object body, the body fields.
/// Later sources win on duplicate keys.
pub struct ApiRouter {
    reads: Router<ApiState>,
    writes: Router<ApiState>,
    provider: OperationProvider,
    catalog: Catalog,
    body_limit: usize,
    timeout: Duration,
    idempotency_ttl: i64,
    extra: Router,
}

impl ApiRouter {
    pub fn new(provider: OperationProvider) -> Self {
        ApiRouter {
            reads: Router::new(),
            writes: Router::new(),
            provider,
            catalog: Catalog::new(),
            body_limit: DEFAULT_BODY_LIMIT,
            timeout: DEFAULT_TIMEOUT,
            idempotency_ttl: DEFAULT_IDEMPOTENCY_TTL_SECS,
            extra: Router::new(),
        }
    }

    /// Maximum request body size in bytes.
    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Request timeout, answered with `408 Request Timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// How long idempotent responses are replayed, in seconds.
    pub fn with_idempotency_ttl(mut self, secs: i64) -> Self {
        self.idempotency_ttl = secs;
        self
    }

    /// Serves `router` next to the operation routes, without the API layers.
    pub fn merge(mut self, router: Router) -> Self {
        self.extra = self.extra.merge(router);
        self
    }

    /// Operations and routes registered so far.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Exposes query `O` through `GET path`, responding with `R`.
    pub fn query<O, R>(self, path: &str) -> Self
    where
        O: Operation,
        R: Serialize + DeserializeOwned + Send + 'static,
    {
        self.route_for::<O, R>(ApiMethod::Get, path)
    }

    /// Exposes command `O` through `POST path`, responding with `R`.
    pub fn command<O, R>(self, path: &str) -> Self
    where
        O: Operation,
        R: Serialize + DeserializeOwned + Send + 'static,
    {
        self.route_for::<O, R>(ApiMethod::Post, path)
    }

    pub fn route_for<O, R>(mut self, method: ApiMethod, path: &str) -> Self
    where
        O: Operation,
        R: Serialize + DeserializeOwned + Send + 'static,
    {
        debug!(operation = O::NAME, method = method.as_str(), path, "registering route");

        self.catalog.add_operation::<O>();
        self.catalog
            .add_route(ApiRoute::new(method.as_str(), path, O::NAME));

        let route = on(method.filter(), provide::<O, R>);
        if method.is_mutating() {
            self.writes = self.writes.route(path, route);
        } else {
            self.reads = self.reads.route(path, route);
        }
        self
    }

    pub fn build(self) -> Router {
        let store = Arc::new(MemoryStore::new());
        let idempotent_options = IdempotentOptions::default()
            .use_idempotency_key_header(Some("X-Idempotency-Key"))
            .ignore_response_status_code(StatusCode::CONFLICT)
            .expire_after(self.idempotency_ttl);

        let writes = self
            .writes
            .layer(IdempotentLayer::<MemoryStore>::new(idempotent_options))
            .layer(
                SessionLayer::new(store)
                    .with_cookie_options(CookieOptions::build().name("session")),
            )
            .layer(CookieManagerLayer::new());

        let router = self
            .reads
            .merge(writes)
            .layer(DefaultBodyLimit::max(self.body_limit))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                self.timeout,
            ));

        router
            .with_state(ApiState {
                provider: self.provider,
            })
            .merge(self.extra)
    }

    pub async fn serve<A: ToSocketAddrs>(self, addr: A) -> io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.build()).await
    }
}

#[derive(Clone)]
struct ApiState {
    provider: OperationProvider,
}

async fn provide<O, R>(
    State(state): State<ApiState>,
    PathVars(path_vars): PathVars,
    Query(query): Query<HashMap<String, String>>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, Error>
where
    O: Operation,
    R: Serialize + DeserializeOwned + Send + 'static,
{
    let mut filters: Vec<(String, Value)> = query
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    match body {
        Some(Json(Value::Object(fields))) => filters.extend(fields),
        Some(Json(Value::Null)) | None => {}
        Some(Json(_)) => {
            return Err(Error::new(ErrorStatus::InvalidInput, "invalid_body")
                .with_message("request body must be a JSON object"));
        }
    }

    let path_vars = path_vars
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)));

    let resource: R = state
        .provider
        .provide::<O, R, _, _, _, _>(path_vars, filters)
        .await
        .inspect_err(|err| match err {
            ProvideError::Bind(err) => debug!(operation = O::NAME, %err, "invalid operation input"),
            err => warn!(operation = O::NAME, %err, "operation failed"),
        })?;

    Ok(Json(json!({
        "status": "ok",
        "data": resource,
    })))
}

/// Path variables of the matched route, empty when the route has none.
struct PathVars(HashMap<String, String>);

impl<S: Send + Sync> FromRequestParts<S> for PathVars {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<HashMap<String, String>>::from_request_parts(parts, state).await {
            Ok(Path(vars)) => Ok(PathVars(vars)),
            Err(PathRejection::MissingPathParams(_)) => Ok(PathVars(HashMap::new())),
            Err(err) => Err(Error::new(ErrorStatus::InvalidInput, "invalid_path")
                .with_message(err.body_text())),
        }
    }
}
