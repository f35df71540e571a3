//! HTTP routes: health, catalog listing, and single-file fetch.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::PathRejection, Path, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Json, Router,
};
use quire_content::{classify, ContentRoot, ResolvedFile};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::{ResponseBodyTimeoutLayer, TimeoutLayer},
    trace::TraceLayer,
};

use crate::config::{CorsOrigins, ServerConfig};
use crate::error::ApiError;

/// Header naming the served file's extension, e.g. `.mdx`.
pub const FILE_EXTENSION_HEADER: HeaderName = HeaderName::from_static("x-file-extension");

#[derive(Clone)]
struct AppState {
    root: Arc<ContentRoot>,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct FilesBody {
    files: Vec<String>,
}

/// Build the application router for `config`.
///
/// CORS, tracing and the request timeout wrap every route and the fallback,
/// so error responses carry the same headers as successful ones.
pub fn router(config: &ServerConfig) -> Router {
    let state = AppState {
        root: Arc::new(config.root().clone()),
    };
    let prefix = config.api_prefix();

    let routes = Router::new()
        .route("/health", get_only(get(health)))
        .route(&format!("{prefix}/health"), get_only(get(health)))
        .route(&format!("{prefix}/files"), get_only(get(list_files)))
        .route(&format!("{prefix}/"), get_only(get(fetch_empty)))
        .route(&format!("{prefix}/{{*path}}"), get_only(get(fetch_file)))
        .fallback(unrouted);

    with_layers(routes, config).with_state(state)
}

/// Wrap `routes` in the shared middleware stack.
///
/// A handler that outlives the timeout gets a 408. A response body that
/// stalls between frames for as long is cut off.
fn with_layers<S>(routes: Router<S>, config: &ServerConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes.layer(
        ServiceBuilder::new()
            .layer(ResponseBodyTimeoutLayer::new(config.request_timeout()))
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(config.cors_origins()))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                config.request_timeout(),
            )),
    )
}

fn get_only(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(method_not_allowed)
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::any(),
        CorsOrigins::List(list) => AllowOrigin::list(list.iter().cloned()),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([FILE_EXTENSION_HEADER])
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn list_files(State(state): State<AppState>) -> Result<Json<FilesBody>, ApiError> {
    let root = Arc::clone(&state.root);

    let entries = tokio::task::spawn_blocking(move || root.list_files())
        .await
        .map_err(|e| {
            tracing::error!("Catalog scan task failed: {}", e);
            ApiError::Internal {
                path: "files".to_string(),
            }
        })?;

    tracing::debug!("Catalog lists {} files", entries.len());

    Ok(Json(FilesBody {
        files: entries.into_iter().map(|e| e.relative_path).collect(),
    }))
}

async fn fetch_empty() -> ApiError {
    ApiError::InvalidPath {
        path: String::new(),
    }
}

async fn fetch_file(
    State(state): State<AppState>,
    uri: Uri,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let requested = match path {
        Ok(Path(requested)) => requested,
        Err(e) => {
            tracing::warn!("Rejected undecodable path {}: {}", uri.path(), e);
            return Err(ApiError::InvalidPath {
                path: uri.path().to_string(),
            });
        }
    };

    let root = Arc::clone(&state.root);
    let lookup = requested.clone();
    let resolved = tokio::task::spawn_blocking(move || root.resolve(&lookup))
        .await
        .map_err(|e| {
            tracing::error!("Resolve task failed for {:?}: {}", requested, e);
            ApiError::Internal {
                path: requested.clone(),
            }
        })?;

    match resolved {
        Ok(file) => stream_file(&requested, file).await,
        Err(e) => {
            let err = ApiError::from(e.clone());
            if matches!(err, ApiError::InvalidPath { .. }) {
                tracing::warn!("{}", e);
            } else {
                tracing::debug!("{}", e);
            }
            Err(err)
        }
    }
}

async fn stream_file(requested: &str, file: ResolvedFile) -> Result<Response, ApiError> {
    let internal = |e: std::io::Error| {
        tracing::error!("Failed to read {}: {}", file.path().display(), e);
        ApiError::Internal {
            path: requested.to_string(),
        }
    };

    let handle = tokio::fs::File::open(file.path()).await.map_err(internal)?;
    let len = handle.metadata().await.map_err(internal)?.len();
    let rule = classify(file.extension());

    let extension = HeaderValue::from_str(&rule.extension).map_err(|_| ApiError::Internal {
        path: requested.to_string(),
    })?;

    // Dropping the body on client disconnect drops the reader with it.
    let body = Body::from_stream(ReaderStream::new(handle));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(rule.mime)),
            (header::CONTENT_LENGTH, HeaderValue::from(len)),
            (FILE_EXTENSION_HEADER, extension),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
        ],
        body,
    )
        .into_response())
}

async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed { method }
}

async fn unrouted(method: Method, uri: Uri) -> ApiError {
    if method == Method::GET || method == Method::HEAD {
        ApiError::NotFound {
            path: uri.path().to_string(),
        }
    } else {
        ApiError::MethodNotAllowed { method }
    }
}
