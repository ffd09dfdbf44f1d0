use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, Method, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use markr_core::{aggregate_test, import_document, AggregateResult, MarkrError, MarkrResult};
use markr_store::SqliteStore;

use crate::protocol::{ApiError, SuccessBody};

pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub listen: String,
    pub max_body_bytes: usize,
}

/// Shared handle to the store. Every request takes the lock for its whole
/// read-merge-write cycle, so imports for the same test never interleave.
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<SqliteStore>>,
}

impl AppState {
    pub fn new(store: SqliteStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    async fn with_store<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteStore) -> MarkrResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let guard = store
                .lock()
                .map_err(|_| MarkrError::Database("store lock poisoned".into()))?;
            f(&*guard)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?
        .map_err(ApiError::from)
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::ORIGIN,
            header::CONTENT_TYPE,
        ]);

    Router::new()
        .route("/import", post(handle_import).fallback(not_found))
        .route(
            "/results/{test_id}/aggregate",
            get(handle_aggregate).fallback(not_found),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve HTTP until Ctrl-C.
pub async fn run_server(store: SqliteStore, options: ServeOptions) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&options.listen)
        .await
        .with_context(|| format!("cannot bind {}", options.listen))?;
    info!("markr listening on {}", listener.local_addr()?);

    let app = router(AppState::new(store), options.max_body_bytes);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("markr stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn handle_import(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SuccessBody>, ApiError> {
    let body = body.map_err(|e| MarkrError::Validation(e.body_text()))?;
    let xml = String::from_utf8(body.to_vec())
        .map_err(|e| MarkrError::Validation(format!("Incorrect file detected. {e}")))?;
    debug!("import: {} byte(s) received", xml.len());

    state
        .with_store(move |store| import_document(store, &xml))
        .await?;

    Ok(Json(SuccessBody::submitted()))
}

async fn handle_aggregate(
    State(state): State<AppState>,
    test_id: Result<Path<String>, PathRejection>,
) -> Result<Json<AggregateResult>, ApiError> {
    let Path(test_id) = test_id.map_err(|e| MarkrError::Validation(e.body_text()))?;
    let result = state
        .with_store(move |store| aggregate_test(store, &test_id))
        .await?;
    Ok(Json(result))
}

/// Unknown paths and unsupported methods on known paths.
async fn not_found(method: Method, uri: Uri) -> ApiError {
    MarkrError::NotFound(format!("{method} {}", uri.path())).into()
}
