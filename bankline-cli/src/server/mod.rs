//! HTTP API served by `bankline serve`

mod error;
mod handlers;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use bankline_core::{BanklineContext, LogEvent, LoggingService};

pub use error::{ApiError, ErrorCode};

/// Header carrying the admin key on `/api/admin/*` routes
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<BanklineContext>,
    pub logger: Option<Arc<LoggingService>>,
}

pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/fund-account", post(handlers::fund_account))
        .route("/debit-account", post(handlers::debit_account))
        .route("/transaction", post(handlers::admin_transaction))
        .route("/accounts-summary", get(handlers::accounts_summary))
        .route("/accounts", get(handlers::list_accounts))
        .route("/users", get(handlers::list_users))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_key,
        ));

    let api_routes = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/user/:user_id", get(handlers::get_user))
        .route("/accounts/:user_id", get(handlers::get_accounts))
        .route("/verify-account/:account_number", get(handlers::verify_account))
        .route("/transactions", post(handlers::create_transaction))
        .route("/transactions/:user_id", get(handlers::get_transactions))
        .route("/notifications/:id", get(handlers::get_notifications))
        .route(
            "/notifications/:id/unread-count",
            get(handlers::unread_count),
        )
        .route("/notifications/:id/read", put(handlers::mark_read))
        .nest("/admin", admin_routes);

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(state.clone(), record_request))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Reject admin requests without the configured key; open when none is set
async fn require_admin_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.ctx.config.admin_key.as_deref() {
        let provided = req
            .headers()
            .get(ADMIN_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if provided != Some(expected) {
            return Err(ApiError::Unauthorized);
        }
    }
    Ok(next.run(req).await)
}

/// Write one privacy-safe event per request: route template and error code only
async fn record_request(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string());
    let response = next.run(req).await;

    if let (Some(logger), Some(route)) = (state.logger.clone(), route) {
        let event = match response.extensions().get::<ErrorCode>() {
            Some(code) => {
                let mut event = LogEvent::new("request_failed").with_route(route);
                event.error_code = Some(code.0.to_string());
                event
            }
            None => LogEvent::new("request_handled").with_route(route),
        };
        tokio::task::spawn_blocking(move || {
            let _ = logger.log(event);
        });
    }
    response
}

/// Install the global subscriber; `RUST_LOG` overrides the default filter
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bankline_core=info,bankline_cli=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let app = router(state);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("bankline API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutting down");
    }
}
