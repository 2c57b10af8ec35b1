//! Serve command - run the HTTP API

use std::sync::Arc;

use anyhow::{Context, Result};

use bankline_core::{EntryPoint, LoggingService};

use super::{get_bankline_dir, get_context};
use crate::server::{self, AppState};

pub fn run(listen: Option<String>) -> Result<()> {
    server::init_tracing();

    let ctx = get_context()?;
    let addr = listen.unwrap_or_else(|| ctx.config.listen_addr.clone());
    if ctx.config.admin_key.is_none() {
        tracing::warn!("no admin key configured; /api/admin routes are open");
    }

    let logger = match LoggingService::new(
        &get_bankline_dir()?,
        EntryPoint::Server,
        env!("CARGO_PKG_VERSION"),
    ) {
        Ok(logger) => Some(Arc::new(logger)),
        Err(e) => {
            tracing::warn!("event log unavailable: {}", e);
            None
        }
    };

    let state = AppState {
        ctx: Arc::new(ctx),
        logger,
    };
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(server::serve(state, &addr))
}
