mod router;
mod state;
mod worker;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use formpilot_recipes::SiteRecipe;
use tracing::info;

use crate::config::AppConfig;

pub(crate) use router::build_router;
pub(crate) use state::ServeState;
pub(crate) use worker::{decision_provider, visual_locator};

/// Bind the HTTP API and serve until the process is stopped.
pub async fn serve(recipe: Arc<SiteRecipe>, config: AppConfig, port: u16) -> anyhow::Result<()> {
    let state = ServeState::new(recipe, config);
    let reaper_handle = state.registry.spawn_reaper();

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "agent API listening");

    let result = axum::serve(listener, build_router(state))
        .await
        .context("serving agent API");
    reaper_handle.abort();
    result
}
