//! HTTP front end for the todo store.
//!
//! # Design
//! - Browser routes mirror a plain HTML form flow: `/add`, `/done/{id}` and
//!   `/clear/{id}` mutate and redirect back to `/`.
//! - `/todos` serves the same listing as JSON.
//! - `/debug/metrics` and `/debug/stats` expose per-handler counters and
//!   request statistics.
//! - Store calls block on disk I/O, so handlers hop onto tokio's blocking
//!   pool for each one.

pub mod config;
pub mod error;
pub mod handlers;
pub mod pages;
pub mod stats;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use todo_core::TodoStore;
use todo_kv::KvEngine;
use tokio::net::TcpListener;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

pub use config::Config;
pub use error::AppError;
pub use stats::{Counters, Stats};

/// Shared state handed to every handler.
pub struct AppState<E> {
    pub store: TodoStore<E>,
    pub counters: Counters,
    pub stats: Arc<Stats>,
}

pub fn app<E: KvEngine + 'static>(store: TodoStore<E>) -> Router {
    let request_stats = Arc::new(Stats::new());
    let state = Arc::new(AppState {
        store,
        counters: Counters::new(),
        stats: Arc::clone(&request_stats),
    });

    Router::new()
        .route("/", get(handlers::index::<E>))
        .route("/add", post(handlers::add::<E>))
        .route("/done/{id}", get(handlers::done::<E>).post(handlers::done::<E>))
        .route("/clear/{id}", get(handlers::clear::<E>).post(handlers::clear::<E>))
        .route("/todos", get(handlers::list_todos::<E>))
        .route("/debug/metrics", get(handlers::metrics::<E>))
        .route("/debug/stats", get(handlers::stats::<E>))
        .layer(middleware::from_fn_with_state(request_stats, stats::track))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run<E: KvEngine + 'static>(
    listener: TcpListener,
    store: TodoStore<E>,
) -> Result<(), std::io::Error> {
    axum::serve(listener, app(store)).await
}
