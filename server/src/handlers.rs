use std::collections::BTreeMap;
use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use todo_core::{StoreError, Todo, TodoStore};
use todo_kv::KvEngine;

use crate::error::AppError;
use crate::pages::IndexPage;
use crate::stats::StatsSnapshot;
use crate::AppState;

type SharedState<E> = State<Arc<AppState<E>>>;

#[derive(Debug, Deserialize)]
pub struct AddForm {
    #[serde(default)]
    pub title: String,
}

/// Run a store call on the blocking pool.
async fn with_store<E, T, F>(state: &Arc<AppState<E>>, call: F) -> Result<T, AppError>
where
    E: KvEngine + 'static,
    T: Send + 'static,
    F: FnOnce(&TodoStore<E>) -> Result<T, StoreError> + Send + 'static,
{
    let state = Arc::clone(state);
    let result = tokio::task::spawn_blocking(move || call(&state.store)).await?;
    Ok(result?)
}

fn back_to_index() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/")]).into_response()
}

pub async fn index<E: KvEngine + 'static>(
    State(state): SharedState<E>,
) -> Result<Html<String>, AppError> {
    state.counters.inc("n_index");
    let todos = with_store(&state, |store| store.list()).await?;
    Ok(Html(IndexPage { todos }.render()?))
}

pub async fn list_todos<E: KvEngine + 'static>(
    State(state): SharedState<E>,
) -> Result<Json<Vec<Todo>>, AppError> {
    let todos = with_store(&state, |store| store.list()).await?;
    Ok(Json(todos))
}

pub async fn add<E: KvEngine + 'static>(
    State(state): SharedState<E>,
    Form(input): Form<AddForm>,
) -> Result<Response, AppError> {
    state.counters.inc("n_add");
    with_store(&state, move |store| store.add(input.title)).await?;
    Ok(back_to_index())
}

pub async fn done<E: KvEngine + 'static>(
    State(state): SharedState<E>,
    Path(id): Path<u64>,
) -> Result<Response, AppError> {
    state.counters.inc("n_done");
    with_store(&state, move |store| store.toggle(id)).await?;
    Ok(back_to_index())
}

pub async fn clear<E: KvEngine + 'static>(
    State(state): SharedState<E>,
    Path(id): Path<u64>,
) -> Result<Response, AppError> {
    state.counters.inc("n_clear");
    with_store(&state, move |store| store.delete(id)).await?;
    Ok(back_to_index())
}

pub async fn metrics<E: KvEngine + 'static>(
    State(state): SharedState<E>,
) -> Json<BTreeMap<String, u64>> {
    Json(state.counters.snapshot())
}

pub async fn stats<E: KvEngine + 'static>(State(state): SharedState<E>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}
