//! Corpus statistics handler

use crate::handlers::run_blocking;
use crate::AppState;
use axum::{extract::State, Json};
use sanity_common::errors::Result;
use sanity_ranking::{corpus_stats, CorpusStats};

pub async fn stats(State(state): State<AppState>) -> Result<Json<CorpusStats>> {
    let catalog = state.catalog.clone();
    let metas = run_blocking(state.config.request_timeout(), move || catalog.metas()).await?;

    Ok(Json(corpus_stats(&metas, chrono::Utc::now().timestamp())))
}
