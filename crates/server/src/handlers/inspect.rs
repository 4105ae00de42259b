//! Paper inspection handler

use crate::handlers::run_blocking;
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use sanity_common::errors::{AppError, Result};
use sanity_ranking::lexical::sanitize;
use sanity_ranking::{inspect as inspect_terms, InspectedTerm, RenderedPaper};
use serde::{Deserialize, Serialize};

const WORDS_DESC: &str = "The following are the tokens and their (tfidf) weight in the paper vector. This is the actual summary that feeds into the SVM to power recommendations, so hopefully it is good and representative!";

#[derive(Debug, Deserialize)]
pub struct InspectQuery {
    #[serde(default)]
    pub pid: String,
}

#[derive(Debug, Serialize)]
pub struct InspectResponse {
    pub paper: RenderedPaper,
    pub words: Vec<InspectedTerm>,
    pub words_desc: &'static str,
}

/// A paper together with the non-zero terms of its feature vector
pub async fn inspect(
    State(state): State<AppState>,
    Query(query): Query<InspectQuery>,
) -> Result<Json<InspectResponse>> {
    let pid = sanitize(&query.pid);
    if pid.is_empty() {
        return Err(AppError::InvalidInput {
            message: "pid is required".to_string(),
        });
    }

    let worker = state.clone();
    let response = run_blocking(state.config.request_timeout(), move || {
        let doc = worker
            .catalog
            .paper(&pid)?
            .ok_or_else(|| AppError::PaperNotFound { id: pid.clone() })?;
        let snapshot = worker.features.load()?;
        let words = inspect_terms(&snapshot, &pid)?;

        Ok(InspectResponse {
            paper: RenderedPaper::new(&doc, 0.0),
            words,
            words_desc: WORDS_DESC,
        })
    })
    .await?;

    Ok(Json(response))
}
