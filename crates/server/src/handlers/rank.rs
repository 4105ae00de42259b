//! Interactive ranking handler

use crate::handlers::run_blocking;
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use sanity_common::errors::{AppError, ErrorCode, Result};
use sanity_ranking::{
    render_ranking, ClassifierParams, RankQuery, RankRequest, RankingPipeline, RenderedPaper,
    TermWeight,
};
use serde::Serialize;
use tracing::warn;

const WORDS_DESC: &str = "Here are the top 40 most positive and bottom 20 most negative weights of the SVM. If they don't look great then try tuning the regularization strength hyperparameter of the SVM, svm_c, above. Lower C is higher regularization.";

#[derive(Debug, Serialize)]
pub struct RankResponse {
    pub papers: Vec<RenderedPaper>,
    pub words: Vec<TermWeight>,
    pub words_desc: &'static str,
    pub gvars: RankVars,
}

/// The request as interpreted, so clients can redisplay it
#[derive(Debug, Serialize)]
pub struct RankVars {
    pub rank: String,
    pub pid: String,
    pub time_filter: String,
    pub search_query: String,
    pub svm_c: String,
    pub page_number: String,
}

impl From<&RankRequest> for RankVars {
    fn from(request: &RankRequest) -> Self {
        Self {
            rank: request.strategy.as_str().to_string(),
            pid: request.pid.clone(),
            time_filter: request.time_filter_raw.clone(),
            search_query: request.query.clone(),
            svm_c: request.svm_c.to_string(),
            page_number: request.page.to_string(),
        }
    }
}

/// Rank papers for the given query parameters.
///
/// Store failures and timeouts are returned as errors; anything else
/// degrades to an empty page.
pub async fn rank(
    State(state): State<AppState>,
    Query(query): Query<RankQuery>,
) -> Result<Json<RankResponse>> {
    let request = RankRequest::parse(&query, &state.config.ranking);
    let gvars = RankVars::from(&request);

    let worker = state.clone();
    let outcome = run_blocking(state.config.request_timeout(), move || {
        let ranking = &worker.config.ranking;
        let pipeline = RankingPipeline::new(
            worker.catalog.as_ref(),
            worker.features.as_ref(),
            ClassifierParams::from_config(ranking),
        );
        let page = pipeline.run(&request.to_strategy(), &request.to_options(ranking.page_size))?;
        let papers = render_ranking(worker.catalog.as_ref(), &page.items)?;
        Ok((papers, page.words))
    })
    .await;

    let (papers, words) = match outcome {
        Ok(result) => result,
        Err(e) if is_hard_failure(&e) => return Err(e),
        Err(e) => {
            warn!(error = %e, rank = %gvars.rank, "Ranking failed, returning empty page");
            (Vec::new(), Vec::new())
        }
    };

    Ok(Json(RankResponse {
        papers,
        words,
        words_desc: WORDS_DESC,
        gvars,
    }))
}

fn is_hard_failure(e: &AppError) -> bool {
    matches!(e.code(), ErrorCode::StoreUnavailable | ErrorCode::Timeout)
}

#[cfg(test)]
mod tests {
    use crate::tests::{get_json, test_state};
    use axum::http::StatusCode;
    use sanity_common::store::JsonDirStore;
    use std::sync::Arc;

    fn ids(body: &serde_json::Value) -> Vec<String> {
        body["papers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_default_is_time_ranking() {
        let (status, body) = get_json(test_state(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gvars"]["rank"], "time");
        assert_eq!(body["gvars"]["page_number"], "1");
        assert_eq!(ids(&body).len(), 5);
    }

    #[tokio::test]
    async fn test_search_query() {
        let (status, body) = get_json(test_state(), "/?q=neural&rank=time").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gvars"]["rank"], "search");
        assert_eq!(body["gvars"]["search_query"], "neural");
        // equal title hits, descending pid
        assert_eq!(ids(&body), vec!["doc1", "doc0"]);
        assert_eq!(body["papers"][0]["weight"], 20.0);
    }

    #[tokio::test]
    async fn test_pid_ranking_returns_words() {
        let (status, body) = get_json(test_state(), "/?rank=pid&pid=doc3&svm_c=0.1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body)[0], "doc3");
        assert_eq!(body["words"][0]["word"], "term3");
        assert_eq!(body["gvars"]["svm_c"], "0.1");
    }

    #[tokio::test]
    async fn test_unknown_pid_is_empty_page() {
        let (status, body) = get_json(test_state(), "/?rank=pid&pid=missing").await;
        assert_eq!(status, StatusCode::OK);
        assert!(ids(&body).is_empty());
        assert!(body["words"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_page_past_end_and_bad_inputs() {
        let (_, body) = get_json(test_state(), "/?page_number=2").await;
        assert!(ids(&body).is_empty());

        let (status, body) =
            get_json(test_state(), "/?page_number=abc&svm_c=zero&time_filter=soon").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gvars"]["page_number"], "1");
        assert_eq!(body["gvars"]["svm_c"], "0.01");
        assert_eq!(body["gvars"]["time_filter"], "soon");
        assert_eq!(ids(&body).len(), 5);
    }

    #[tokio::test]
    async fn test_time_filter_drops_old_papers() {
        // every test paper is one day old
        let (_, body) = get_json(test_state(), "/?time_filter=0").await;
        assert!(ids(&body).is_empty());
        let (_, body) = get_json(test_state(), "/?time_filter=2").await;
        assert_eq!(ids(&body).len(), 5);
    }

    #[tokio::test]
    async fn test_store_unavailable_is_hard_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = test_state();
        state.catalog = Arc::new(JsonDirStore::open(dir.path()).unwrap());

        let (status, body) = get_json(state, "/?q=neural").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "STORE_UNAVAILABLE");
    }
}
