use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::extractors::JsonBody;
use crate::recommend::engine::SmartRequest;
use crate::recommend::exam::ExamRequest;
use crate::recommend::knowledge_points::PointOptions;
use crate::recommend::paths::PathOptions;
use crate::recommend::types::{Difficulty, PathLevel};
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::validation::{validate_count, validate_id};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:learner_id/questions", get(smart_questions))
        .route("/:learner_id/exam", post(compose_exam))
        .route("/:learner_id/analysis", get(learning_analysis))
        .route("/:learner_id/stats", get(recommendation_stats))
        .route("/:learner_id/learning-paths", get(learning_paths))
        .route(
            "/:learner_id/knowledge-points/:knowledge_base_id",
            get(knowledge_points),
        )
}

fn check_learner(learner_id: &str) -> Result<(), AppError> {
    validate_id("learnerId", learner_id).map_err(|m| AppError::bad_request("INVALID_LEARNER_ID", &m))
}

fn check_count(name: &str, value: usize, max: usize) -> Result<(), AppError> {
    validate_count(name, value, max).map_err(|m| AppError::bad_request("INVALID_COUNT", &m))
}

/// 逗号分隔的列表，空项忽略
fn split_list(raw: Option<&str>) -> Option<Vec<String>> {
    let items: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!items.is_empty()).then_some(items)
}

fn parse_difficulties(raw: Option<&str>) -> Result<Option<Vec<Difficulty>>, AppError> {
    split_list(raw)
        .map(|items| {
            items
                .iter()
                .map(|s| s.parse::<Difficulty>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|m| AppError::bad_request("INVALID_DIFFICULTY", &m))
        })
        .transpose()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SmartQuery {
    count: Option<usize>,
    difficulty: Option<String>,
    categories: Option<String>,
    focus_weakness: Option<bool>,
    review_mode: Option<bool>,
    exclude_answered: Option<bool>,
}

async fn smart_questions(
    Path(learner_id): Path<String>,
    Query(q): Query<SmartQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    check_learner(&learner_id)?;
    let config = state.engine().get_config().await;
    let count = q.count.unwrap_or(config.default_count);
    check_count("count", count, config.max_count)?;

    let request = SmartRequest {
        count,
        difficulty: parse_difficulties(q.difficulty.as_deref())?,
        categories: split_list(q.categories.as_deref()),
        exclude_answered: q.exclude_answered.unwrap_or(true),
        focus_weakness: q.focus_weakness.unwrap_or(true),
        review_mode: q.review_mode.unwrap_or(true),
    };
    let result = state.engine().smart_recommendations(&learner_id, &request).await;
    Ok(ok(result))
}

async fn compose_exam(
    Path(learner_id): Path<String>,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ExamRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    check_learner(&learner_id)?;
    let exam = state.engine().compose_exam(&learner_id, &req).await?;
    Ok(ok(exam))
}

async fn learning_analysis(
    Path(learner_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    check_learner(&learner_id)?;
    Ok(ok(state.engine().learning_analysis(&learner_id).await))
}

async fn recommendation_stats(
    Path(learner_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    check_learner(&learner_id)?;
    Ok(ok(state.engine().recommendation_stats(&learner_id).await))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PathQuery {
    knowledge_base_id: Option<String>,
    difficulty: Option<String>,
    max_paths: Option<usize>,
    include_completed: Option<bool>,
}

async fn learning_paths(
    Path(learner_id): Path<String>,
    Query(q): Query<PathQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    check_learner(&learner_id)?;
    let config = state.engine().get_config().await;

    let knowledge_base_id = q.knowledge_base_id.filter(|s| !s.is_empty());
    if let Some(id) = knowledge_base_id.as_deref() {
        validate_id("knowledgeBaseId", id)
            .map_err(|m| AppError::bad_request("INVALID_KNOWLEDGE_BASE_ID", &m))?;
    }
    let difficulty = q
        .difficulty
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<PathLevel>)
        .transpose()
        .map_err(|m| AppError::bad_request("INVALID_DIFFICULTY", &m))?;
    let max_paths = q.max_paths.unwrap_or(config.paths.default_max_paths);
    check_count("maxPaths", max_paths, config.max_count)?;

    let options = PathOptions {
        knowledge_base_id,
        difficulty,
        max_paths: Some(max_paths),
        include_completed: q.include_completed.unwrap_or(false),
    };
    let paths = state.engine().recommend_paths(&learner_id, &options).await?;
    Ok(ok(paths))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointQuery {
    count: Option<usize>,
    include_completed: Option<bool>,
}

async fn knowledge_points(
    Path((learner_id, knowledge_base_id)): Path<(String, String)>,
    Query(q): Query<PointQuery>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    check_learner(&learner_id)?;
    validate_id("knowledgeBaseId", &knowledge_base_id)
        .map_err(|m| AppError::bad_request("INVALID_KNOWLEDGE_BASE_ID", &m))?;
    let config = state.engine().get_config().await;
    let count = q.count.unwrap_or(config.knowledge_points.default_count);
    check_count("count", count, config.max_count)?;

    let options = PointOptions {
        count: Some(count),
        include_completed: q.include_completed.unwrap_or(false),
    };
    let points = state
        .engine()
        .recommend_knowledge_points(&learner_id, &knowledge_base_id, &options)
        .await?;
    Ok(ok(points))
}
