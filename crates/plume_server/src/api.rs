/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    middleware::{from_fn, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use plume_core::{
    get_content_with_children, schema, AuthorView, ContentEngine, ContentError, TypeFilter,
};
use plume_protocol::{Content, ContentPatch, ErrorBody};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tower_http::trace::TraceLayer;
use tracing::{error, info_span, warn};

static REQ_ID: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> String {
    let id = REQ_ID.fetch_add(1, Ordering::Relaxed);
    format!("req-{id}")
}

#[derive(Clone)]
pub struct AppState {
    pub engine: ContentEngine,
    pub servers_file: PathBuf,
}

/// Engine failure rendered as `{"error", "code"}` with the mapped status.
pub struct ApiError(pub ContentError);

impl From<ContentError> for ApiError {
    fn from(e: ContentError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            error!(code = self.0.error_code(), "request failed: {}", self.0);
        }
        let body = ErrorBody {
            error: self.0.to_string(),
            code: self.0.error_code().to_string(),
        };
        (status, axum::Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, serde::Deserialize)]
pub struct ListQuery {
    #[serde(rename = "showDeleted")]
    show_deleted: Option<String>,
}

impl ListQuery {
    fn show_deleted(&self) -> bool {
        self.show_deleted
            .as_deref()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

pub fn router(state: AppState, max_body: usize) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/servers", get(servers))
        .route("/api/post", post(create_post).put(update_post))
        .route("/api/post/:id", axum::routing::delete(delete_post))
        .route("/api/getAll", get(get_all))
        .route("/api/getPosts", get(get_posts))
        .route("/api/getPostById/:id", get(get_post_by_id))
        .route("/api/getCommentById/:id", get(get_comment_by_id))
        .route("/api/getCommentsByPostId/:id", get(get_comments_by_post))
        .route("/api/getPostsByUserId/:uid", get(get_posts_by_user))
        .route("/api/getCommentsByUserId/:uid", get(get_comments_by_user))
        .route("/api/getPostsCommentedByUser/:uid", get(get_posts_commented_by_user))
        .route("/api/getPostWithChildren/:id", get(get_post_with_children))
        .route("/api/admin/reindex", post(reindex))
        .layer(axum::extract::DefaultBodyLimit::max(max_body))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let request_id = req
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("req");
                info_span!(
                    "http",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %request_id
                )
            }),
        )
        .layer(from_fn(ensure_request_id))
        .with_state(state)
}

async fn ensure_request_id(mut req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let request_id = match req.headers().get("x-request-id") {
        Some(v) => v.clone(),
        None => {
            let v = HeaderValue::from_str(&next_request_id())
                .unwrap_or_else(|_| HeaderValue::from_static("req"));
            req.headers_mut().insert("x-request-id", v.clone());
            v
        }
    };
    let mut resp = next.run(req).await;
    resp.headers_mut().insert("x-request-id", request_id);
    resp
}

/// Parses a JSON object body, folding legacy attribute names onto canonical ones.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ContentError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ContentError::ValidationError(format!("invalid JSON body: {e}")))?;
    let Value::Object(obj) = value else {
        return Err(ContentError::ValidationError(
            "request body must be a JSON object".to_string(),
        ));
    };
    let obj = schema::strip_bookkeeping(schema::normalize(obj));
    serde_json::from_value(Value::Object(obj))
        .map_err(|e| ContentError::ValidationError(format!("invalid content: {e}")))
}

async fn status() -> &'static str {
    "Server is running"
}

async fn servers(State(state): State<AppState>) -> Response {
    let parsed = tokio::fs::read_to_string(&state.servers_file)
        .await
        .map_err(anyhow::Error::from)
        .and_then(|raw| serde_json::from_str::<Value>(&raw).map_err(anyhow::Error::from));
    match parsed {
        Ok(v) => axum::Json(v).into_response(),
        Err(e) => {
            warn!(path = %state.servers_file.display(), "servers file unreadable: {e:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

async fn create_post(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let content: Content = parse_body(&body)?;
    let created = state.engine.create_content(content).await?;
    Ok((StatusCode::CREATED, axum::Json(created)).into_response())
}

async fn update_post(State(state): State<AppState>, body: Bytes) -> ApiResult<axum::Json<Content>> {
    let patch: ContentPatch = parse_body(&body)?;
    Ok(axum::Json(state.engine.update_content(patch).await?))
}

async fn delete_post(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.engine.delete_content(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_all(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> ApiResult<axum::Json<Vec<Content>>> {
    let items = state
        .engine
        .list_content(TypeFilter::Any, q.show_deleted())
        .await?;
    Ok(axum::Json(items))
}

async fn get_posts(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> ApiResult<axum::Json<Vec<Content>>> {
    let items = state
        .engine
        .list_content(TypeFilter::Posts, q.show_deleted())
        .await?;
    Ok(axum::Json(items))
}

async fn get_post_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<axum::Json<Content>> {
    Ok(axum::Json(state.engine.get_by_id(&id).await?))
}

async fn get_comment_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<axum::Json<Content>> {
    Ok(axum::Json(state.engine.get_comment_by_id(&id).await?))
}

async fn get_comments_by_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<axum::Json<Vec<Content>>> {
    Ok(axum::Json(state.engine.get_comments_by_parent(&id).await?))
}

async fn get_posts_by_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<axum::Json<Vec<Content>>> {
    let items = state.engine.list_by_author(&uid, AuthorView::Posts).await?;
    Ok(axum::Json(items))
}

async fn get_comments_by_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<axum::Json<Vec<Content>>> {
    let items = state
        .engine
        .list_by_author(&uid, AuthorView::Comments)
        .await?;
    Ok(axum::Json(items))
}

async fn get_posts_commented_by_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<axum::Json<Vec<Content>>> {
    let items = state.engine.get_posts_commented_by_author(&uid).await?;
    Ok(axum::Json(items))
}

async fn get_post_with_children(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let thread = get_content_with_children(&state.engine, &id).await?;
    Ok(axum::Json(thread).into_response())
}

async fn reindex(State(state): State<AppState>) -> ApiResult<axum::Json<Value>> {
    let indexed = state.engine.rebuild_indexes().await?;
    Ok(axum::Json(serde_json::json!({ "indexed": indexed })))
}
