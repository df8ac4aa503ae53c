//! HTTP handlers for Video Service
//!
//! Thin adapters: parse the request, call into [`Services`], wrap the result
//! in the `{code, data}` envelope. Failures render through `AppError`.

use actix_web::{web, HttpRequest, HttpResponse};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::warn;
use video_core::constants::DEFAULT_PAGE_SIZE;
use video_core::{LikeTransition, Pagination};

use crate::error::{codes, AppError, Result};
use crate::metrics::serve_metrics;
use crate::services::{HotScoreRefresher, Services, SubmitVideo};

const USER_ID_HEADER: &str = "x-user-id";

/// Upload bodies carry the base64 payload inline.
const MAX_JSON_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub data: T,
}

fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse {
        code: codes::SUCCESS,
        data,
    })
}

#[derive(Debug, Deserialize)]
pub struct SubmitVideoPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_url: String,
    #[serde(default)]
    pub duration_seconds: i64,
    /// Base64-encoded video bytes
    pub payload: String,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl PageQuery {
    fn pagination(&self) -> Result<Pagination> {
        Ok(Pagination::new(
            self.page.unwrap_or(1),
            self.size.unwrap_or(DEFAULT_PAGE_SIZE),
        )?)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub keyword: String,
    /// Comma-separated
    pub tags: Option<String>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub video_id: i64,
    pub liked: bool,
    pub transition: Option<LikeTransition>,
}

#[derive(Debug, Serialize)]
pub struct HotScoreResponse {
    pub video_id: i64,
    pub hot_score: f64,
}

/// Submit a new video
pub async fn submit_video(
    req: HttpRequest,
    services: web::Data<Services>,
    payload: web::Json<SubmitVideoPayload>,
) -> Result<HttpResponse> {
    let user_id = extract_user_id(&req)?;
    let payload = payload.into_inner();
    let bytes = STANDARD
        .decode(payload.payload.as_bytes())
        .map_err(|_| AppError::ValidationError("payload is not valid base64".into()))?;

    let submitted = services
        .videos
        .submit(
            user_id,
            SubmitVideo {
                title: payload.title,
                description: payload.description,
                cover_url: payload.cover_url,
                duration_seconds: payload.duration_seconds,
                payload: Bytes::from(bytes),
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse {
        code: codes::SUCCESS,
        data: submitted,
    }))
}

/// Video profile; counts as a view
pub async fn get_video(
    services: web::Data<Services>,
    video_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let profile = services.videos.get(video_id.into_inner()).await?;
    Ok(ok(profile))
}

pub async fn search_videos(
    services: web::Data<Services>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let page = PageQuery {
        page: query.page,
        size: query.size,
    }
    .pagination()?;
    let tags: Vec<String> = query
        .tags
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect();

    let videos = services.videos.search(&query.keyword, &tags, page).await?;
    Ok(ok(videos))
}

pub async fn trending_videos(
    services: web::Data<Services>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let videos = services.videos.trending(query.pagination()?).await?;
    Ok(ok(videos))
}

pub async fn like_video(
    req: HttpRequest,
    services: web::Data<Services>,
    video_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = extract_user_id(&req)?;
    let video_id = video_id.into_inner();
    let update = services.likes.like(user_id, video_id).await?;
    Ok(ok(LikeResponse {
        video_id,
        liked: true,
        transition: Some(update.transition),
    }))
}

pub async fn unlike_video(
    req: HttpRequest,
    services: web::Data<Services>,
    video_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = extract_user_id(&req)?;
    let video_id = video_id.into_inner();
    let update = services.likes.unlike(user_id, video_id).await?;
    Ok(ok(LikeResponse {
        video_id,
        liked: false,
        transition: Some(update.transition),
    }))
}

pub async fn like_status(
    req: HttpRequest,
    services: web::Data<Services>,
    video_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = extract_user_id(&req)?;
    let video_id = video_id.into_inner();
    let liked = services.likes.is_liked(user_id, video_id).await?;
    Ok(ok(LikeResponse {
        video_id,
        liked,
        transition: None,
    }))
}

/// Recompute and republish a hot score (called by the social service)
pub async fn refresh_hot_score(
    services: web::Data<Services>,
    video_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let video_id = video_id.into_inner();
    let hot_score = services.ranking.refresh(video_id).await?;
    Ok(ok(HotScoreResponse {
        video_id,
        hot_score,
    }))
}

pub async fn health(services: web::Data<Services>) -> HttpResponse {
    let cache = match services.cache.ping().await {
        Ok(()) => "up",
        Err(e) => {
            warn!(error = %e, "Cache health check failed");
            "down"
        }
    };
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "cache": cache,
    }))
}

fn extract_user_id(req: &HttpRequest) -> Result<i64> {
    let header_value = req
        .headers()
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized("Missing x-user-id header".into()))?;

    let value = header_value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid x-user-id header".into()))?;

    match value.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::Unauthorized("Invalid x-user-id header value".into())),
    }
}

/// Configure routes for video service
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(MAX_JSON_BODY_BYTES))
        .route("/health", web::get().to(health))
        .route("/metrics", web::get().to(serve_metrics))
        .service(
            web::scope("/api/v1/videos")
                .route("", web::post().to(submit_video))
                .route("/search", web::get().to(search_videos))
                .route("/trending", web::get().to(trending_videos))
                .route("/{video_id}", web::get().to(get_video))
                .route("/{video_id}/like", web::post().to(like_video))
                .route("/{video_id}/like", web::delete().to(unlike_video))
                .route("/{video_id}/like", web::get().to(like_status)),
        )
        .service(
            web::scope("/internal/videos")
                .route("/{video_id}/hot", web::post().to(refresh_hot_score)),
        );
}
