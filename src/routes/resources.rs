use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

use crate::core::{calculate_bounding_box, DiscoveryPipeline, DiscoveryView, QueryBuilder, SearchQuery};
use crate::models::{
    is_known_category, DirectoryStats, ErrorResponse, FavoriteRequest, HealthResponse, Resource,
    SearchParams, SearchResponse, SubmissionRequest, SubmissionResponse, SuccessResponse, CATEGORIES,
};
use crate::services::{CacheKey, CacheManager, PostgresClient, PostgresError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheManager>,
    pub postgres: Arc<PostgresClient>,
    pub pipeline: DiscoveryPipeline,
}

/// Configure all directory routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/resources", web::get().to(search_resources))
        .route("/resources/{id}", web::get().to(get_resource))
        .route("/categories", web::get().to(list_categories))
        .route("/stats", web::get().to(get_stats))
        .route("/submissions", web::post().to(create_submission))
        .route("/favorites", web::get().to(list_favorites))
        .route("/favorites", web::post().to(add_favorite))
        .route("/favorites/{resource_id}", web::delete().to(remove_favorite));
}

fn error_json(status: StatusCode, error: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: status.as_u16(),
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);

    let status = if pg_healthy { "healthy" } else { "degraded" };

    tracing::debug!("Health check: {} (L1 cache entries: {})", status, state.cache.stats().l1_size);

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Load resources matching the query's predicates
///
/// Location-scoped searches push a bounding box down to Postgres. Unscoped
/// listings are served from the cache when possible.
async fn load_candidates(state: &AppState, query: &SearchQuery) -> Result<Vec<Resource>, PostgresError> {
    let builder = QueryBuilder::new(&query.filter);

    if let Some(center) = query.center {
        let bbox = calculate_bounding_box(center, state.pipeline.radius_for(query));
        return state.postgres.fetch_resources(&builder, Some(&bbox)).await;
    }

    let cache_key = CacheKey::resources(&query.filter);
    match state.cache.get::<Vec<Resource>>(&cache_key).await {
        Ok(resources) => return Ok(resources),
        Err(crate::services::CacheError::CacheMiss(_)) => {}
        Err(e) => tracing::warn!("Cache read failed for {}: {}", cache_key, e),
    }

    let resources = state.postgres.fetch_resources(&builder, None).await?;

    if let Err(e) = state.cache.set(&cache_key, &resources).await {
        tracing::warn!("Failed to cache {}: {}", cache_key, e);
    }

    Ok(resources)
}

/// Search resources
///
/// GET /api/v1/resources?q=&category=&featured=&lat=&lng=&zip=&radius_km=&heatmap=&grid_size=
///
/// Every parameter is optional; malformed values are ignored.
async fn search_resources(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> impl Responder {
    let query = SearchQuery::from(&params.into_inner());

    tracing::info!(
        "Searching resources: keyword={:?}, categories={:?}, featured={}, center={:?}, heatmap={}",
        query.filter.keyword,
        query.filter.categories,
        query.filter.featured_only,
        query.center,
        query.heatmap
    );

    let candidates = match load_candidates(&state, &query).await {
        Ok(resources) => resources,
        Err(e) => {
            tracing::error!("Failed to load resources: {}", e);
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load resources", e.to_string());
        }
    };

    let outcome = state.pipeline.run(candidates, &query);

    tracing::info!(
        "Returning {} resources (from {} candidates)",
        outcome.total,
        outcome.total_candidates
    );

    let response = match outcome.view {
        DiscoveryView::Resources(resources) => SearchResponse::Resources {
            resources,
            total: outcome.total,
        },
        DiscoveryView::Heatmap(cells) => SearchResponse::Heatmap {
            cells,
            total: outcome.total,
        },
    };

    HttpResponse::Ok().json(response)
}

/// Get a single approved resource
///
/// GET /api/v1/resources/{id}
async fn get_resource(state: web::Data<AppState>, path: web::Path<i32>) -> impl Responder {
    let id = path.into_inner();
    let cache_key = CacheKey::resource(id);

    if let Ok(resource) = state.cache.get::<Resource>(&cache_key).await {
        return HttpResponse::Ok().json(resource);
    }

    match state.postgres.get_resource(id).await {
        Ok(resource) => {
            if let Err(e) = state.cache.set(&cache_key, &resource).await {
                tracing::warn!("Failed to cache {}: {}", cache_key, e);
            }
            HttpResponse::Ok().json(resource)
        }
        Err(PostgresError::NotFound(message)) => {
            error_json(StatusCode::NOT_FOUND, "Resource not found", message)
        }
        Err(e) => {
            tracing::error!("Failed to fetch resource {}: {}", id, e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch resource", e.to_string())
        }
    }
}

/// List the fixed category set
///
/// GET /api/v1/categories
async fn list_categories() -> impl Responder {
    HttpResponse::Ok().json(CATEGORIES)
}

/// Directory statistics
///
/// GET /api/v1/stats
async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let cache_key = CacheKey::stats();

    if let Ok(stats) = state.cache.get::<DirectoryStats>(&cache_key).await {
        return HttpResponse::Ok().json(stats);
    }

    match state.postgres.get_stats().await {
        Ok(stats) => {
            if let Err(e) = state.cache.set(&cache_key, &stats).await {
                tracing::warn!("Failed to cache stats: {}", e);
            }
            HttpResponse::Ok().json(stats)
        }
        Err(e) => {
            tracing::error!("Failed to compute stats: {}", e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to compute stats", e.to_string())
        }
    }
}

/// Submit a new resource for review
///
/// POST /api/v1/submissions
///
/// Request body:
/// ```json
/// {
///   "title": "string",
///   "description": "string",
///   "category": "Food Assistance",
///   "contact_name": "string",
///   "contact_email": "string",
///   "phone": "string",
///   "website": "https://...",
///   "address": "string",
///   "city": "string",
///   "state": "string"
/// }
/// ```
async fn create_submission(
    state: web::Data<AppState>,
    req: web::Json<SubmissionRequest>,
) -> impl Responder {
    let mut submission = req.into_inner();
    submission.normalize();

    if let Err(errors) = submission.validate() {
        tracing::info!("Validation failed for submission: {:?}", errors);
        return error_json(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    if !is_known_category(&submission.category) {
        return error_json(
            StatusCode::BAD_REQUEST,
            "Validation failed",
            format!("Unknown category: {}", submission.category),
        );
    }

    match state.postgres.create_submission(&submission).await {
        Ok(id) => {
            // Pending submission count changed
            if let Err(e) = state.cache.delete(&CacheKey::stats()).await {
                tracing::warn!("Failed to invalidate stats: {}", e);
            }
            HttpResponse::Ok().json(SubmissionResponse {
                success: true,
                message: "Thank you! Your submission has been received and will be reviewed shortly."
                    .to_string(),
                id,
            })
        }
        Err(e) => {
            tracing::error!("Failed to record submission: {}", e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to record submission", e.to_string())
        }
    }
}

fn require_user_id(query: &HashMap<String, String>) -> Result<&str, HttpResponse> {
    match query.get("userId").map(|id| id.trim()) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(error_json(
            StatusCode::BAD_REQUEST,
            "Missing userId parameter",
            "userId query parameter is required",
        )),
    }
}

/// Get a user's favorite resource ids
///
/// GET /api/v1/favorites?userId={userId}
async fn list_favorites(
    state: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> impl Responder {
    let user_id = match require_user_id(&query) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.postgres.list_favorites(user_id).await {
        Ok(ids) => HttpResponse::Ok().json(ids),
        Err(e) => {
            tracing::error!("Failed to fetch favorites for {}: {}", user_id, e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch favorites", e.to_string())
        }
    }
}

/// Save a favorite
///
/// POST /api/v1/favorites
///
/// Request body:
/// ```json
/// { "userId": "string", "resourceId": 1 }
/// ```
async fn add_favorite(
    state: web::Data<AppState>,
    req: web::Json<FavoriteRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_json(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    match state.postgres.get_resource(req.resource_id).await {
        Ok(_) => {}
        Err(PostgresError::NotFound(message)) => {
            return error_json(StatusCode::NOT_FOUND, "Resource not found", message);
        }
        Err(e) => {
            tracing::error!("Failed to look up resource {}: {}", req.resource_id, e);
            return error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save favorite", e.to_string());
        }
    }

    match state.postgres.add_favorite(&req.user_id, req.resource_id).await {
        Ok(()) => HttpResponse::Ok().json(SuccessResponse { success: true }),
        Err(e) => {
            tracing::error!("Failed to save favorite for {}: {}", req.user_id, e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save favorite", e.to_string())
        }
    }
}

/// Remove a favorite
///
/// DELETE /api/v1/favorites/{resourceId}?userId={userId}
async fn remove_favorite(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    query: web::Query<HashMap<String, String>>,
) -> impl Responder {
    let user_id = match require_user_id(&query) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let resource_id = path.into_inner();

    match state.postgres.remove_favorite(user_id, resource_id).await {
        Ok(removed) => {
            tracing::debug!("Removed favorite {} -> {}: {}", user_id, resource_id, removed);
            HttpResponse::Ok().json(SuccessResponse { success: true })
        }
        Err(e) => {
            tracing::error!("Failed to remove favorite for {}: {}", user_id, e);
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to remove favorite", e.to_string())
        }
    }
}
