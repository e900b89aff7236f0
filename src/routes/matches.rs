use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;
use crate::core::{MatchCoordinator, MatchError};
use crate::models::{
    CandidatesResponse, CompatibilityRequest, CompatibilityResponse, ErrorResponse, HealthResponse,
    MatchActionRequest, MatchActionResponse, MatchRecord, MatchStatsResponse, MatchStatus, MatchView,
    MatchesResponse, UserQuery,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<MatchCoordinator>,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches", web::get().to(list_matches))
        .route("/matches/candidates", web::get().to(find_candidates))
        .route("/matches/like", web::post().to(like))
        .route("/matches/pass", web::post().to(pass))
        .route("/matches/matched", web::get().to(list_matched_pairs))
        .route("/matches/stats", web::get().to(match_stats))
        .route("/compatibility", web::post().to(compatibility))
        .route("/profiles/{user_id}/invalidate", web::post().to(invalidate_profile));
}

fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

/// Map a match error to its HTTP response
pub fn error_response(context: &str, err: &MatchError) -> HttpResponse {
    match err {
        MatchError::NotFound(_) => HttpResponse::NotFound().json(ErrorResponse {
            error: "User not found".to_string(),
            message: err.to_string(),
            status_code: 404,
        }),
        MatchError::SelfMatch(_) => HttpResponse::BadRequest().json(ErrorResponse {
            error: "Invalid target".to_string(),
            message: err.to_string(),
            status_code: 400,
        }),
        MatchError::Store(e) => {
            tracing::error!("{}: {}", context, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: context.to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

fn views(records: &[MatchRecord], viewer: &str) -> MatchesResponse {
    let matches: Vec<MatchView> = records.iter().map(|r| MatchView::for_user(r, viewer)).collect();
    MatchesResponse {
        count: matches.len(),
        matches,
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = if state.coordinator.health_check().await { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Ranked candidates
///
/// GET /api/v1/matches/candidates?userId={userId}
async fn find_candidates(state: web::Data<AppState>, query: web::Query<UserQuery>) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    match state.coordinator.candidates(&query.user_id).await {
        Ok(candidates) => {
            tracing::info!("Returning {} candidates for user {}", candidates.len(), query.user_id);
            HttpResponse::Ok().json(CandidatesResponse {
                total_results: candidates.len(),
                candidates,
            })
        }
        Err(e) => error_response("Failed to find candidates", &e),
    }
}

/// Like a user
///
/// POST /api/v1/matches/like
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "targetUserId": "string"
/// }
/// ```
async fn like(state: web::Data<AppState>, req: web::Json<MatchActionRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.coordinator.like(&req.user_id, &req.target_user_id).await {
        Ok(record) => HttpResponse::Ok().json(MatchActionResponse {
            is_mutual: record.status == MatchStatus::Matched,
            record: MatchView::for_user(&record, &req.user_id),
        }),
        Err(e) => error_response("Failed to record like", &e),
    }
}

/// Pass on a user
///
/// POST /api/v1/matches/pass
async fn pass(state: web::Data<AppState>, req: web::Json<MatchActionRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.coordinator.pass(&req.user_id, &req.target_user_id).await {
        Ok(record) => HttpResponse::Ok().json(MatchActionResponse {
            is_mutual: false,
            record: MatchView::for_user(&record, &req.user_id),
        }),
        Err(e) => error_response("Failed to record pass", &e),
    }
}

/// All match records of a user
///
/// GET /api/v1/matches?userId={userId}
async fn list_matches(state: web::Data<AppState>, query: web::Query<UserQuery>) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    match state.coordinator.matches_for(&query.user_id).await {
        Ok(records) => HttpResponse::Ok().json(views(&records, &query.user_id)),
        Err(e) => error_response("Failed to fetch matches", &e),
    }
}

/// Mutually matched pairs of a user
///
/// GET /api/v1/matches/matched?userId={userId}
async fn list_matched_pairs(state: web::Data<AppState>, query: web::Query<UserQuery>) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    match state.coordinator.matched_pairs_for(&query.user_id).await {
        Ok(records) => HttpResponse::Ok().json(views(&records, &query.user_id)),
        Err(e) => error_response("Failed to fetch matched pairs", &e),
    }
}

/// GET /api/v1/matches/stats?userId={userId}
async fn match_stats(state: web::Data<AppState>, query: web::Query<UserQuery>) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    match state.coordinator.stats_for(&query.user_id).await {
        Ok(stats) => HttpResponse::Ok().json(MatchStatsResponse {
            user_id: query.user_id.clone(),
            stats,
        }),
        Err(e) => error_response("Failed to get match statistics", &e),
    }
}

/// Compatibility score between two users
///
/// POST /api/v1/compatibility
async fn compatibility(state: web::Data<AppState>, req: web::Json<CompatibilityRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.coordinator.compute_score_for(&req.user_id, &req.target_user_id).await {
        Ok(score) => HttpResponse::Ok().json(CompatibilityResponse {
            user_id: req.user_id.clone(),
            target_user_id: req.target_user_id.clone(),
            compatibility_score: score,
        }),
        Err(e) => error_response("Failed to compute compatibility", &e),
    }
}

/// Drop cached scores after a profile edit
///
/// POST /api/v1/profiles/{userId}/invalidate
async fn invalidate_profile(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let user_id = path.into_inner();
    state.coordinator.invalidate_scores(&user_id).await;
    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CompatibilityScorer, CoordinatorOptions};
    use crate::models::{Preferences, UserProfile};
    use crate::services::InMemoryStore;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    async fn state() -> AppState {
        let store = Arc::new(InMemoryStore::new());
        for id in ["alice", "bob", "carol"] {
            store.upsert_profile(UserProfile::new(id, Preferences::default())).await;
        }
        let coordinator = MatchCoordinator::new(
            store.clone(),
            store,
            CompatibilityScorer::default(),
            CoordinatorOptions::default(),
        );
        AppState {
            coordinator: Arc::new(coordinator),
        }
    }

    #[actix_web::test]
    async fn test_like_flow_over_http() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state().await))
                .service(web::scope("/api/v1").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/matches/like")
            .set_json(json!({"userId": "alice", "targetUserId": "bob"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["isMutual"], false);
        assert_eq!(body["match"]["userId"], "bob");
        assert_eq!(body["match"]["likedByMe"], true);

        let req = test::TestRequest::post()
            .uri("/api/v1/matches/like")
            .set_json(json!({"userId": "bob", "targetUserId": "alice"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["isMutual"], true);
        assert_eq!(body["match"]["status"], "MATCHED");

        let req = test::TestRequest::get()
            .uri("/api/v1/matches/candidates?userId=alice")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total_results"], 1);
        assert_eq!(body["candidates"][0]["userId"], "carol");
        assert_eq!(body["candidates"][0]["compatibilityScore"], 50.0);

        let req = test::TestRequest::get()
            .uri("/api/v1/matches/stats?userId=alice")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["matchedPairs"], 1);
        assert_eq!(body["likesGiven"], 1);
    }

    #[actix_web::test]
    async fn test_unknown_user_is_404() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state().await))
                .service(web::scope("/api/v1").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/matches/pass")
            .set_json(json!({"userId": "alice", "targetUserId": "nobody"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_empty_user_id_is_400() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state().await))
                .service(web::scope("/api/v1").configure(configure)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/compatibility")
            .set_json(json!({"userId": "", "targetUserId": "bob"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
