// HTTP routes for the roommate match API
pub mod matches;

use actix_web::web;

/// Versioned prefix every endpoint is mounted under
pub const API_PREFIX: &str = "/api/v1";

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope(API_PREFIX).configure(matches::configure));
}
