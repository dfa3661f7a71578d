//! HTTP inbound adapter exposing REST endpoints.

pub mod auth;
pub mod authentication;
pub mod error;
pub mod health;
pub mod post_context;
pub mod posts;
pub mod schemas;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;

use actix_web::web;

pub use error::ApiResult;

/// Report JSON, path and query extraction failures in the error envelope.
pub fn configure_extractors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(error::extractor_error))
        .app_data(web::PathConfig::default().error_handler(error::extractor_error))
        .app_data(web::QueryConfig::default().error_handler(error::extractor_error));
}

/// Register the `/v1` API.
///
/// `/users/feed` and `/users/activate/{token}` are registered ahead of
/// `/users/{id}` so the literal segments win.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/v1")
            .service(health::health)
            .service(authentication::register)
            .service(authentication::create_token)
            .service(users::activate_user)
            .service(users::get_feed)
            .service(users::get_user)
            .service(users::follow_user)
            .service(users::unfollow_user)
            .service(posts::create_post)
            .service(posts::get_post)
            .service(posts::update_post)
            .service(posts::delete_post)
            .service(posts::create_comment),
    );
}
