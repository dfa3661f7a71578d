//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every `/v1` endpoint plus the health checks, the
//! request and response schemas, and the bearer token security scheme. The
//! document backs Swagger UI in debug builds and is exported with
//! `cargo run --bin openapi-dump` for external tooling.

use crate::domain::{Comment, CommentAuthor, FeedItem, Post, PostWithComments, Role, User};
use crate::inbound::http::authentication::{
    RegisterRequest, RegisteredUserResponse, TokenRequest, TokenResponse,
};
use crate::inbound::http::health::HealthReport;
use crate::inbound::http::posts::{CreateCommentRequest, CreatePostRequest, UpdatePostRequest};
use crate::inbound::http::schemas::ErrorBody;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Name of the bearer token security scheme.
pub const BEARER_SCHEME: &str = "BearerAuth";

/// Enrich the generated document with the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            BEARER_SCHEME,
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Access token issued by POST /v1/authentication/token."))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "murmur API",
        description = "Accounts, posts, comments, follows and feeds behind bearer tokens."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerAuth" = [])),
    paths(
        crate::inbound::http::health::health,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
        crate::inbound::http::authentication::register,
        crate::inbound::http::authentication::create_token,
        crate::inbound::http::users::activate_user,
        crate::inbound::http::users::get_feed,
        crate::inbound::http::users::get_user,
        crate::inbound::http::users::follow_user,
        crate::inbound::http::users::unfollow_user,
        crate::inbound::http::posts::create_post,
        crate::inbound::http::posts::get_post,
        crate::inbound::http::posts::update_post,
        crate::inbound::http::posts::delete_post,
        crate::inbound::http::posts::create_comment,
    ),
    components(schemas(
        ErrorBody,
        User,
        Role,
        Post,
        PostWithComments,
        Comment,
        CommentAuthor,
        FeedItem,
        HealthReport,
        RegisterRequest,
        RegisteredUserResponse,
        TokenRequest,
        TokenResponse,
        CreatePostRequest,
        UpdatePostRequest,
        CreateCommentRequest,
    )),
    tags(
        (name = "authentication", description = "Sign-up and token issuance"),
        (name = "users", description = "Activation, profiles, follows and feeds"),
        (name = "posts", description = "Posts and their comments"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
