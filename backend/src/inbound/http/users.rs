//! User handlers: activation, profiles, follows and the feed.
//!
//! ```text
//! PUT /v1/users/activate/{token}
//! GET /v1/users/feed?limit=20&offset=0&sort=desc&search=rust
//! GET /v1/users/{id}
//! PUT /v1/users/{id}/follows
//! PUT /v1/users/{id}/unfollows
//! ```

use actix_web::{HttpResponse, get, put, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::{Error, FeedItem, FeedParams, FeedQuery, InvitationToken, User, UserId};

use super::ApiResult;
use super::auth::AuthenticatedUser;
use super::schemas::{Data, ErrorBody};
use super::state::HttpState;

/// Consume an invitation token and activate its user.
#[utoipa::path(
    put,
    path = "/v1/users/activate/{token}",
    params(("token" = String, Path, description = "Invitation token from the activation mail")),
    responses(
        (status = 204, description = "User activated"),
        (status = 404, description = "Unknown, expired or used token", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tags = ["users"],
    operation_id = "activateUser",
    security([])
)]
#[put("/users/activate/{token}")]
pub async fn activate_user(
    state: web::Data<HttpState>,
    token: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let token = InvitationToken::from_plain(token.into_inner());
    state.accounts.activate(&token).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Raw feed parameters. Validation happens in [`FeedQuery::parse`].
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeedQueryParams {
    /// Page size, 1 to 100. Defaults to 20.
    pub limit: Option<i64>,
    /// Items to skip. Defaults to 0.
    pub offset: Option<i64>,
    /// `asc` or `desc` by creation time. Defaults to `desc`.
    pub sort: Option<String>,
    /// Case-insensitive match on title or content.
    pub search: Option<String>,
    /// Lower bound, `YYYY-MM-DD HH:MM:SS` UTC. Unparsable values are ignored.
    pub since: Option<String>,
    /// Upper bound, `YYYY-MM-DD HH:MM:SS` UTC. Unparsable values are ignored.
    pub until: Option<String>,
}

impl FeedQueryParams {
    fn as_params(&self) -> FeedParams<'_> {
        FeedParams {
            limit: self.limit,
            offset: self.offset,
            sort: self.sort.as_deref(),
            search: self.search.as_deref(),
            since: self.since.as_deref(),
            until: self.until.as_deref(),
        }
    }
}

/// Posts by the caller and the users they follow.
#[utoipa::path(
    get,
    path = "/v1/users/feed",
    params(FeedQueryParams),
    responses(
        (status = 200, description = "Feed page", body = Data<Vec<FeedItem>>),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 401, description = "Unauthorised", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tags = ["users"],
    operation_id = "getFeed",
    security(("BearerAuth" = []))
)]
#[get("/users/feed")]
pub async fn get_feed(
    state: web::Data<HttpState>,
    viewer: AuthenticatedUser,
    params: web::Query<FeedQueryParams>,
) -> ApiResult<web::Json<Data<Vec<FeedItem>>>> {
    let query = FeedQuery::parse(&params.as_params())
        .map_err(|err| Error::invalid_request(err.to_string()))?;
    let items = state.posts.feed(viewer.id(), &query).await?;
    Ok(web::Json(Data::new(items)))
}

/// Fetch an active user by id.
#[utoipa::path(
    get,
    path = "/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = Data<User>),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 401, description = "Unauthorised", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tags = ["users"],
    operation_id = "getUser",
    security(("BearerAuth" = []))
)]
#[get("/users/{id}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    _viewer: AuthenticatedUser,
    id: web::Path<i64>,
) -> ApiResult<web::Json<Data<User>>> {
    let user = state.users.get_user(UserId::new(id.into_inner())).await?;
    Ok(web::Json(Data::new(user)))
}

/// Follow the user named in the path.
#[utoipa::path(
    put,
    path = "/v1/users/{id}/follows",
    params(("id" = i64, Path, description = "User to follow")),
    responses(
        (status = 204, description = "Now following"),
        (status = 400, description = "Cannot follow yourself", body = ErrorBody),
        (status = 401, description = "Unauthorised", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody),
        (status = 409, description = "Already following", body = ErrorBody)
    ),
    tags = ["users"],
    operation_id = "followUser",
    security(("BearerAuth" = []))
)]
#[put("/users/{id}/follows")]
pub async fn follow_user(
    state: web::Data<HttpState>,
    follower: AuthenticatedUser,
    id: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .follows
        .follow(follower.id(), UserId::new(id.into_inner()))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Stop following the user named in the path.
#[utoipa::path(
    put,
    path = "/v1/users/{id}/unfollows",
    params(("id" = i64, Path, description = "User to unfollow")),
    responses(
        (status = 204, description = "No longer following"),
        (status = 401, description = "Unauthorised", body = ErrorBody),
        (status = 404, description = "Not following this user", body = ErrorBody)
    ),
    tags = ["users"],
    operation_id = "unfollowUser",
    security(("BearerAuth" = []))
)]
#[put("/users/{id}/unfollows")]
pub async fn unfollow_user(
    state: web::Data<HttpState>,
    follower: AuthenticatedUser,
    id: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .follows
        .unfollow(follower.id(), UserId::new(id.into_inner()))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
