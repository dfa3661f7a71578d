//! Post handlers.
//!
//! Updates are version checked: a client may pin the version it last read,
//! and a write against a stale version fails with `409 Conflict`.
//!
//! ```text
//! POST   /v1/posts {"title":"hello","content":"world","tags":["intro"]}
//! GET    /v1/posts/{id}
//! PATCH  /v1/posts/{id} {"title":"hello again","version":0}
//! DELETE /v1/posts/{id}
//! POST   /v1/posts/{id}/comments {"content":"nice"}
//! ```

use actix_web::{HttpResponse, delete, get, patch, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Comment, CommentDraft, Error, Post, PostAction, PostDraft, PostPatch, PostWithComments,
};

use super::ApiResult;
use super::auth::AuthenticatedUser;
use super::post_context::PostContext;
use super::schemas::{Data, ErrorBody};
use super::state::HttpState;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreatePostRequest {
    #[schema(example = "hello")]
    pub title: String,
    #[schema(example = "first post")]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update. Omitted fields keep their value.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    /// Version the client last read. Defaults to the current version.
    pub version: Option<i32>,
}

impl From<UpdatePostRequest> for PostPatch {
    fn from(value: UpdatePostRequest) -> Self {
        Self {
            title: value.title,
            content: value.content,
            tags: value.tags,
            expected_version: value.version,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateCommentRequest {
    #[schema(example = "nice post")]
    pub content: String,
}

fn invalid<E: std::fmt::Display>(err: E) -> Error {
    Error::invalid_request(err.to_string())
}

/// Publish a post as the caller.
#[utoipa::path(
    post,
    path = "/v1/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = Data<Post>),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 401, description = "Unauthorised", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tags = ["posts"],
    operation_id = "createPost",
    security(("BearerAuth" = []))
)]
#[post("/posts")]
pub async fn create_post(
    state: web::Data<HttpState>,
    author: AuthenticatedUser,
    payload: web::Json<CreatePostRequest>,
) -> ApiResult<HttpResponse> {
    let CreatePostRequest {
        title,
        content,
        tags,
    } = payload.into_inner();
    let draft = PostDraft::new(author.id(), title, content, tags).map_err(invalid)?;
    let post = state.posts.create(draft).await?;
    Ok(HttpResponse::Created().json(Data::new(post)))
}

/// Fetch a post with its comments, newest comment first.
#[utoipa::path(
    get,
    path = "/v1/posts/{id}",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post with comments", body = Data<PostWithComments>),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 401, description = "Unauthorised", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    tags = ["posts"],
    operation_id = "getPost",
    security(("BearerAuth" = []))
)]
#[get("/posts/{id}")]
pub async fn get_post(
    state: web::Data<HttpState>,
    _viewer: AuthenticatedUser,
    post: PostContext,
) -> ApiResult<web::Json<Data<PostWithComments>>> {
    let post = state.posts.with_comments(post.into_post()).await?;
    Ok(web::Json(Data::new(post)))
}

/// Update a post. Allowed for its author and for moderators and above.
#[utoipa::path(
    patch,
    path = "/v1/posts/{id}",
    params(("id" = i64, Path, description = "Post id")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated post", body = Data<Post>),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 401, description = "Unauthorised", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 409, description = "Version conflict", body = ErrorBody)
    ),
    tags = ["posts"],
    operation_id = "updatePost",
    security(("BearerAuth" = []))
)]
#[patch("/posts/{id}")]
pub async fn update_post(
    state: web::Data<HttpState>,
    editor: AuthenticatedUser,
    post: PostContext,
    payload: web::Json<UpdatePostRequest>,
) -> ApiResult<web::Json<Data<Post>>> {
    state
        .access
        .authorize(editor.user(), post.post(), PostAction::Update)
        .await?;
    let patch = PostPatch::from(payload.into_inner());
    patch.validate().map_err(invalid)?;
    let updated = state.posts.update(post.post(), patch).await?;
    Ok(web::Json(Data::new(updated)))
}

/// Delete a post. Allowed for its author and for admins.
#[utoipa::path(
    delete,
    path = "/v1/posts/{id}",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 401, description = "Unauthorised", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    tags = ["posts"],
    operation_id = "deletePost",
    security(("BearerAuth" = []))
)]
#[delete("/posts/{id}")]
pub async fn delete_post(
    state: web::Data<HttpState>,
    caller: AuthenticatedUser,
    post: PostContext,
) -> ApiResult<HttpResponse> {
    state
        .access
        .authorize(caller.user(), post.post(), PostAction::Delete)
        .await?;
    state.posts.delete(post.post().id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Comment on a post as the caller.
#[utoipa::path(
    post,
    path = "/v1/posts/{id}/comments",
    params(("id" = i64, Path, description = "Post id")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = Data<Comment>),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 401, description = "Unauthorised", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    tags = ["posts"],
    operation_id = "createComment",
    security(("BearerAuth" = []))
)]
#[post("/posts/{id}/comments")]
pub async fn create_comment(
    state: web::Data<HttpState>,
    author: AuthenticatedUser,
    post: PostContext,
    payload: web::Json<CreateCommentRequest>,
) -> ApiResult<HttpResponse> {
    let draft = CommentDraft::new(post.post().id, author.id(), payload.into_inner().content)
        .map_err(invalid)?;
    let comment = state.posts.comment(draft).await?;
    Ok(HttpResponse::Created().json(Data::new(comment)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::authentication::{
        RegisteredUserResponse, TokenResponse, create_token, register,
    };
    use crate::inbound::http::test_utils::{
        TEST_PASSWORD, TestHarness, bearer, signed_in, test_app, test_harness,
    };
    use crate::inbound::http::users::activate_user;
    use actix_http::Request;
    use actix_web::dev::{Service, ServiceResponse};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn app_routes(cfg: &mut web::ServiceConfig) {
        cfg.service(
            web::scope("/v1")
                .service(register)
                .service(create_token)
                .service(activate_user)
                .service(create_post)
                .service(get_post)
                .service(update_post)
                .service(delete_post)
                .service(create_comment),
        );
    }

    async fn seed_post(harness: &TestHarness, author: &crate::domain::User) -> Post {
        let draft = PostDraft::new(
            author.id,
            "hello".to_owned(),
            "world".to_owned(),
            vec!["intro".to_owned()],
        )
        .expect("valid draft");
        harness.state.posts.create(draft).await.expect("post created")
    }

    async fn send<S>(app: &S, req: Request) -> (StatusCode, Value)
    where
        S: Service<Request, Response = ServiceResponse, Error = actix_web::Error>,
    {
        let res = test::call_service(app, req).await;
        let status = res.status();
        let bytes = test::read_body(res).await;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        (status, body)
    }

    #[actix_web::test]
    async fn register_login_publish_and_edit_with_versions() {
        let harness = test_harness();
        let app = test::init_service(test_app(&harness).configure(app_routes)).await;

        let (status, body) = send(
            &app,
            test::TestRequest::post()
                .uri("/v1/authentication/users")
                .set_json(json!({
                    "username": "ada",
                    "email": "ada@example.com",
                    "password": TEST_PASSWORD,
                }))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let registered: Data<RegisteredUserResponse> =
            serde_json::from_value(body).expect("registration body");

        let (status, _) = send(
            &app,
            test::TestRequest::put()
                .uri(&format!("/v1/users/activate/{}", registered.data.token))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(
            &app,
            test::TestRequest::post()
                .uri("/v1/authentication/token")
                .set_json(json!({"email": "ada@example.com", "password": TEST_PASSWORD}))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let token: Data<TokenResponse> = serde_json::from_value(body).expect("token body");
        let auth = bearer(&token.data.access_token);

        let (status, body) = send(
            &app,
            test::TestRequest::post()
                .uri("/v1/posts")
                .insert_header(auth.clone())
                .set_json(json!({"title": "hello", "content": "world", "tags": ["intro"]}))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["version"], 0);
        let post_id = body["data"]["id"].as_i64().expect("post id");
        let uri = format!("/v1/posts/{post_id}");

        let (status, body) = send(
            &app,
            test::TestRequest::patch()
                .uri(&uri)
                .insert_header(auth.clone())
                .set_json(json!({"title": "hello again", "version": 0}))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["version"], 1);
        assert_eq!(body["data"]["title"], "hello again");
        assert_eq!(body["data"]["content"], "world");

        let (status, body) = send(
            &app,
            test::TestRequest::patch()
                .uri(&uri)
                .insert_header(auth)
                .set_json(json!({"title": "lost update", "version": 0}))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn update_without_version_uses_the_current_one() {
        let harness = test_harness();
        let (ada, token) = signed_in(&harness, "ada").await;
        let post = seed_post(&harness, &ada).await;
        let app = test::init_service(test_app(&harness).configure(app_routes)).await;

        for expected in [1, 2] {
            let (status, body) = send(
                &app,
                test::TestRequest::patch()
                    .uri(&format!("/v1/posts/{}", post.id))
                    .insert_header(bearer(&token))
                    .set_json(json!({"content": format!("v{expected}")}))
                    .to_request(),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["data"]["version"], expected);
        }
    }

    #[rstest]
    #[case::blank_title(json!({"title": " "}))]
    #[case::long_content(json!({"content": "x".repeat(256)}))]
    #[case::long_tag(json!({"tags": ["t".repeat(101)]}))]
    #[actix_web::test]
    async fn update_validates_present_fields(#[case] payload: Value) {
        let harness = test_harness();
        let (ada, token) = signed_in(&harness, "ada").await;
        let post = seed_post(&harness, &ada).await;
        let app = test::init_service(test_app(&harness).configure(app_routes)).await;

        let (status, _) = send(
            &app,
            test::TestRequest::patch()
                .uri(&format!("/v1/posts/{}", post.id))
                .insert_header(bearer(&token))
                .set_json(payload)
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[rstest]
    #[case::plain_user_update("user", "PATCH", StatusCode::FORBIDDEN)]
    #[case::moderator_update("moderator", "PATCH", StatusCode::OK)]
    #[case::moderator_delete("moderator", "DELETE", StatusCode::FORBIDDEN)]
    #[case::admin_delete("admin", "DELETE", StatusCode::NO_CONTENT)]
    #[actix_web::test]
    async fn non_authors_need_an_elevated_role(
        #[case] role: &str,
        #[case] method: &str,
        #[case] expected: StatusCode,
    ) {
        let harness = test_harness();
        let (ada, _) = signed_in(&harness, "ada").await;
        let (bob, bob_token) = signed_in(&harness, "bob").await;
        assert!(harness.store.set_user_role(bob.id, role));
        let post = seed_post(&harness, &ada).await;
        let app = test::init_service(test_app(&harness).configure(app_routes)).await;

        let uri = format!("/v1/posts/{}", post.id);
        let req = match method {
            "PATCH" => test::TestRequest::patch()
                .uri(&uri)
                .set_json(json!({"title": "moderated"})),
            _ => test::TestRequest::delete().uri(&uri),
        };
        let (status, _) = send(&app, req.insert_header(bearer(&bob_token)).to_request()).await;
        assert_eq!(status, expected);
    }

    #[actix_web::test]
    async fn author_can_delete_and_post_is_gone() {
        let harness = test_harness();
        let (ada, token) = signed_in(&harness, "ada").await;
        let post = seed_post(&harness, &ada).await;
        let app = test::init_service(test_app(&harness).configure(app_routes)).await;
        let uri = format!("/v1/posts/{}", post.id);

        let (status, _) = send(
            &app,
            test::TestRequest::delete()
                .uri(&uri)
                .insert_header(bearer(&token))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(
            &app,
            test::TestRequest::get()
                .uri(&uri)
                .insert_header(bearer(&token))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn comments_are_listed_with_the_post() {
        let harness = test_harness();
        let (ada, ada_token) = signed_in(&harness, "ada").await;
        let (_, bob_token) = signed_in(&harness, "bob").await;
        let post = seed_post(&harness, &ada).await;
        let app = test::init_service(test_app(&harness).configure(app_routes)).await;
        let uri = format!("/v1/posts/{}", post.id);

        let (status, body) = send(
            &app,
            test::TestRequest::post()
                .uri(&format!("{uri}/comments"))
                .insert_header(bearer(&bob_token))
                .set_json(json!({"content": "nice"}))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["author"]["username"], "bob");

        let (status, body) = send(
            &app,
            test::TestRequest::get()
                .uri(&uri)
                .insert_header(bearer(&ada_token))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "hello");
        assert_eq!(body["data"]["comments"][0]["content"], "nice");
    }

    #[actix_web::test]
    async fn comment_on_missing_post_is_not_found() {
        let harness = test_harness();
        let (_, token) = signed_in(&harness, "ada").await;
        let app = test::init_service(test_app(&harness).configure(app_routes)).await;

        let (status, _) = send(
            &app,
            test::TestRequest::post()
                .uri("/v1/posts/404/comments")
                .insert_header(bearer(&token))
                .set_json(json!({"content": "hello?"}))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn create_requires_a_token() {
        let harness = test_harness();
        let app = test::init_service(test_app(&harness).configure(app_routes)).await;

        let (status, body) = send(
            &app,
            test::TestRequest::post()
                .uri("/v1/posts")
                .set_json(json!({"title": "t", "content": "c"}))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }
}
