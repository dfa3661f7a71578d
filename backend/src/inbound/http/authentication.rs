//! Sign-up and token issuance.
//!
//! ```text
//! POST /v1/authentication/users {"username":"ada","email":"ada@example.com","password":"..."}
//! POST /v1/authentication/token {"email":"ada@example.com","password":"..."}
//! ```

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{CredentialsValidationError, Error, LoginCredentials, Registration, User};

use super::ApiResult;
use super::schemas::{Data, ErrorBody};
use super::state::HttpState;

/// Sign-up request body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "ada")]
    pub username: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    pub password: String,
}

impl TryFrom<RegisterRequest> for Registration {
    type Error = CredentialsValidationError;

    fn try_from(value: RegisterRequest) -> Result<Self, Self::Error> {
        Self::try_from_parts(&value.username, &value.email, value.password)
    }
}

/// A newly registered, still inactive user and its activation token.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisteredUserResponse {
    pub user: User,
    /// Plaintext invitation token; also sent by mail.
    pub token: String,
}

/// Login request body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct TokenRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    pub password: String,
}

impl TryFrom<TokenRequest> for LoginCredentials {
    type Error = CredentialsValidationError;

    fn try_from(value: TokenRequest) -> Result<Self, Self::Error> {
        Self::try_from_parts(&value.email, value.password)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
}

fn invalid(err: CredentialsValidationError) -> Error {
    Error::invalid_request(err.to_string())
}

/// Register a user and send the activation mail.
///
/// The mail is delivered in the background. If every attempt fails the
/// account is removed again.
#[utoipa::path(
    post,
    path = "/v1/authentication/users",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = Data<RegisteredUserResponse>),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 409, description = "Email or username taken", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tags = ["authentication"],
    operation_id = "registerUser",
    security([])
)]
#[post("/authentication/users")]
pub async fn register(
    state: web::Data<HttpState>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<web::Json<Data<RegisteredUserResponse>>> {
    let registration = Registration::try_from(payload.into_inner()).map_err(invalid)?;
    let registered = state.accounts.register(registration).await?;
    Ok(web::Json(Data::new(RegisteredUserResponse {
        user: registered.user,
        token: registered.token.as_str().to_owned(),
    })))
}

/// Exchange credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/v1/authentication/token",
    request_body = TokenRequest,
    responses(
        (status = 201, description = "Token issued", body = Data<TokenResponse>),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tags = ["authentication"],
    operation_id = "createToken",
    security([])
)]
#[post("/authentication/token")]
pub async fn create_token(
    state: web::Data<HttpState>,
    payload: web::Json<TokenRequest>,
) -> ApiResult<HttpResponse> {
    let credentials = LoginCredentials::try_from(payload.into_inner()).map_err(invalid)?;
    let access_token = state.accounts.login(credentials).await?;
    Ok(HttpResponse::Created().json(Data::new(TokenResponse { access_token })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InvitationToken;
    use crate::inbound::http::test_utils::{TEST_PASSWORD, signed_in, test_app, test_harness};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn app_routes(cfg: &mut web::ServiceConfig) {
        cfg.service(web::scope("/v1").service(register).service(create_token));
    }

    #[actix_web::test]
    async fn register_returns_inactive_user_and_token() {
        let harness = test_harness();
        let app = test::init_service(test_app(&harness).configure(app_routes)).await;

        let req = test::TestRequest::post()
            .uri("/v1/authentication/users")
            .set_json(json!({
                "username": "ada",
                "email": "ada@example.com",
                "password": TEST_PASSWORD,
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body: Data<RegisteredUserResponse> = test::read_body_json(res).await;
        assert_eq!(body.data.user.username, "ada");
        assert!(!body.data.user.is_active);
        assert!(!body.data.token.is_empty());

        harness
            .state
            .accounts
            .activate(&InvitationToken::from_plain(body.data.token))
            .await
            .expect("token from the response activates the user");
    }

    #[rstest]
    #[case::short_username(json!({"username": "a", "email": "a@example.com", "password": TEST_PASSWORD}))]
    #[case::bad_email(json!({"username": "ada", "email": "not-an-email", "password": TEST_PASSWORD}))]
    #[case::short_password(json!({"username": "ada", "email": "ada@example.com", "password": "short"}))]
    #[case::missing_field(json!({"username": "ada", "email": "ada@example.com"}))]
    #[actix_web::test]
    async fn register_rejects_invalid_input(#[case] payload: Value) {
        let harness = test_harness();
        let app = test::init_service(test_app(&harness).configure(app_routes)).await;

        let req = test::TestRequest::post()
            .uri("/v1/authentication/users")
            .set_json(payload)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn duplicate_email_conflicts() {
        let harness = test_harness();
        signed_in(&harness, "ada").await;
        let app = test::init_service(test_app(&harness).configure(app_routes)).await;

        let req = test::TestRequest::post()
            .uri("/v1/authentication/users")
            .set_json(json!({
                "username": "ada2",
                "email": "ada@example.com",
                "password": TEST_PASSWORD,
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn token_is_issued_for_active_users() {
        let harness = test_harness();
        signed_in(&harness, "ada").await;
        let app = test::init_service(test_app(&harness).configure(app_routes)).await;

        let req = test::TestRequest::post()
            .uri("/v1/authentication/token")
            .set_json(json!({"email": "ada@example.com", "password": TEST_PASSWORD}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Data<TokenResponse> = test::read_body_json(res).await;
        assert_eq!(body.data.access_token.split('.').count(), 3);
    }

    #[rstest]
    #[case::wrong_password("ada@example.com", "wrong password")]
    #[case::unknown_email("bob@example.com", TEST_PASSWORD)]
    #[actix_web::test]
    async fn token_rejects_bad_credentials(#[case] email: &str, #[case] password: &str) {
        let harness = test_harness();
        signed_in(&harness, "ada").await;
        let app = test::init_service(test_app(&harness).configure(app_routes)).await;

        let req = test::TestRequest::post()
            .uri("/v1/authentication/token")
            .set_json(json!({"email": email, "password": password}))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "invalid credentials");
    }

    #[actix_web::test]
    async fn inactive_users_cannot_log_in() {
        let harness = test_harness();
        let app = test::init_service(test_app(&harness).configure(app_routes)).await;

        let register_req = test::TestRequest::post()
            .uri("/v1/authentication/users")
            .set_json(json!({
                "username": "ada",
                "email": "ada@example.com",
                "password": TEST_PASSWORD,
            }))
            .to_request();
        assert_eq!(test::call_service(&app, register_req).await.status(), StatusCode::OK);

        let login = test::TestRequest::post()
            .uri("/v1/authentication/token")
            .set_json(json!({"email": "ada@example.com", "password": TEST_PASSWORD}))
            .to_request();
        assert_eq!(
            test::call_service(&app, login).await.status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
