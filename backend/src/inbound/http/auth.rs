//! Bearer authentication for HTTP handlers.
//!
//! [`AuthenticatedUser`] validates the `Authorization: Bearer <jwt>` header,
//! then loads the subject through the cache-aside user lookup. Handlers that
//! take it as an argument are unreachable without a valid token for an active
//! user.

use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;
use tracing::debug;

use crate::domain::{Error, ErrorCode, User, UserId};

use super::state::HttpState;

/// The user behind a validated bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(User);

impl AuthenticatedUser {
    pub fn user(&self) -> &User {
        &self.0
    }

    pub fn id(&self) -> UserId {
        self.0.id
    }
}

fn bearer_token(req: &HttpRequest) -> Result<String, Error> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| Error::unauthorized("authorization header is missing"))?;
    let malformed = || Error::unauthorized("authorization header is malformed");
    let value = value.to_str().map_err(|_| malformed())?;
    let (scheme, token) = value.split_once(' ').ok_or_else(malformed)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(malformed());
    }
    Ok(token.to_owned())
}

pub(crate) fn http_state(req: &HttpRequest) -> Result<web::Data<HttpState>, Error> {
    req.app_data::<web::Data<HttpState>>()
        .cloned()
        .ok_or_else(|| Error::internal("HTTP state is not registered"))
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = http_state(req);
        let token = bearer_token(req);
        Box::pin(async move {
            let state = state?;
            let user_id = state.accounts.authenticate(&token?)?;
            let user = state.users.get_user(user_id).await.map_err(|err| {
                if err.code() == ErrorCode::NotFound {
                    debug!(%user_id, "token subject is unknown or inactive");
                    Error::unauthorized("invalid or expired token")
                } else {
                    err
                }
            })?;
            Ok(Self(user))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::{test_app, test_harness};
    use actix_web::http::StatusCode;
    use actix_web::HttpResponse;
    use actix_web::test as actix_test;
    use rstest::rstest;

    #[rstest]
    #[case::bearer("Bearer abc", Some("abc"))]
    #[case::lowercase("bearer  abc ", Some("abc"))]
    #[case::basic("Basic abc", None)]
    #[case::no_token("Bearer ", None)]
    #[case::no_scheme("abc", None)]
    fn parses_bearer_header(#[case] header_value: &str, #[case] expected: Option<&str>) {
        let req = actix_test::TestRequest::default()
            .insert_header((header::AUTHORIZATION, header_value))
            .to_http_request();
        assert_eq!(bearer_token(&req).ok().as_deref(), expected);
    }

    #[actix_web::test]
    async fn missing_header_is_unauthorised() {
        let harness = test_harness();
        let app = actix_test::init_service(test_app(&harness).route(
            "/me",
            web::get().to(|user: AuthenticatedUser| async move {
                HttpResponse::Ok().body(user.user().username.clone())
            }),
        ))
        .await;

        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/me").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = actix_test::read_body_json(res).await;
        assert_eq!(body["error"], "authorization header is missing");
    }

    #[actix_web::test]
    async fn forged_token_is_unauthorised() {
        let harness = test_harness();
        let app = actix_test::init_service(test_app(&harness).route(
            "/me",
            web::get().to(|_: AuthenticatedUser| async { HttpResponse::Ok().finish() }),
        ))
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/me")
            .insert_header((header::AUTHORIZATION, "Bearer not.a.jwt"))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
