//! Request context carrying the post addressed by `/posts/{id}`.

use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;

use crate::domain::{Error, Post, PostId};

use super::auth::http_state;

/// The post named by the `id` path segment, loaded before the handler runs.
///
/// An unparsable id is a bad request; an unknown one is `404`.
#[derive(Debug, Clone)]
pub struct PostContext(Post);

impl PostContext {
    pub fn post(&self) -> &Post {
        &self.0
    }

    pub fn into_post(self) -> Post {
        self.0
    }
}

fn post_id(req: &HttpRequest) -> Result<PostId, Error> {
    req.match_info()
        .get("id")
        .ok_or_else(|| Error::internal("route has no post id segment"))?
        .parse()
        .map_err(|_| Error::invalid_request("post id must be an integer"))
}

impl FromRequest for PostContext {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = http_state(req);
        let id = post_id(req);
        Box::pin(async move {
            let post = state?.posts.get(id?).await?;
            Ok(Self(post))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PostDraft;
    use crate::domain::ports::PostRepository;
    use crate::inbound::http::test_utils::{signed_in, test_app, test_harness};
    use actix_web::http::StatusCode;
    use actix_web::{HttpResponse, test, web};
    use rstest::rstest;

    #[rstest]
    #[case("/posts/abc", StatusCode::BAD_REQUEST)]
    #[case("/posts/99", StatusCode::NOT_FOUND)]
    #[actix_web::test]
    async fn rejects_bad_or_unknown_ids(#[case] uri: &str, #[case] status: StatusCode) {
        let harness = test_harness();
        let app = test::init_service(test_app(&harness).route(
            "/posts/{id}",
            web::get().to(|_: PostContext| async { HttpResponse::Ok().finish() }),
        ))
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(res.status(), status);
    }

    #[actix_web::test]
    async fn loads_the_addressed_post() {
        let harness = test_harness();
        let (author, _) = signed_in(&harness, "ada").await;
        let draft = PostDraft::new(author.id, "t".into(), "c".into(), vec![])
            .expect("valid draft");
        let post = harness.store.create(&draft).await.expect("post stored");
        let app = test::init_service(test_app(&harness).route(
            "/posts/{id}",
            web::get().to(|ctx: PostContext| async move {
                HttpResponse::Ok().body(ctx.post().title.clone())
            }),
        ))
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/posts/{}", post.id))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "t");
    }
}
