//! Per-client rate limiting middleware.
//!
//! Charges each request to the client IP through [`ClientRateLimiter`]. The
//! client is the socket peer unless the limiter trusts a fronting proxy, in
//! which case `Forwarded` or `X-Forwarded-For` names it. Denied requests
//! receive `429 Too Many Requests` with a `Retry-After` header in whole
//! seconds and never reach the handler.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderValue, RETRY_AFTER};
use actix_web::{Error, HttpResponse};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use governor::clock::{Clock, DefaultClock};
use tracing::{debug, warn};

use crate::domain::Error as DomainError;
use crate::rate_limit::{ClientRateLimiter, Decision};

/// Rate limiting middleware. A disabled instance passes everything through.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use actix_web::App;
/// use murmur::middleware::RateLimit;
/// use murmur::rate_limit::{ClientRateLimiter, RateLimitPolicy};
///
/// let limiter = Arc::new(ClientRateLimiter::new(RateLimitPolicy::default()));
/// let app = App::new().wrap(RateLimit::new(limiter));
/// ```
pub struct RateLimit<C: Clock = DefaultClock> {
    limiter: Option<Arc<ClientRateLimiter<C>>>,
    trust_proxy: bool,
}

impl<C: Clock> Clone for RateLimit<C> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
            trust_proxy: self.trust_proxy,
        }
    }
}

impl<C: Clock> RateLimit<C> {
    pub fn new(limiter: Arc<ClientRateLimiter<C>>) -> Self {
        Self {
            limiter: Some(limiter),
            trust_proxy: false,
        }
    }

    pub fn disabled() -> Self {
        Self {
            limiter: None,
            trust_proxy: false,
        }
    }

    /// Key buckets on the forwarded client address instead of the peer.
    ///
    /// Only enable this behind a proxy that overwrites the forwarding
    /// headers; otherwise clients can pick their own bucket.
    #[must_use]
    pub fn trust_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }
}

/// Parse `203.0.113.9`, `203.0.113.9:443` or `[2001:db8::1]:443`.
fn parse_client_ip(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

fn client_ip(req: &ServiceRequest, trust_proxy: bool) -> Option<IpAddr> {
    if trust_proxy {
        let forwarded = req
            .connection_info()
            .realip_remote_addr()
            .and_then(parse_client_ip);
        if forwarded.is_some() {
            return forwarded;
        }
    }
    req.peer_addr().map(|peer| peer.ip())
}

/// Round up so clients never retry before a token is available.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

fn limited_response(retry_after: Duration) -> HttpResponse {
    let mut response = HttpResponse::from_error(DomainError::rate_limited("rate limit exceeded"));
    response.headers_mut().insert(
        RETRY_AFTER,
        HeaderValue::from(retry_after_secs(retry_after)),
    );
    response
}

impl<S, B, C> Transform<S, ServiceRequest> for RateLimit<C>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    C: Clock + Clone + Send + Sync + 'static,
    C::Instant: Send + Sync,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S, C>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service,
            limiter: self.limiter.clone(),
            trust_proxy: self.trust_proxy,
        }))
    }
}

/// Service wrapper produced by [`RateLimit`].
pub struct RateLimitMiddleware<S, C: Clock> {
    service: S,
    limiter: Option<Arc<ClientRateLimiter<C>>>,
    trust_proxy: bool,
}

impl<S, C: Clock> RateLimitMiddleware<S, C>
where
    C: Clone + Send + Sync + 'static,
    C::Instant: Send + Sync,
{
    fn denial(&self, req: &ServiceRequest) -> Option<Duration> {
        let limiter = self.limiter.as_ref()?;
        let Some(client) = client_ip(req, self.trust_proxy) else {
            debug!("request without a client address is not rate limited");
            return None;
        };
        match limiter.check(client) {
            Decision::Allowed => None,
            Decision::Limited { retry_after } => {
                warn!(%client, path = req.path(), "rate limit exceeded");
                Some(retry_after)
            }
        }
    }
}

impl<S, B, C> Service<ServiceRequest> for RateLimitMiddleware<S, C>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    C: Clock + Clone + Send + Sync + 'static,
    C::Instant: Send + Sync,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(retry_after) = self.denial(&req) {
            let res = req
                .into_response(limited_response(retry_after))
                .map_into_right_body();
            return Box::pin(ready(Ok(res)));
        }
        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}
