//! Server construction and middleware wiring.

mod config;
#[cfg(feature = "metrics")]
mod metrics;
mod state_builders;

pub use config::{AllowedOrigin, BuildMode, ConfigError, ServerConfig};
#[cfg(feature = "metrics")]
pub use metrics::{initialize_metrics, make_metrics};
pub use state_builders::build_http_state;

use std::net::SocketAddr;

use actix_cors::Cors;
use actix_web::body::{BoxBody, EitherBody};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::header::{self, HeaderName};
use actix_web::http::Method;
use actix_web::{App, HttpServer, web};
#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;
#[cfg(feature = "metrics")]
use metrics::MetricsLayer;

#[cfg(debug_assertions)]
use murmur::doc::ApiDoc;
use murmur::domain::TRACE_ID_HEADER;
use murmur::inbound::http::health::{HealthState, live, ready};
use murmur::inbound::http::state::HttpState;
use murmur::inbound::http::{configure_api, configure_extractors};
use murmur::middleware::{RateLimit, Trace};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Shared pieces cloned into every worker's `App`.
#[derive(Clone)]
pub struct AppDependencies {
    pub health_state: web::Data<HealthState>,
    pub http_state: web::Data<HttpState>,
    pub rate_limit: RateLimit,
    pub allowed_origin: AllowedOrigin,
    #[cfg(feature = "metrics")]
    pub metrics: Option<PrometheusMetrics>,
}

/// Seconds browsers may cache a preflight response.
const CORS_MAX_AGE: usize = 300;

fn cors(origin: &AllowedOrigin) -> Cors {
    let cors = match origin {
        AllowedOrigin::Any => Cors::default().allow_any_origin(),
        AllowedOrigin::Exact(origin) => Cors::default().allowed_origin(origin),
    };
    cors.allowed_methods([
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ])
    .allowed_headers([
        header::ACCEPT,
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        HeaderName::from_static("x-csrf-token"),
    ])
    .expose_headers([header::LINK, HeaderName::from_static(TRACE_ID_HEADER)])
    .max_age(CORS_MAX_AGE)
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<EitherBody<EitherBody<BoxBody>>>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        rate_limit,
        allowed_origin,
        ..
    } = deps;

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .configure(configure_extractors)
        .wrap(rate_limit)
        .wrap(cors(&allowed_origin))
        // Outermost, so throttled requests still carry a trace id.
        .wrap(Trace)
        .configure(configure_api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Bind an Actix HTTP server on `bind_addr`.
///
/// Readiness is left to the caller, which marks the health state once the
/// returned [`Server`] is being driven.
///
/// # Errors
///
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(deps: AppDependencies, bind_addr: SocketAddr) -> std::io::Result<Server> {
    #[cfg(feature = "metrics")]
    let metrics_layer = MetricsLayer::from_option(deps.metrics.clone());

    let server = HttpServer::new(move || {
        let app = build_app(deps.clone());

        #[cfg(feature = "metrics")]
        let app = app.wrap(metrics_layer.clone());

        app
    })
    .bind(bind_addr)?
    .run();
    Ok(server)
}
