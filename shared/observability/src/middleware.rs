//! Request logging middleware.
//!
//! Each request gets an id (taken from `x-request-id` or freshly generated),
//! runs inside an `http_request` span and is logged on completion with its
//! status and latency. The id is echoed back in the response headers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    time::Instant,
};
use tracing::{error, info, span, warn, Instrument, Level};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request id stored in the request extensions for handlers that want it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

#[derive(Debug, Clone)]
pub struct RequestLoggingConfig {
    pub service_name: String,
    /// Path prefixes that are passed through without logging
    pub exclude_paths: Vec<String>,
    pub slow_request_threshold_ms: u64,
}

impl Default for RequestLoggingConfig {
    fn default() -> Self {
        Self {
            service_name: "kgviz".to_string(),
            exclude_paths: vec!["/health".to_string(), "/favicon.ico".to_string()],
            slow_request_threshold_ms: 1000,
        }
    }
}

impl RequestLoggingConfig {
    pub fn for_service(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            ..Default::default()
        }
    }

    fn is_excluded(&self, path: &str) -> bool {
        self.exclude_paths.iter().any(|p| path.starts_with(p.as_str()))
    }
}

#[derive(Clone)]
pub struct RequestLogging {
    config: RequestLoggingConfig,
}

impl RequestLogging {
    pub fn new(config: RequestLoggingConfig) -> Self {
        Self { config }
    }

    pub fn for_service(name: impl Into<String>) -> Self {
        Self::new(RequestLoggingConfig::for_service(name))
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLogging
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggingService {
            service: Rc::new(service),
            config: self.config.clone(),
        }))
    }
}

pub struct RequestLoggingService<S> {
    service: Rc<S>,
    config: RequestLoggingConfig,
}

impl<S, B> Service<ServiceRequest> for RequestLoggingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let config = self.config.clone();
        let service = self.service.clone();

        Box::pin(async move {
            let path = req.path().to_string();
            let method = req.method().to_string();

            if config.is_excluded(&path) {
                return service.call(req).await;
            }

            let request_id = req
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|h| h.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            req.extensions_mut().insert(RequestId(request_id.clone()));

            let request_span = span!(
                Level::INFO,
                "http_request",
                request_id = %request_id,
                method = %method,
                path = %path,
                service = %config.service_name,
            );

            let start = Instant::now();
            let result = service.call(req).instrument(request_span).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(mut res) => {
                    let status = res.status().as_u16();

                    if status >= 500 {
                        error!(request_id = %request_id, status, duration_ms, "{} {} {} {}ms", method, path, status, duration_ms);
                    } else if status >= 400 {
                        warn!(request_id = %request_id, status, duration_ms, "{} {} {} {}ms", method, path, status, duration_ms);
                    } else if duration_ms > config.slow_request_threshold_ms {
                        warn!(request_id = %request_id, status, duration_ms, "SLOW {} {} {} {}ms", method, path, status, duration_ms);
                    } else {
                        info!(request_id = %request_id, status, duration_ms, "{} {} {} {}ms", method, path, status, duration_ms);
                    }

                    if let Ok(value) = HeaderValue::from_str(&request_id) {
                        res.headers_mut()
                            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                    }
                    Ok(res)
                }
                Err(e) => {
                    error!(request_id = %request_id, duration_ms, error = %e, "{} {} failed after {}ms", method, path, duration_ms);
                    Err(e)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpRequest, HttpResponse};

    async fn echo_id(req: HttpRequest) -> HttpResponse {
        let id = req
            .extensions()
            .get::<RequestId>()
            .map(|r| r.0.clone())
            .unwrap_or_default();
        HttpResponse::Ok().body(id)
    }

    #[actix_web::test]
    async fn test_request_id_is_generated_and_echoed() {
        let app = test::init_service(
            App::new()
                .wrap(RequestLogging::for_service("test"))
                .route("/ping", web::get().to(echo_id)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        let header = res
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .unwrap();
        let body = test::read_body(res).await;
        assert_eq!(body, header.as_bytes());
        assert!(Uuid::parse_str(&header).is_ok());
    }

    #[actix_web::test]
    async fn test_incoming_request_id_is_kept() {
        let app = test::init_service(
            App::new()
                .wrap(RequestLogging::for_service("test"))
                .route("/ping", web::get().to(echo_id)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/ping")
            .insert_header((REQUEST_ID_HEADER, "abc-123"))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "abc-123".as_bytes());
    }

    #[actix_web::test]
    async fn test_excluded_paths_skip_request_id() {
        let app = test::init_service(
            App::new()
                .wrap(RequestLogging::for_service("test"))
                .route("/health", web::get().to(echo_id)),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert!(res.headers().get(REQUEST_ID_HEADER).is_none());
    }
}
