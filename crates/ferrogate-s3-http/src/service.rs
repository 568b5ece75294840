//! The main S3 HTTP service implementing hyper's `Service` trait.
//!
//! [`S3HttpService`] runs every request through the middleware chain
//! described in [`crate::middleware`]:
//!
//! 1. Admission (`SlowDown` when too many requests are in flight)
//! 2. Panic recovery
//! 3. Common response headers (`x-amz-request-id`, `Server`, `Vary`, ...)
//! 4. Health check interception and CORS (preflight answered here)
//! 5. Routing with the resource allow-list, then the function switch
//! 6. Body collection, payload hash check and authentication
//! 7. Operational and access logging around dispatch
//! 8. Request context, website rewriting and dispatch under a deadline

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use ferrogate_s3_auth::Authenticator;
use ferrogate_s3_core::utils::generate_request_id;
use ferrogate_s3_model::error::{S3Error, S3ErrorCode};
use ferrogate_s3_model::request::Identity;
use http_body::Body as _;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::body::S3ResponseBody;
use crate::dispatch::{S3Handler, dispatch_operation};
use crate::middleware::access_log::{AccessLogEntry, AccessLogger, MessageBus};
use crate::middleware::auth::AuthStage;
use crate::middleware::log::RequestLog;
use crate::middleware::rate_limit::RateLimiter;
use crate::middleware::recovery::catch_panic;
use crate::middleware::switch::FunctionSwitch;
use crate::middleware::website::{WebsiteFallback, WebsiteRoute, WebsiteSite, eligible};
use crate::middleware::{common_headers, context, cors};
use crate::response::error_to_response;
use crate::router::{RoutingContext, S3Router};

/// Configuration for the S3 HTTP service.
#[derive(Clone)]
pub struct S3HttpConfig {
    /// Base domains for virtual-hosted-style requests (e.g., `s3.localhost`).
    pub domains: Vec<String>,
    /// Whether to enable virtual-hosted-style bucket addressing.
    pub virtual_hosting: bool,
    /// Accept any credentials without verifying signatures.
    pub skip_signature_validation: bool,
    /// Requests handled at once before answering `SlowDown`; `0` is unbounded.
    pub max_concurrent_requests: usize,
    /// Deadline for one operation.
    pub request_timeout: Duration,
    /// Operation names answered with `NotImplemented`.
    pub disabled_operations: Vec<String>,
    /// Value of `x-amz-id-2`.
    pub host_id: String,
    /// Signature verifier.
    pub authenticator: Arc<Authenticator>,
    /// Identity used for credentialed requests when signatures are skipped.
    pub fallback_identity: Identity,
    /// Destination of access records, if any.
    pub message_bus: Option<Arc<dyn MessageBus>>,
}

impl std::fmt::Debug for S3HttpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3HttpConfig")
            .field("domains", &self.domains)
            .field("virtual_hosting", &self.virtual_hosting)
            .field("skip_signature_validation", &self.skip_signature_validation)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("request_timeout", &self.request_timeout)
            .field("disabled_operations", &self.disabled_operations)
            .field("host_id", &self.host_id)
            .field("message_bus", &self.message_bus.as_ref().map(|_| "..."))
            .finish_non_exhaustive()
    }
}

impl S3HttpConfig {
    /// Defaults around `authenticator`: domain `s3.localhost`, virtual
    /// hosting on, 1000 concurrent requests and a 600 second deadline.
    #[must_use]
    pub fn new(authenticator: Arc<Authenticator>) -> Self {
        Self {
            domains: vec!["s3.localhost".to_owned()],
            virtual_hosting: true,
            skip_signature_validation: false,
            max_concurrent_requests: 1000,
            request_timeout: Duration::from_secs(600),
            disabled_operations: Vec::new(),
            host_id: "ferrogate".to_owned(),
            authenticator,
            fallback_identity: Identity::default(),
            message_bus: None,
        }
    }
}

/// Long-lived state shared by every connection.
#[derive(Debug)]
struct Pipeline {
    router: S3Router,
    limiter: RateLimiter,
    switch: FunctionSwitch,
    auth: AuthStage,
    access_log: AccessLogger,
    host_id: String,
    request_timeout: Duration,
}

/// The S3 HTTP service that implements hyper's `Service` trait.
///
/// # Type Parameters
///
/// - `H`: The business logic handler implementing [`S3Handler`].
#[derive(Debug)]
pub struct S3HttpService<H: S3Handler> {
    handler: Arc<H>,
    pipeline: Arc<Pipeline>,
    remote_addr: Option<SocketAddr>,
}

impl<H: S3Handler> S3HttpService<H> {
    /// Create a new S3 HTTP service with the given handler and configuration.
    #[must_use]
    pub fn new(handler: H, config: S3HttpConfig) -> Self {
        Self::from_shared(Arc::new(handler), config)
    }

    /// Create a new S3 HTTP service from an `Arc<H>` handler and configuration.
    #[must_use]
    pub fn from_shared(handler: Arc<H>, config: S3HttpConfig) -> Self {
        let pipeline = Pipeline {
            router: S3Router::new(config.domains.clone(), config.virtual_hosting),
            limiter: RateLimiter::new(config.max_concurrent_requests),
            switch: FunctionSwitch::from_names(&config.disabled_operations),
            auth: AuthStage::new(
                config.authenticator,
                config.skip_signature_validation,
                config.fallback_identity,
            ),
            access_log: AccessLogger::new(config.message_bus),
            host_id: config.host_id,
            request_timeout: config.request_timeout,
        };
        Self {
            handler,
            pipeline: Arc::new(pipeline),
            remote_addr: None,
        }
    }

    /// A copy of this service bound to one accepted connection.
    #[must_use]
    pub fn for_connection(&self, remote_addr: SocketAddr) -> Self {
        Self {
            remote_addr: Some(remote_addr),
            ..self.clone()
        }
    }
}

impl<H: S3Handler> Clone for S3HttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            pipeline: Arc::clone(&self.pipeline),
            remote_addr: self.remote_addr,
        }
    }
}

impl<H: S3Handler> Service<http::Request<Incoming>> for S3HttpService<H> {
    type Response = http::Response<S3ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.serve(req).await) })
    }
}

impl<H: S3Handler> S3HttpService<H> {
    /// Run one request through the whole chain.
    pub async fn serve<B>(&self, req: http::Request<B>) -> http::Response<S3ResponseBody>
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: std::fmt::Display + Send,
    {
        let request_id = generate_request_id();
        let is_head = req.method() == http::Method::HEAD;

        let mut response = match self.pipeline.limiter.try_acquire() {
            Err(err) => {
                warn!(request_id, "request rejected: too many requests in flight");
                error_to_response(&err, &request_id, is_head)
            }
            Ok(_permit) => match catch_panic(self.process(req, &request_id), &request_id).await {
                Ok(response) => response,
                Err(err) => error_to_response(&err, &request_id, is_head),
            },
        };
        common_headers::apply(&mut response, &request_id, &self.pipeline.host_id);
        response
    }

    /// Health check, CORS and everything inside them.
    async fn process<B>(&self, req: http::Request<B>, request_id: &str) -> http::Response<S3ResponseBody>
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: std::fmt::Display + Send,
    {
        let is_head = req.method() == http::Method::HEAD;
        if is_health_check(req.method(), req.uri().path()) {
            return health_check_response();
        }

        let (bucket, _, _) = self.pipeline.router.locate(&req);
        if req.method() == http::Method::OPTIONS {
            return match cors::parse_preflight(req.headers()) {
                Ok(preflight) => {
                    let config = match bucket {
                        Some(bucket) => self.handler.bucket_cors(bucket).await,
                        None => None,
                    };
                    cors::preflight_response(config.as_ref(), &preflight)
                }
                Err(err) => error_to_response(&err, request_id, false),
            };
        }

        let origin = cors::request_origin(req.headers()).map(str::to_owned);
        let method = req.method().as_str().to_owned();
        let mut response = match self.route_and_handle(req, request_id).await {
            Ok(response) => response,
            Err(err) => error_to_response(&err, request_id, is_head),
        };

        if let (Some(origin), Some(bucket)) = (origin, bucket) {
            let config = self.handler.bucket_cors(bucket).await;
            cors::apply_actual(response.headers_mut(), config.as_ref(), &origin, &method);
        }
        response
    }

    /// Routing, the function switch, body collection and authentication.
    /// Failures here are early exits: nothing is logged to the access log.
    async fn route_and_handle<B>(
        &self,
        req: http::Request<B>,
        request_id: &str,
    ) -> Result<http::Response<S3ResponseBody>, S3Error>
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: std::fmt::Display + Send,
    {
        let routing = self.pipeline.router.resolve(&req).inspect_err(|err| {
            debug!(method = %req.method(), uri = %req.uri(), error = %err, request_id, "failed to route S3 request");
        })?;
        self.pipeline.switch.check(routing.operation)?;

        let (mut parts, incoming) = req.into_parts();
        let body = incoming
            .collect()
            .await
            .map_err(|e| {
                warn!(error = %e, request_id, "failed to collect request body");
                S3Error::with_message(S3ErrorCode::IncompleteBody, "failed to read request body")
            })?
            .to_bytes();
        validate_content_sha256(&parts, &body)?;

        let authenticated = self
            .pipeline
            .auth
            .authenticate(&mut parts, body, &routing, Utc::now())
            .await
            .inspect_err(|err| debug!(error = %err, request_id, "authentication failed"))?;

        Ok(self
            .logged(parts, authenticated.body, routing, authenticated.identity, request_id)
            .await)
    }

    /// Log and access-log stages around context building and dispatch.
    async fn logged(
        &self,
        parts: http::request::Parts,
        body: Bytes,
        routing: RoutingContext,
        identity: Option<Identity>,
        request_id: &str,
    ) -> http::Response<S3ResponseBody> {
        let log = RequestLog::start(&parts, request_id);
        let bytes_received = body.len() as u64;
        let is_head = parts.method == http::Method::HEAD;
        let operation = routing.operation;
        let mut entry = AccessLogEntry {
            time: Utc::now(),
            request_id: request_id.to_owned(),
            operation: operation.as_str().to_owned(),
            bucket: routing.bucket.clone(),
            key: routing.key.clone(),
            method: parts.method.as_str().to_owned(),
            uri: parts.uri.to_string(),
            status: 0,
            error_code: None,
            bytes_received,
            bytes_sent: None,
            total_time_ms: 0,
            requester: identity.as_ref().map(|i| i.user_id.clone()),
            remote_ip: None,
            user_agent: header_string(&parts, "user-agent"),
            referer: header_string(&parts, "referer"),
        };

        let context = context::build(request_id, &parts, &routing, identity, self.remote_addr, &body);
        entry.remote_ip.clone_from(&context.source_ip);

        let response = match self.dispatch(parts, body, routing, context).await {
            Ok(response) => response,
            Err(err) => {
                entry.error_code = Some(err.code.as_str().to_owned());
                error_to_response(&err, request_id, is_head)
            }
        };

        log.finish(operation.as_str(), response.status());
        entry.time = Utc::now();
        entry.status = response.status().as_u16();
        entry.bytes_sent = response.body().size_hint().exact();
        entry.total_time_ms = log.elapsed_ms();
        self.pipeline.access_log.record(entry);
        response
    }

    /// Website rewriting and dispatch under the request deadline.
    async fn dispatch(
        &self,
        parts: http::request::Parts,
        body: Bytes,
        routing: RoutingContext,
        context: ferrogate_s3_model::request::RequestContext,
    ) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let site = match &routing.bucket {
            Some(bucket) if eligible(&parts.method, &routing, context.is_anonymous()) => self
                .handler
                .bucket_website(bucket.clone())
                .await
                .map(|config| WebsiteSite::new(config, &parts)),
            _ => None,
        };
        let Some(site) = site else {
            return self.deadline(parts, body, routing, context).await;
        };

        let routing = match site.route(&routing) {
            WebsiteRoute::Respond(response) => return Ok(response),
            WebsiteRoute::Serve(routing) => routing,
        };
        let err = match self
            .deadline(parts.clone(), Bytes::new(), routing.clone(), context.clone())
            .await
        {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };
        match site.fallback(&routing, err.status_code) {
            Some(WebsiteFallback::Redirect(response)) => Ok(response),
            Some(WebsiteFallback::ErrorDocument(document, status)) => {
                match self.deadline(parts, Bytes::new(), document, context).await {
                    Ok(mut response) => {
                        *response.status_mut() = status;
                        Ok(response)
                    }
                    Err(_) => Err(err),
                }
            }
            None => Err(err),
        }
    }

    async fn deadline(
        &self,
        parts: http::request::Parts,
        body: Bytes,
        routing: RoutingContext,
        context: ferrogate_s3_model::request::RequestContext,
    ) -> Result<http::Response<S3ResponseBody>, S3Error> {
        let request_id = context.request_id.clone();
        tokio::time::timeout(
            self.pipeline.request_timeout,
            dispatch_operation(self.handler.as_ref(), parts, body, routing, context),
        )
        .await
        .unwrap_or_else(|_| {
            warn!(request_id, "request deadline exceeded");
            Err(S3Error::new(S3ErrorCode::RequestTimeout))
        })
    }
}

fn header_string(parts: &http::request::Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Validate the `X-Amz-Content-Sha256` header against the request body.
///
/// Streaming and unsigned placeholders are skipped. Any other value must be
/// the hex SHA-256 of the body.
fn validate_content_sha256(parts: &http::request::Parts, body: &[u8]) -> Result<(), S3Error> {
    let Some(header_value) = parts.headers.get("x-amz-content-sha256") else {
        return Ok(());
    };

    let hash_str = header_value.to_str().map_err(|_| {
        S3Error::with_message(
            S3ErrorCode::XAmzContentSHA256Mismatch,
            "Invalid X-Amz-Content-Sha256 header encoding",
        )
    })?;

    if hash_str == "UNSIGNED-PAYLOAD" || hash_str.starts_with("STREAMING-") {
        return Ok(());
    }

    if hash_str.len() != 64 || !hash_str.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(S3Error::with_message(
            S3ErrorCode::XAmzContentSHA256Mismatch,
            format!("The provided 'x-amz-content-sha256' header is not valid: {hash_str}"),
        ));
    }

    if !hex::encode(Sha256::digest(body)).eq_ignore_ascii_case(hash_str) {
        return Err(S3Error::with_message(
            S3ErrorCode::XAmzContentSHA256Mismatch,
            "The provided 'x-amz-content-sha256' header does not match what was computed",
        ));
    }
    Ok(())
}

/// Check if the request is a health check.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && matches!(path, "/_health" | "/health" | "/healthz")
}

fn health_check_response() -> http::Response<S3ResponseBody> {
    let mut response = http::Response::new(S3ResponseBody::from_string(
        r#"{"status":"running","service":"s3"}"#,
    ));
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}

#[cfg(test)]
mod tests {
    use ferrogate_s3_auth::{Credential, StaticCredentialProvider};
    use ferrogate_s3_model::operations::S3Operation;
    use ferrogate_s3_model::request::RequestContext;
    use ferrogate_s3_model::types::{CorsConfiguration, CorsRule, WebsiteConfiguration};
    use http_body_util::Full;

    use super::*;
    use crate::dispatch::{BoxFuture, HandlerResult};
    use crate::middleware::access_log::ChannelMessageBus;

    /// Serves a fixed website bucket and echoes operations otherwise.
    #[derive(Debug, Default)]
    struct EchoHandler;

    impl S3Handler for EchoHandler {
        fn handle_operation(
            &self,
            op: S3Operation,
            _parts: http::request::Parts,
            _body: Bytes,
            ctx: RoutingContext,
            _context: RequestContext,
        ) -> BoxFuture<HandlerResult> {
            Box::pin(async move {
                match (op, ctx.key.as_deref()) {
                    (S3Operation::GetObject | S3Operation::HeadObject, Some("missing.html")) => {
                        Err(S3Error::new(S3ErrorCode::NoSuchKey))
                    }
                    (S3Operation::GetObject, Some(key)) => {
                        Ok(http::Response::new(S3ResponseBody::from_string(key.to_owned())))
                    }
                    (S3Operation::PutObject, _) => panic!("boom"),
                    _ => Ok(http::Response::new(S3ResponseBody::from_string(op.as_str()))),
                }
            })
        }

        fn bucket_cors(&self, _bucket: String) -> BoxFuture<Option<CorsConfiguration>> {
            Box::pin(async {
                Some(CorsConfiguration {
                    rules: vec![CorsRule {
                        allowed_origins: vec!["https://app.example.com".to_owned()],
                        allowed_methods: vec!["GET".to_owned()],
                        ..CorsRule::default()
                    }],
                })
            })
        }

        fn bucket_website(&self, bucket: String) -> BoxFuture<Option<WebsiteConfiguration>> {
            Box::pin(async move {
                (bucket == "site").then(|| WebsiteConfiguration {
                    index_document_suffix: Some("index.html".to_owned()),
                    error_document_key: Some("404.html".to_owned()),
                    ..WebsiteConfiguration::default()
                })
            })
        }
    }

    fn config() -> S3HttpConfig {
        let provider = StaticCredentialProvider::new(vec![Credential::new("AK", "SK")]);
        let mut config = S3HttpConfig::new(Arc::new(Authenticator::new(Arc::new(provider))));
        config.disabled_operations = vec!["DeleteBucketPolicy".to_owned()];
        config
    }

    fn service() -> S3HttpService<EchoHandler> {
        S3HttpService::new(EchoHandler, config())
    }

    fn request(method: &str, uri: &str, headers: &[(&str, &str)]) -> http::Request<Full<Bytes>> {
        let mut builder = http::Request::builder().method(method).uri(uri);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    async fn body_string(resp: http::Response<S3ResponseBody>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_should_detect_health_check_paths() {
        assert!(is_health_check(&http::Method::GET, "/_health"));
        assert!(is_health_check(&http::Method::GET, "/health"));
        assert!(!is_health_check(&http::Method::POST, "/_health"));
        assert!(!is_health_check(&http::Method::GET, "/mybucket"));
    }

    #[test]
    fn test_should_debug_format_config() {
        let debug_str = format!("{:?}", config());
        assert!(debug_str.contains("S3HttpConfig"));
        assert!(debug_str.contains("s3.localhost"));
    }

    #[tokio::test]
    async fn test_should_answer_health_check_with_common_headers() {
        let resp = service().serve(request("GET", "/_health", &[])).await;
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert!(resp.headers().contains_key("x-amz-request-id"));
        assert_eq!(resp.headers()["server"], common_headers::SERVER_NAME);
    }

    #[tokio::test]
    async fn test_should_dispatch_anonymous_request() {
        let resp = service().serve(request("GET", "/b/hello.txt", &[])).await;
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(body_string(resp).await, "hello.txt");
    }

    #[tokio::test]
    async fn test_should_reject_disabled_operation() {
        let resp = service().serve(request("DELETE", "/b?policy", &[])).await;
        assert_eq!(resp.status(), http::StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_should_reject_unserved_sub_resource() {
        let resp = service().serve(request("GET", "/b?tagging", &[])).await;
        assert_eq!(resp.status(), http::StatusCode::NOT_IMPLEMENTED);
        assert!(body_string(resp).await.contains("<Code>NotImplemented</Code>"));
    }

    #[tokio::test]
    async fn test_should_omit_error_body_for_head() {
        let resp = service().serve(request("HEAD", "/b/missing.html", &[])).await;
        assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);
        assert!(body_string(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_should_convert_panic_into_internal_error() {
        let resp = service().serve(request("PUT", "/b/k", &[])).await;
        assert_eq!(resp.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.headers().contains_key("x-amz-request-id"));
    }

    #[tokio::test]
    async fn test_should_throttle_when_no_slot_is_free() {
        let mut config = config();
        config.max_concurrent_requests = 1;
        let service = S3HttpService::new(EchoHandler, config);
        let _held = service.pipeline.limiter.try_acquire().unwrap();
        let resp = service.serve(request("GET", "/b/k", &[])).await;
        assert_eq!(resp.status(), http::StatusCode::SERVICE_UNAVAILABLE);
        assert!(body_string(resp).await.contains("SlowDown"));
    }

    #[tokio::test]
    async fn test_should_answer_preflight_and_decorate_actual_request() {
        let preflight = request(
            "OPTIONS",
            "/b/k",
            &[("origin", "https://app.example.com"), ("access-control-request-method", "GET")],
        );
        let resp = service().serve(preflight).await;
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(resp.headers()["access-control-allow-origin"], "https://app.example.com");

        let resp = service().serve(request("OPTIONS", "/b/k", &[])).await;
        assert_eq!(resp.status(), http::StatusCode::BAD_REQUEST);

        let actual = request("GET", "/b/k", &[("origin", "https://app.example.com")]);
        let resp = service().serve(actual).await;
        assert_eq!(resp.headers()["access-control-allow-origin"], "https://app.example.com");
        assert!(resp.headers().get_all("vary").iter().any(|v| v == "Origin"));
    }

    #[tokio::test]
    async fn test_should_serve_website_index_and_error_document() {
        let resp = service()
            .serve(request("GET", "/", &[("host", "site.s3.localhost")]))
            .await;
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(body_string(resp).await, "index.html");

        let resp = service()
            .serve(request("GET", "/missing.html", &[("host", "site.s3.localhost")]))
            .await;
        assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);
        assert_eq!(body_string(resp).await, "404.html");
    }

    #[tokio::test]
    async fn test_should_publish_access_record() {
        let (bus, mut rx) = ChannelMessageBus::new(8);
        let mut config = config();
        config.message_bus = Some(Arc::new(bus));
        let service = S3HttpService::new(EchoHandler, config).for_connection("192.0.2.1:4000".parse().unwrap());
        let resp = service.serve(request("GET", "/b/k", &[])).await;
        assert_eq!(resp.status(), http::StatusCode::OK);

        let message = rx.recv().await.unwrap();
        let record: serde_json::Value = serde_json::from_slice(&message.payload).unwrap();
        assert_eq!(record["operation"], "GetObject");
        assert_eq!(record["remote_ip"], "192.0.2.1");
        assert_eq!(record["status"], 200);
    }

    #[tokio::test]
    async fn test_should_reject_forged_signature() {
        let resp = service()
            .serve(request(
                "GET",
                "/b/k",
                &[
                    ("authorization", "AWS4-HMAC-SHA256 Credential=AK/20240101/us-east-1/s3/aws4_request, SignedHeaders=host, Signature=00"),
                    ("x-amz-date", "20240101T000000Z"),
                ],
            ))
            .await;
        assert!(resp.status().is_client_error());
    }

    // -----------------------------------------------------------------------
    // X-Amz-Content-Sha256 validation
    // -----------------------------------------------------------------------

    fn parts_with_sha256(header_value: &str) -> http::request::Parts {
        let (parts, ()) = http::Request::builder()
            .method(http::Method::PUT)
            .uri("/bucket/key")
            .header("x-amz-content-sha256", header_value)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_should_accept_placeholder_content_sha256() {
        assert!(validate_content_sha256(&parts_with_sha256("UNSIGNED-PAYLOAD"), b"hello").is_ok());
        assert!(
            validate_content_sha256(&parts_with_sha256("STREAMING-AWS4-HMAC-SHA256-PAYLOAD"), b"hello")
                .is_ok()
        );
    }

    #[test]
    fn test_should_check_concrete_content_sha256() {
        let hash = hex::encode(Sha256::digest(b"hello"));
        assert!(validate_content_sha256(&parts_with_sha256(&hash), b"hello").is_ok());

        let wrong = hex::encode(Sha256::digest(b"wrong"));
        let err = validate_content_sha256(&parts_with_sha256(&wrong), b"hello").unwrap_err();
        assert_eq!(err.code, S3ErrorCode::XAmzContentSHA256Mismatch);

        let err = validate_content_sha256(&parts_with_sha256("invalid"), b"hello").unwrap_err();
        assert_eq!(err.code, S3ErrorCode::XAmzContentSHA256Mismatch);
    }
}
