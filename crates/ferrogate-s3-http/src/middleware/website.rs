//! Static website hosting for anonymous virtual-host reads.
//!
//! A request qualifies when it is anonymous, addresses its bucket through the
//! `Host` header, reads (`GET`/`HEAD`) an object or the bucket root without
//! sub-resources, and the bucket has a website configuration. The request is
//! then either redirected or rewritten to read the resolved key; a 403/404
//! from that read may be turned into the error document.

use ferrogate_s3_core::website::{RequestOrigin, WebsiteAction, on_error, resolve};
use ferrogate_s3_model::operations::S3Operation;
use ferrogate_s3_model::types::WebsiteConfiguration;
use http::{HeaderValue, Method, StatusCode};

use crate::body::S3ResponseBody;
use crate::router::RoutingContext;

/// Outcome of website routing.
#[derive(Debug)]
pub enum WebsiteRoute {
    /// Answer immediately with this response.
    Respond(http::Response<S3ResponseBody>),
    /// Continue with this rewritten routing context.
    Serve(RoutingContext),
}

/// Outcome of website error handling.
#[derive(Debug)]
pub enum WebsiteFallback {
    /// Answer with this redirect.
    Redirect(http::Response<S3ResponseBody>),
    /// Read this routing context and send it with `status`.
    ErrorDocument(RoutingContext, StatusCode),
}

/// Whether a request is eligible for website handling.
#[must_use]
pub fn eligible(method: &Method, routing: &RoutingContext, anonymous: bool) -> bool {
    if !anonymous || !routing.virtual_host || routing.bucket.is_none() {
        return false;
    }
    if *method != Method::GET && *method != Method::HEAD {
        return false;
    }
    match routing.operation {
        S3Operation::GetObject | S3Operation::HeadObject => true,
        S3Operation::ListObjects | S3Operation::HeadBucket => routing.query_params.is_empty(),
        _ => false,
    }
}

/// A website-enabled bucket serving one request.
#[derive(Debug, Clone)]
pub struct WebsiteSite {
    config: WebsiteConfiguration,
    host: String,
    scheme: String,
    head: bool,
}

impl WebsiteSite {
    /// Bind `config` to the request's host and scheme.
    #[must_use]
    pub fn new(config: WebsiteConfiguration, parts: &http::request::Parts) -> Self {
        let host = parts
            .headers
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let scheme = parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .filter(|p| p.eq_ignore_ascii_case("https"))
            .map_or("http", |_| "https")
            .to_owned();
        Self {
            config,
            host,
            scheme,
            head: parts.method == Method::HEAD,
        }
    }

    fn origin(&self) -> RequestOrigin<'_> {
        RequestOrigin {
            host: &self.host,
            scheme: &self.scheme,
        }
    }

    fn read(&self, routing: &RoutingContext, key: String) -> RoutingContext {
        RoutingContext {
            bucket: routing.bucket.clone(),
            key: Some(key),
            operation: if self.head {
                S3Operation::HeadObject
            } else {
                S3Operation::GetObject
            },
            query_params: Vec::new(),
            virtual_host: true,
        }
    }

    /// Route a request before it reaches storage.
    #[must_use]
    pub fn route(&self, routing: &RoutingContext) -> WebsiteRoute {
        let key = routing.key.as_deref().unwrap_or_default();
        match resolve(&self.config, key, self.origin()) {
            WebsiteAction::Redirect { location, status } => {
                WebsiteRoute::Respond(redirect(&location, status))
            }
            WebsiteAction::Serve(key) | WebsiteAction::ErrorDocument { key, .. } => {
                WebsiteRoute::Serve(self.read(routing, key))
            }
        }
    }

    /// Handle a failed read of `routing` with `status`.
    #[must_use]
    pub fn fallback(&self, routing: &RoutingContext, status: StatusCode) -> Option<WebsiteFallback> {
        let key = routing.key.as_deref().unwrap_or_default();
        match on_error(&self.config, key, status.as_u16(), self.origin())? {
            WebsiteAction::Redirect { location, status } => {
                Some(WebsiteFallback::Redirect(redirect(&location, status)))
            }
            WebsiteAction::ErrorDocument { key, status } => Some(WebsiteFallback::ErrorDocument(
                self.read(routing, key),
                StatusCode::from_u16(status).unwrap_or(StatusCode::NOT_FOUND),
            )),
            WebsiteAction::Serve(_) => None,
        }
    }
}

fn redirect(location: &str, status: u16) -> http::Response<S3ResponseBody> {
    let mut response = http::Response::new(S3ResponseBody::empty());
    *response.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::FOUND);
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(http::header::LOCATION, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use ferrogate_s3_model::types::RedirectAllRequestsTo;

    use super::*;

    fn routing(op: S3Operation, key: Option<&str>) -> RoutingContext {
        RoutingContext {
            bucket: Some("site".to_owned()),
            key: key.map(str::to_owned),
            operation: op,
            query_params: vec![],
            virtual_host: true,
        }
    }

    fn parts(method: &str) -> http::request::Parts {
        http::Request::builder()
            .method(method)
            .uri("/")
            .header("host", "site.s3.localhost")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    fn site() -> WebsiteConfiguration {
        WebsiteConfiguration {
            index_document_suffix: Some("index.html".to_owned()),
            error_document_key: Some("404.html".to_owned()),
            ..WebsiteConfiguration::default()
        }
    }

    #[test]
    fn test_should_only_apply_to_anonymous_virtual_host_reads() {
        let get = routing(S3Operation::GetObject, Some("a"));
        assert!(eligible(&Method::GET, &get, true));
        assert!(!eligible(&Method::GET, &get, false));
        let mut path_style = get.clone();
        path_style.virtual_host = false;
        assert!(!eligible(&Method::GET, &path_style, true));
        let mut listing = routing(S3Operation::ListObjects, None);
        assert!(eligible(&Method::GET, &listing, true));
        listing.query_params.push(("prefix".to_owned(), "a".to_owned()));
        assert!(!eligible(&Method::GET, &listing, true));
        assert!(!eligible(&Method::PUT, &routing(S3Operation::PutObject, Some("a")), true));
    }

    #[test]
    fn test_should_serve_index_for_bucket_root() {
        let site = WebsiteSite::new(site(), &parts("GET"));
        let WebsiteRoute::Serve(ctx) = site.route(&routing(S3Operation::ListObjects, None)) else {
            panic!("expected serve");
        };
        assert_eq!(ctx.operation, S3Operation::GetObject);
        assert_eq!(ctx.key.as_deref(), Some("index.html"));

        let site = WebsiteSite::new(self::site(), &parts("HEAD"));
        let WebsiteRoute::Serve(ctx) = site.route(&routing(S3Operation::HeadBucket, None)) else {
            panic!("expected serve");
        };
        assert_eq!(ctx.operation, S3Operation::HeadObject);
    }

    #[test]
    fn test_should_redirect_all_requests_permanently() {
        let config = WebsiteConfiguration {
            redirect_all_requests_to: Some(RedirectAllRequestsTo {
                host_name: "www.example.com".to_owned(),
                protocol: None,
            }),
            ..WebsiteConfiguration::default()
        };
        let site = WebsiteSite::new(config, &parts("GET"));
        let WebsiteRoute::Respond(resp) = site.route(&routing(S3Operation::GetObject, Some("a.html"))) else {
            panic!("expected redirect");
        };
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()[http::header::LOCATION], "http://www.example.com/a.html");
    }

    #[test]
    fn test_should_fall_back_to_error_document() {
        let site = WebsiteSite::new(site(), &parts("GET"));
        let failed = routing(S3Operation::GetObject, Some("missing.html"));
        let Some(WebsiteFallback::ErrorDocument(ctx, status)) = site.fallback(&failed, StatusCode::NOT_FOUND) else {
            panic!("expected error document");
        };
        assert_eq!(ctx.key.as_deref(), Some("404.html"));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(site.fallback(&failed, StatusCode::INTERNAL_SERVER_ERROR).is_none());
    }
}
