//! Static website hosting: configuration checks and request resolution.
//!
//! Website behaviour only applies to anonymous requests addressed to a bucket
//! through the virtual-host form. The HTTP layer asks [`resolve`] what to do
//! before serving, and [`on_error`] when serving failed.

use ferrogate_s3_model::types::{RoutingRule, WebsiteConfiguration};

use crate::error::{S3ServiceError, S3ServiceResult};

const MAX_ROUTING_RULES: usize = 100;
const DEFAULT_REDIRECT_CODE: u16 = 302;
const REDIRECT_ALL_CODE: u16 = 301;

/// What the HTTP layer should do for a website request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebsiteAction {
    /// Serve this object key.
    Serve(String),
    /// Answer with a redirect.
    Redirect {
        /// Absolute `Location` value.
        location: String,
        /// 3xx status code.
        status: u16,
    },
    /// Render this object with the original error status.
    ErrorDocument {
        /// Key of the error document.
        key: String,
        /// Status of the failed request.
        status: u16,
    },
}

/// Where the request came from, used to fill redirect defaults.
#[derive(Debug, Clone, Copy)]
pub struct RequestOrigin<'a> {
    /// `Host` header value.
    pub host: &'a str,
    /// `http` or `https`.
    pub scheme: &'a str,
}

fn invalid(message: impl Into<String>) -> S3ServiceError {
    S3ServiceError::InvalidWebsiteConfiguration {
        message: message.into(),
    }
}

fn valid_protocol(protocol: Option<&str>) -> bool {
    matches!(protocol, None | Some("http" | "https"))
}

/// Validate a configuration before storing it.
pub fn validate(config: &WebsiteConfiguration) -> S3ServiceResult<()> {
    if let Some(redirect) = &config.redirect_all_requests_to {
        if config.index_document_suffix.is_some()
            || config.error_document_key.is_some()
            || !config.routing_rules.is_empty()
        {
            return Err(invalid(
                "RedirectAllRequestsTo cannot be combined with other website settings",
            ));
        }
        if redirect.host_name.is_empty() {
            return Err(invalid("RedirectAllRequestsTo requires HostName"));
        }
        if !valid_protocol(redirect.protocol.as_deref()) {
            return Err(invalid("redirect protocol must be http or https"));
        }
        return Ok(());
    }

    match config.index_document_suffix.as_deref() {
        Some(suffix) if suffix.is_empty() || suffix.contains('/') => {
            return Err(invalid("the IndexDocument Suffix is not well formed"));
        }
        None => return Err(invalid("a value for IndexDocument Suffix must be provided")),
        Some(_) => {}
    }
    if config.error_document_key.as_deref() == Some("") {
        return Err(invalid("the ErrorDocument Key is not well formed"));
    }
    if config.routing_rules.len() > MAX_ROUTING_RULES {
        return Err(invalid(format!("at most {MAX_ROUTING_RULES} routing rules are allowed")));
    }
    for rule in &config.routing_rules {
        let redirect = &rule.redirect;
        if redirect.protocol.is_none()
            && redirect.host_name.is_none()
            && redirect.replace_key_prefix_with.is_none()
            && redirect.replace_key_with.is_none()
            && redirect.http_redirect_code.is_none()
        {
            return Err(invalid("routing rule Redirect must name at least one element"));
        }
        if redirect.replace_key_prefix_with.is_some() && redirect.replace_key_with.is_some() {
            return Err(invalid(
                "ReplaceKeyWith and ReplaceKeyPrefixWith cannot both be set",
            ));
        }
        if !valid_protocol(redirect.protocol.as_deref()) {
            return Err(invalid("redirect protocol must be http or https"));
        }
        if redirect
            .http_redirect_code
            .is_some_and(|code| !(300..400).contains(&code))
        {
            return Err(invalid("HttpRedirectCode must be a 3xx status"));
        }
    }
    Ok(())
}

fn rule_matches(rule: &RoutingRule, key: &str, status: Option<u16>) -> bool {
    let Some(condition) = &rule.condition else {
        return status.is_none();
    };
    let prefix_ok = condition
        .key_prefix_equals
        .as_deref()
        .is_none_or(|prefix| key.starts_with(prefix));
    let code_ok = match condition.http_error_code_returned_equals {
        Some(code) => status == Some(code),
        None => status.is_none(),
    };
    prefix_ok && code_ok
}

fn redirect_for(rule: &RoutingRule, key: &str, origin: RequestOrigin<'_>) -> WebsiteAction {
    let redirect = &rule.redirect;
    let target_key = match (&redirect.replace_key_with, &redirect.replace_key_prefix_with) {
        (Some(replacement), _) => replacement.clone(),
        (None, Some(prefix)) => {
            let matched = rule
                .condition
                .as_ref()
                .and_then(|c| c.key_prefix_equals.as_deref())
                .unwrap_or_default();
            format!("{prefix}{}", key.strip_prefix(matched).unwrap_or(key))
        }
        (None, None) => key.to_owned(),
    };
    let protocol = redirect.protocol.as_deref().unwrap_or(origin.scheme);
    let host = redirect.host_name.as_deref().unwrap_or(origin.host);
    WebsiteAction::Redirect {
        location: format!("{protocol}://{host}/{target_key}"),
        status: redirect.http_redirect_code.unwrap_or(DEFAULT_REDIRECT_CODE),
    }
}

/// Decide how to answer a website request for `key` before touching storage.
#[must_use]
pub fn resolve(config: &WebsiteConfiguration, key: &str, origin: RequestOrigin<'_>) -> WebsiteAction {
    if let Some(redirect) = &config.redirect_all_requests_to {
        let protocol = redirect.protocol.as_deref().unwrap_or(origin.scheme);
        return WebsiteAction::Redirect {
            location: format!("{protocol}://{}/{key}", redirect.host_name),
            status: REDIRECT_ALL_CODE,
        };
    }
    if let Some(rule) = config
        .routing_rules
        .iter()
        .find(|rule| rule_matches(rule, key, None))
    {
        return redirect_for(rule, key, origin);
    }
    match &config.index_document_suffix {
        Some(suffix) if key.is_empty() || key.ends_with('/') => WebsiteAction::Serve(format!("{key}{suffix}")),
        _ => WebsiteAction::Serve(key.to_owned()),
    }
}

/// Decide how to answer after serving `key` failed with `status`. `None`
/// means the plain S3 error response is sent.
#[must_use]
pub fn on_error(
    config: &WebsiteConfiguration,
    key: &str,
    status: u16,
    origin: RequestOrigin<'_>,
) -> Option<WebsiteAction> {
    if let Some(rule) = config
        .routing_rules
        .iter()
        .find(|rule| rule_matches(rule, key, Some(status)))
    {
        return Some(redirect_for(rule, key, origin));
    }
    match &config.error_document_key {
        Some(document) if status == 403 || status == 404 => Some(WebsiteAction::ErrorDocument {
            key: document.clone(),
            status,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use ferrogate_s3_model::types::{Redirect, RedirectAllRequestsTo, RoutingCondition};

    use super::*;

    const ORIGIN: RequestOrigin<'static> = RequestOrigin {
        host: "site.s3.localhost",
        scheme: "http",
    };

    fn site() -> WebsiteConfiguration {
        WebsiteConfiguration {
            index_document_suffix: Some("index.html".to_owned()),
            error_document_key: Some("error.html".to_owned()),
            routing_rules: vec![
                RoutingRule {
                    condition: Some(RoutingCondition {
                        key_prefix_equals: Some("docs/".to_owned()),
                        http_error_code_returned_equals: None,
                    }),
                    redirect: Redirect {
                        replace_key_prefix_with: Some("documents/".to_owned()),
                        ..Redirect::default()
                    },
                },
                RoutingRule {
                    condition: Some(RoutingCondition {
                        key_prefix_equals: None,
                        http_error_code_returned_equals: Some(404),
                    }),
                    redirect: Redirect {
                        host_name: Some("fallback.example.com".to_owned()),
                        http_redirect_code: Some(307),
                        ..Redirect::default()
                    },
                },
            ],
            ..WebsiteConfiguration::default()
        }
    }

    #[test]
    fn test_should_append_index_suffix() {
        let config = site();
        assert_eq!(resolve(&config, "", ORIGIN), WebsiteAction::Serve("index.html".to_owned()));
        assert_eq!(resolve(&config, "blog/", ORIGIN), WebsiteAction::Serve("blog/index.html".to_owned()));
        assert_eq!(resolve(&config, "a.css", ORIGIN), WebsiteAction::Serve("a.css".to_owned()));
    }

    #[test]
    fn test_should_rewrite_key_prefix() {
        assert_eq!(
            resolve(&site(), "docs/intro.html", ORIGIN),
            WebsiteAction::Redirect {
                location: "http://site.s3.localhost/documents/intro.html".to_owned(),
                status: 302,
            }
        );
    }

    #[test]
    fn test_should_redirect_on_error_code_before_error_document() {
        let config = site();
        assert_eq!(
            on_error(&config, "missing", 404, ORIGIN),
            Some(WebsiteAction::Redirect {
                location: "http://fallback.example.com/missing".to_owned(),
                status: 307,
            })
        );
        assert_eq!(
            on_error(&config, "secret", 403, ORIGIN),
            Some(WebsiteAction::ErrorDocument {
                key: "error.html".to_owned(),
                status: 403,
            })
        );
        assert_eq!(on_error(&config, "k", 500, ORIGIN), None);
    }

    #[test]
    fn test_should_redirect_all_requests() {
        let config = WebsiteConfiguration {
            redirect_all_requests_to: Some(RedirectAllRequestsTo {
                host_name: "www.example.com".to_owned(),
                protocol: Some("https".to_owned()),
            }),
            ..WebsiteConfiguration::default()
        };
        assert!(validate(&config).is_ok());
        assert_eq!(
            resolve(&config, "a/b", ORIGIN),
            WebsiteAction::Redirect {
                location: "https://www.example.com/a/b".to_owned(),
                status: 301,
            }
        );
    }

    #[test]
    fn test_should_reject_invalid_configurations() {
        assert!(validate(&site()).is_ok());

        let mut mixed = site();
        mixed.redirect_all_requests_to = Some(RedirectAllRequestsTo {
            host_name: "x".to_owned(),
            protocol: None,
        });
        assert!(validate(&mixed).is_err());

        let mut slash = site();
        slash.index_document_suffix = Some("a/index.html".to_owned());
        assert!(validate(&slash).is_err());

        let mut bad_code = site();
        bad_code.routing_rules[0].redirect.http_redirect_code = Some(200);
        assert!(validate(&bad_code).is_err());

        let mut both = site();
        both.routing_rules[0].redirect.replace_key_with = Some("x".to_owned());
        assert!(validate(&both).is_err());
    }
}
