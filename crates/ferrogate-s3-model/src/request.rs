//! Request envelopes shared between the HTTP layer and the service core.

use std::collections::HashMap;

/// A wrapper around `bytes::Bytes` for request and response payloads.
#[derive(Debug, Clone, Default)]
pub struct StreamingBlob {
    /// The underlying bytes data.
    pub data: bytes::Bytes,
}

impl StreamingBlob {
    /// Create a new `StreamingBlob` from bytes.
    #[must_use]
    pub fn new(data: impl Into<bytes::Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Returns true if the blob is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the length of the blob.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }
}

impl From<bytes::Bytes> for StreamingBlob {
    fn from(data: bytes::Bytes) -> Self {
        Self { data }
    }
}

impl From<Vec<u8>> for StreamingBlob {
    fn from(data: Vec<u8>) -> Self {
        Self { data: data.into() }
    }
}

/// The authenticated principal behind a request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// Account id used as owner id for buckets and objects.
    pub user_id: String,
    /// Display name returned in `Owner` elements.
    pub display_name: String,
    /// Access key the request was signed with.
    pub access_key: String,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

/// Per-request facts produced by the middleware chain.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Correlation id echoed in `x-amz-request-id` and error bodies.
    pub request_id: String,
    /// `None` for anonymous requests.
    pub identity: Option<Identity>,
    /// Client address as seen through proxy headers.
    pub source_ip: Option<String>,
    /// Values consulted by bucket policy conditions, keyed case-sensitively
    /// as they appear in policy documents (`aws:SourceIp`, `s3:prefix`, ...).
    pub condition_values: HashMap<String, Vec<String>>,
    /// True when the bucket was taken from the `Host` header.
    pub virtual_host: bool,
}

impl RequestContext {
    /// Create a context with only a request id.
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    /// Attach an authenticated identity.
    #[must_use]
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Whether the request carries no credentials.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.identity.is_none()
    }

    /// The requester's account id, or an empty string when anonymous.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.identity.as_ref().map_or("", |i| i.user_id.as_str())
    }
}

/// An S3 request wrapping an operation input with its request context.
#[derive(Debug, Clone)]
pub struct S3Request<T> {
    /// The input payload.
    pub input: T,
    /// Who is calling, from where.
    pub context: RequestContext,
}

impl<T: Default> Default for S3Request<T> {
    fn default() -> Self {
        Self {
            input: T::default(),
            context: RequestContext::default(),
        }
    }
}

impl<T> S3Request<T> {
    /// Create a new anonymous request with the given input.
    #[must_use]
    pub fn new(input: T) -> Self {
        Self {
            input,
            context: RequestContext::default(),
        }
    }

    /// Set the request context.
    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// Map the input type to a different type.
    pub fn map_input<U>(self, f: impl FnOnce(T) -> U) -> S3Request<U> {
        S3Request {
            input: f(self.input),
            context: self.context,
        }
    }
}
