use crate::request::CsrfRequest;
use std::fmt;
use std::sync::Arc;

/// Body and query field carrying the token.
pub const TOKEN_FIELD: &str = "_csrf";

/// Headers searched for the token, in order.
pub const TOKEN_HEADERS: [&str; 4] = ["csrf-token", "xsrf-token", "x-csrf-token", "x-xsrf-token"];

type ExtractFn = dyn Fn(&dyn CsrfRequest) -> Option<String> + Send + Sync;

/// Reads the candidate token from an inbound request.
#[derive(Clone)]
pub struct TokenExtractor {
    extract: Arc<ExtractFn>,
}

impl TokenExtractor {
    /// Wrap a custom extraction function
    pub fn new<F>(extract: F) -> Self
    where
        F: Fn(&dyn CsrfRequest) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            extract: Arc::new(extract),
        }
    }

    /// Read the token from a single header
    pub fn header(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |req| non_empty(req.header(&name)))
    }

    /// Run the extractor. Empty values count as absent.
    pub fn extract(&self, req: &dyn CsrfRequest) -> Option<String> {
        (self.extract)(req).filter(|token| !token.is_empty())
    }
}

impl Default for TokenExtractor {
    fn default() -> Self {
        Self::new(default_token_value)
    }
}

impl fmt::Debug for TokenExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenExtractor(..)")
    }
}

/// Body `_csrf`, then query `_csrf`, then the [`TOKEN_HEADERS`].
pub fn default_token_value(req: &dyn CsrfRequest) -> Option<String> {
    non_empty(req.body_field(TOKEN_FIELD))
        .or_else(|| non_empty(req.query_field(TOKEN_FIELD)))
        .or_else(|| {
            TOKEN_HEADERS
                .iter()
                .find_map(|name| non_empty(req.header(name)))
        })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(|v| v.to_string())
}
