use crate::cookie::{CookieOptions, CookieOverrides};
use crate::error::Result;
use crate::extractor::TokenExtractor;
use crate::store::{SecretStore, DEFAULT_SESSION_KEY};
use crate::token::CsrfTokens;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Response header carrying a freshly generated token.
pub const DEFAULT_TOKEN_HEADER: &str = "X-CSRF-Token";

const DEFAULT_IGNORE_METHODS: [&str; 3] = ["GET", "HEAD", "OPTIONS"];
const DEFAULT_GENERATE_METHODS: [&str; 3] = ["GET", "HEAD", "OPTIONS"];

/// Case-insensitive set of HTTP methods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSet(HashSet<String>);

impl MethodSet {
    /// Build a set from method names, upper-casing each
    pub fn new<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            methods
                .into_iter()
                .map(|m| m.as_ref().to_uppercase())
                .collect(),
        )
    }

    /// Whether `method` is in the set, ignoring case
    pub fn contains(&self, method: &str) -> bool {
        self.0.contains(&method.to_uppercase())
    }

    /// Number of methods
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no methods
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Cookie storage switch: `true`/`false`, or a set of cookie options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CookieSetting {
    Enabled(bool),
    Options(CookieOverrides),
}

impl CookieSetting {
    fn resolve(&self) -> Option<CookieOptions> {
        match self {
            CookieSetting::Enabled(false) => None,
            CookieSetting::Enabled(true) => Some(CookieOptions::default()),
            CookieSetting::Options(overrides) => Some(CookieOptions::default().merged(overrides)),
        }
    }
}

/// Overrides applied on top of a [`CsrfContext`].
///
/// Every field is optional; unset fields inherit from the baseline. Loadable
/// from configuration files through serde, except for the extractor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CsrfOptions {
    /// Salt length in characters
    pub salt_length: Option<usize>,

    /// Secret length in bytes
    pub secret_length: Option<usize>,

    /// Store the secret in a cookie instead of the session
    pub cookie: Option<CookieSetting>,

    /// Request key of the session object
    pub session_key: Option<String>,

    /// Methods that skip validation
    pub ignore_methods: Option<Vec<String>>,

    /// Methods that trigger token generation
    pub generate_methods: Option<Vec<String>>,

    /// Response header for generated tokens
    pub header_name: Option<String>,

    /// Token extraction function
    #[serde(skip)]
    pub value_from: Option<TokenExtractor>,
}

impl CsrfOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set salt length
    pub fn with_salt_length(mut self, length: usize) -> Self {
        self.salt_length = Some(length);
        self
    }

    /// Set secret length
    pub fn with_secret_length(mut self, length: usize) -> Self {
        self.secret_length = Some(length);
        self
    }

    /// Enable or disable cookie storage with default options
    pub fn with_cookie(mut self, enabled: bool) -> Self {
        self.cookie = Some(CookieSetting::Enabled(enabled));
        self
    }

    /// Enable cookie storage with custom options
    pub fn with_cookie_options(mut self, overrides: CookieOverrides) -> Self {
        self.cookie = Some(CookieSetting::Options(overrides));
        self
    }

    /// Set session key
    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = Some(key.into());
        self
    }

    /// Set methods that skip validation
    pub fn with_ignore_methods<S: Into<String>>(
        mut self,
        methods: impl IntoIterator<Item = S>,
    ) -> Self {
        self.ignore_methods = Some(methods.into_iter().map(Into::into).collect());
        self
    }

    /// Set methods that trigger token generation
    pub fn with_generate_methods<S: Into<String>>(
        mut self,
        methods: impl IntoIterator<Item = S>,
    ) -> Self {
        self.generate_methods = Some(methods.into_iter().map(Into::into).collect());
        self
    }

    /// Set response header name
    pub fn with_header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = Some(name.into());
        self
    }

    /// Set token extractor
    pub fn with_value_from(mut self, extractor: TokenExtractor) -> Self {
        self.value_from = Some(extractor);
        self
    }
}

/// Resolved, immutable CSRF policy.
#[derive(Debug, Clone)]
pub struct CsrfContext {
    tokens: CsrfTokens,
    store: SecretStore,
    session_key: String,
    ignore_methods: MethodSet,
    generate_methods: MethodSet,
    value_from: TokenExtractor,
    header_name: String,
}

impl Default for CsrfContext {
    fn default() -> Self {
        Self {
            tokens: CsrfTokens::default(),
            store: SecretStore::session(DEFAULT_SESSION_KEY),
            session_key: DEFAULT_SESSION_KEY.to_string(),
            ignore_methods: MethodSet::new(DEFAULT_IGNORE_METHODS),
            generate_methods: MethodSet::new(DEFAULT_GENERATE_METHODS),
            value_from: TokenExtractor::default(),
            header_name: DEFAULT_TOKEN_HEADER.to_string(),
        }
    }
}

impl CsrfContext {
    /// Defaults with `options` applied
    pub fn from_options(options: &CsrfOptions) -> Result<Self> {
        Self::default().merge(options)
    }

    /// Build a new context from this one with `options` applied.
    pub fn merge(&self, options: &CsrfOptions) -> Result<Self> {
        let mut context = self.clone();

        if options.salt_length.is_some() || options.secret_length.is_some() {
            context.tokens = CsrfTokens::new(
                options.salt_length.unwrap_or(self.tokens.salt_length()),
                options.secret_length.unwrap_or(self.tokens.secret_length()),
            )?;
        }

        if let Some(key) = options.session_key.as_ref().filter(|k| !k.is_empty()) {
            context.session_key = key.clone();
        }

        let cookie = match options.cookie {
            Some(ref setting) => setting.resolve(),
            None => self.store.cookie_options().cloned(),
        };
        context.store = match cookie {
            Some(cookie) => SecretStore::cookie(cookie),
            None => SecretStore::session(context.session_key.clone()),
        };

        if let Some(ref methods) = options.ignore_methods {
            context.ignore_methods = MethodSet::new(methods);
        }

        if let Some(ref methods) = options.generate_methods {
            context.generate_methods = MethodSet::new(methods);
        }

        if let Some(ref name) = options.header_name {
            context.header_name = name.clone();
        }

        if let Some(ref extractor) = options.value_from {
            context.value_from = extractor.clone();
        }

        Ok(context)
    }

    pub fn tokens(&self) -> &CsrfTokens {
        &self.tokens
    }

    pub fn store(&self) -> &SecretStore {
        &self.store
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn ignore_methods(&self) -> &MethodSet {
        &self.ignore_methods
    }

    pub fn generate_methods(&self) -> &MethodSet {
        &self.generate_methods
    }

    pub fn value_from(&self) -> &TokenExtractor {
        &self.value_from
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }
}

/// Shared handle to the application-wide [`CsrfContext`].
///
/// Reads clone an `Arc`; [`customize`](Self::customize) swaps the whole
/// context, so a reader sees either the old or the new one.
#[derive(Debug)]
pub struct CsrfRegistry {
    current: RwLock<Arc<CsrfContext>>,
}

impl CsrfRegistry {
    pub fn new(context: CsrfContext) -> Self {
        Self {
            current: RwLock::new(Arc::new(context)),
        }
    }

    /// Current context
    pub fn current(&self) -> Arc<CsrfContext> {
        self.current.read().clone()
    }

    /// Merge `options` onto the current context and make the result current.
    pub fn customize(&self, options: &CsrfOptions) -> Result<Arc<CsrfContext>> {
        let mut current = self.current.write();
        let context = Arc::new(current.merge(options)?);
        *current = context.clone();

        debug!(
            cookie = context.store().is_cookie(),
            session_key = %context.session_key(),
            "CSRF context customized"
        );

        Ok(context)
    }

    /// Context for a single guard or generator; the current one stays unchanged.
    pub fn scoped(&self, options: &CsrfOptions) -> Result<Arc<CsrfContext>> {
        Ok(Arc::new(self.current().merge(options)?))
    }

    /// Replace the current context
    pub fn replace(&self, context: CsrfContext) {
        *self.current.write() = Arc::new(context);
    }
}

impl Default for CsrfRegistry {
    fn default() -> Self {
        Self::new(CsrfContext::default())
    }
}
