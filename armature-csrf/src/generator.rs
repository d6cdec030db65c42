//! Outbound token generation.

use crate::config::{CsrfContext, CsrfOptions, CsrfRegistry};
use crate::error::Result;
use crate::flags::RouteFlags;
use crate::guard::TokenAccessor;
use crate::request::{CsrfRequest, CsrfResponse};
use http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// What [`CsrfGenerator::apply`] did to the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// Generation did not apply to this request
    Skipped,
    /// A token was attached to the response
    Generated(String),
    /// Generation failed and the response was turned into a 400
    Failed(String),
}

/// Mints tokens for outbound responses.
#[derive(Debug, Clone)]
pub struct CsrfGenerator {
    context: Arc<CsrfContext>,
}

impl CsrfGenerator {
    pub fn new(context: Arc<CsrfContext>) -> Self {
        Self { context }
    }

    /// Generator using the registry's current context
    pub fn from_registry(registry: &CsrfRegistry) -> Self {
        Self::new(registry.current())
    }

    /// Generator using the registry's current context with `options` applied
    pub fn with_options(registry: &CsrfRegistry, options: &CsrfOptions) -> Result<Self> {
        Ok(Self::new(registry.scoped(options)?))
    }

    pub fn context(&self) -> &Arc<CsrfContext> {
        &self.context
    }

    /// Whether a token should be generated for `method` under `flags`.
    pub fn should_generate(&self, method: &str, flags: RouteFlags) -> bool {
        if flags.skip_generate {
            return false;
        }

        flags.force_generate || self.context.generate_methods().contains(method)
    }

    /// Produce a token for the response.
    ///
    /// Reuses the guard's accessor when one is given. Otherwise a new secret
    /// is created, persisted, and a token minted for it.
    pub fn generate_token(
        &self,
        req: &mut dyn CsrfRequest,
        res: &mut dyn CsrfResponse,
        accessor: Option<&mut TokenAccessor>,
    ) -> Result<String> {
        if let Some(accessor) = accessor {
            return accessor.token(req, res);
        }

        let tokens = self.context.tokens();
        let secret = tokens.create_secret();
        let token = tokens.create(&secret)?;
        self.context.store().write(req, res, &secret)?;
        debug!("Created CSRF secret for generated token");

        Ok(token)
    }

    /// Generate a token when the policy asks for one and expose it as a
    /// response header.
    ///
    /// Failures never propagate: the response becomes a 400 with a
    /// `{"msg": ...}` body instead.
    pub fn apply(
        &self,
        req: &mut dyn CsrfRequest,
        res: &mut dyn CsrfResponse,
        flags: RouteFlags,
        accessor: Option<&mut TokenAccessor>,
    ) -> GenerateOutcome {
        let method = req.method().to_uppercase();
        if !self.should_generate(&method, flags) {
            trace!(method = %method, "CSRF token generation skipped");
            return GenerateOutcome::Skipped;
        }

        match self.generate_token(req, res, accessor) {
            Ok(token) => {
                res.set_header(self.context.header_name(), token.clone());
                trace!(method = %method, "CSRF token attached to response");
                GenerateOutcome::Generated(token)
            }
            Err(e) => {
                warn!(method = %method, error = %e, "CSRF token generation failed");
                let message = e.to_string();
                res.set_status(StatusCode::BAD_REQUEST);
                res.set_json_body(json!({ "msg": message }));
                GenerateOutcome::Failed(message)
            }
        }
    }
}
