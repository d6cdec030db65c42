//! Inbound request validation.

use crate::config::{CsrfContext, CsrfOptions, CsrfRegistry};
use crate::error::{CsrfError, Result};
use crate::flags::RouteFlags;
use crate::request::{CsrfRequest, CsrfResponse};
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Final state of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Validation did not apply to this request
    Bypassed,
    /// The request carried a valid token
    Accepted,
    /// The token was absent, malformed or did not match the secret
    Rejected,
}

/// Result of [`CsrfGuard::check`].
#[derive(Debug)]
pub struct GuardOutcome {
    pub state: GuardState,
    /// Lazy token accessor, usable whatever the state
    pub accessor: TokenAccessor,
}

impl GuardOutcome {
    pub fn is_allowed(&self) -> bool {
        self.state != GuardState::Rejected
    }

    /// `Err(CsrfError::InvalidToken)` when the request was rejected.
    pub fn ensure_allowed(&self) -> Result<()> {
        if self.is_allowed() {
            Ok(())
        } else {
            Err(CsrfError::InvalidToken)
        }
    }
}

/// Request-local "current token" accessor.
///
/// The first call makes sure a secret exists and mints a token for it. Later
/// calls return the same token for as long as the secret is unchanged.
#[derive(Debug)]
pub struct TokenAccessor {
    context: Arc<CsrfContext>,
    secret: Option<String>,
    token: Option<String>,
}

impl TokenAccessor {
    pub fn new(context: Arc<CsrfContext>, secret: Option<String>) -> Self {
        Self {
            context,
            secret,
            token: None,
        }
    }

    /// Secret the accessor currently binds tokens to
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Current token, minting one when needed.
    pub fn token(
        &mut self,
        req: &mut dyn CsrfRequest,
        res: &mut dyn CsrfResponse,
    ) -> Result<String> {
        let store = self.context.store();

        // a session may have been given a new secret since the guard ran
        let current = if store.is_cookie() {
            self.secret.clone()
        } else {
            store.read(req)?
        };

        if let (Some(token), Some(secret)) = (&self.token, &current) {
            if self.secret.as_ref() == Some(secret) {
                return Ok(token.clone());
            }
        }

        let secret = match current {
            Some(secret) => secret,
            None => {
                let secret = self.context.tokens().create_secret();
                store.write(req, res, &secret)?;
                debug!("Created CSRF secret for token accessor");
                secret
            }
        };

        let token = self.context.tokens().create(&secret)?;
        self.secret = Some(secret);
        self.token = Some(token.clone());

        Ok(token)
    }
}

/// Validates CSRF tokens on inbound requests.
#[derive(Debug, Clone)]
pub struct CsrfGuard {
    context: Arc<CsrfContext>,
}

impl CsrfGuard {
    pub fn new(context: Arc<CsrfContext>) -> Self {
        Self { context }
    }

    /// Guard using the registry's current context
    pub fn from_registry(registry: &CsrfRegistry) -> Self {
        Self::new(registry.current())
    }

    /// Guard using the registry's current context with `options` applied
    pub fn with_options(registry: &CsrfRegistry, options: &CsrfOptions) -> Result<Self> {
        Ok(Self::new(registry.scoped(options)?))
    }

    pub fn context(&self) -> &Arc<CsrfContext> {
        &self.context
    }

    /// Run the validation state machine.
    ///
    /// The secret is resolved (and created when absent) before deciding
    /// whether to validate. Only configuration faults are returned as errors;
    /// a bad token yields [`GuardState::Rejected`].
    pub fn check(
        &self,
        req: &mut dyn CsrfRequest,
        res: &mut dyn CsrfResponse,
        flags: RouteFlags,
    ) -> Result<GuardOutcome> {
        let store = self.context.store();

        if let Err(e) = store.verify_configuration(req) {
            error!(error = %e, "Invalid CSRF configuration");
            return Err(e);
        }

        let secret = match store.read(req)? {
            Some(secret) => secret,
            None => {
                let secret = self.context.tokens().create_secret();
                store.write(req, res, &secret)?;
                debug!("Created CSRF secret");
                secret
            }
        };

        let method = req.method().to_uppercase();
        let state = if flags.skip_check {
            trace!(method = %method, "CSRF check skipped for route");
            GuardState::Bypassed
        } else if self.context.ignore_methods().contains(&method) && !flags.force_check {
            trace!(method = %method, "CSRF check not required for method");
            GuardState::Bypassed
        } else {
            let candidate = self.context.value_from().extract(req).unwrap_or_default();

            if self.context.tokens().verify(&secret, &candidate) {
                trace!(method = %method, "CSRF token accepted");
                GuardState::Accepted
            } else {
                debug!(
                    method = %method,
                    token_present = !candidate.is_empty(),
                    "CSRF token rejected"
                );
                GuardState::Rejected
            }
        };

        Ok(GuardOutcome {
            state,
            accessor: TokenAccessor::new(self.context.clone(), Some(secret)),
        })
    }

    /// `Ok(true)` to let the request through, `Ok(false)` for an invalid
    /// token, `Err` for configuration faults.
    pub fn can_activate(
        &self,
        req: &mut dyn CsrfRequest,
        res: &mut dyn CsrfResponse,
        flags: RouteFlags,
    ) -> Result<bool> {
        Ok(self.check(req, res, flags)?.is_allowed())
    }
}
