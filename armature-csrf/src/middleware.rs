use crate::config::{CsrfContext, CsrfRegistry};
use crate::error::{CsrfError, Result};
use crate::flags::RouteFlags;
use crate::generator::{CsrfGenerator, GenerateOutcome};
use crate::guard::{CsrfGuard, TokenAccessor};
use crate::request::{CsrfRequest, CsrfResponse};
use std::sync::Arc;

/// CSRF protection middleware
///
/// Pairs a [`CsrfGuard`] and a [`CsrfGenerator`] over the same context so a
/// host can validate on the way in and attach a token on the way out.
#[derive(Debug, Clone)]
pub struct CsrfMiddleware {
    guard: CsrfGuard,
    generator: CsrfGenerator,
}

impl CsrfMiddleware {
    /// Create new CSRF middleware
    pub fn new(context: Arc<CsrfContext>) -> Self {
        Self {
            guard: CsrfGuard::new(context.clone()),
            generator: CsrfGenerator::new(context),
        }
    }

    /// Middleware using the registry's current context
    pub fn from_registry(registry: &CsrfRegistry) -> Self {
        Self::new(registry.current())
    }

    pub fn guard(&self) -> &CsrfGuard {
        &self.guard
    }

    pub fn generator(&self) -> &CsrfGenerator {
        &self.generator
    }

    /// Validate an inbound request.
    ///
    /// Returns the request's token accessor, or `CsrfError::InvalidToken`
    /// when the token does not check out.
    pub fn validate_request(
        &self,
        req: &mut dyn CsrfRequest,
        res: &mut dyn CsrfResponse,
        flags: RouteFlags,
    ) -> Result<TokenAccessor> {
        let outcome = self.guard.check(req, res, flags)?;
        outcome.ensure_allowed()?;
        Ok(outcome.accessor)
    }

    /// Attach a token to the outbound response when the policy asks for one.
    pub fn add_token(
        &self,
        req: &mut dyn CsrfRequest,
        res: &mut dyn CsrfResponse,
        flags: RouteFlags,
        accessor: Option<&mut TokenAccessor>,
    ) -> GenerateOutcome {
        self.generator.apply(req, res, flags, accessor)
    }

    /// Verify the inbound token against an existing secret.
    ///
    /// Unlike [`validate_request`](Self::validate_request) this never creates
    /// a secret and ignores the method policy.
    pub fn verify_existing(&self, req: &dyn CsrfRequest) -> Result<bool> {
        let context = self.guard.context();
        let secret = context
            .store()
            .read(req)?
            .ok_or(CsrfError::MissingSecret)?;
        let token = context.value_from().extract(req).unwrap_or_default();

        Ok(context.tokens().verify(&secret, &token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CsrfOptions;
    use crate::request::{MemoryRequest, MemoryResponse};

    #[test]
    fn test_validate_then_add_token() {
        let middleware = CsrfMiddleware::new(Arc::new(CsrfContext::default()));
        let mut req = MemoryRequest::new("GET").with_session("session");
        let mut res = MemoryResponse::new();

        let mut accessor = middleware
            .validate_request(&mut req, &mut res, RouteFlags::default())
            .unwrap();
        let outcome =
            middleware.add_token(&mut req, &mut res, RouteFlags::default(), Some(&mut accessor));

        assert!(matches!(outcome, GenerateOutcome::Generated(_)));
    }

    #[test]
    fn test_validate_rejects_post() {
        let middleware = CsrfMiddleware::new(Arc::new(CsrfContext::default()));
        let mut req = MemoryRequest::new("POST").with_session("session");
        let mut res = MemoryResponse::new();

        let err = middleware
            .validate_request(&mut req, &mut res, RouteFlags::default())
            .unwrap_err();
        assert!(matches!(err, CsrfError::InvalidToken));
    }

    #[test]
    fn test_verify_existing() {
        let registry = CsrfRegistry::default();
        registry.customize(&CsrfOptions::new().with_cookie(true)).unwrap();
        let middleware = CsrfMiddleware::from_registry(&registry);

        let req = MemoryRequest::new("POST").with_cookie_jar();
        assert!(matches!(
            middleware.verify_existing(&req),
            Err(CsrfError::MissingSecret)
        ));

        let tokens = *registry.current().tokens();
        let secret = tokens.create_secret();
        let token = tokens.create(&secret).unwrap();

        let req = MemoryRequest::new("POST")
            .with_cookie("_csrf", secret.clone())
            .with_body_field("_csrf", token);
        assert!(middleware.verify_existing(&req).unwrap());

        let req = MemoryRequest::new("POST")
            .with_cookie("_csrf", secret)
            .with_body_field("_csrf", "forged-token");
        assert!(!middleware.verify_existing(&req).unwrap());
    }
}
