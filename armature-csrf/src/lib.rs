//! # Armature CSRF Protection
//!
//! Cross-Site Request Forgery (CSRF) protection for Armature applications.
//!
//! ## Features
//!
//! - ✅ **Salted Tokens** - `<salt>-<digest>` tokens bound to a per-client secret
//! - ✅ **Timing-Safe Verification** - Double HMAC comparison
//! - ✅ **Session or Cookie Storage** - Secret kept in the session or a (signed) cookie
//! - ✅ **Method Policy** - Configurable methods for validation and generation
//! - ✅ **Route Flags** - Force or skip checks and generation per route
//! - ✅ **Framework Agnostic** - Hosts plug in through small request/response traits
//!
//! ## Quick Start
//!
//! ```rust
//! use armature_csrf::{
//!     CsrfGenerator, CsrfGuard, CsrfRegistry, MemoryRequest, MemoryResponse, RouteFlags,
//! };
//!
//! let registry = CsrfRegistry::default();
//! let guard = CsrfGuard::from_registry(&registry);
//! let generator = CsrfGenerator::from_registry(&registry);
//!
//! // GET: not validated, a token is handed out
//! let mut req = MemoryRequest::new("GET").with_session("session");
//! let mut res = MemoryResponse::new();
//! let mut outcome = guard.check(&mut req, &mut res, RouteFlags::default()).unwrap();
//! generator.apply(&mut req, &mut res, RouteFlags::default(), Some(&mut outcome.accessor));
//! let token = res.header("X-CSRF-Token").unwrap().to_string();
//!
//! // POST on the same session with the token: accepted
//! let session = req.take_session("session").unwrap();
//! let mut req = MemoryRequest::new("POST")
//!     .with_session_data("session", session)
//!     .with_header("X-CSRF-Token", token);
//! let mut res = MemoryResponse::new();
//! assert!(guard.can_activate(&mut req, &mut res, RouteFlags::default()).unwrap());
//! ```
//!
//! ## Tokens
//!
//! ```rust
//! use armature_csrf::CsrfTokens;
//!
//! let tokens = CsrfTokens::default();
//! let secret = tokens.create_secret();
//! let token = tokens.create(&secret).unwrap();
//!
//! assert!(tokens.verify(&secret, &token));
//! assert!(!tokens.verify(&secret, "forged-token"));
//! assert!(!tokens.verify("", &token));
//! ```
//!
//! ## Cookie Storage
//!
//! ```rust
//! use armature_csrf::{CookieOverrides, CsrfOptions, CsrfRegistry};
//!
//! let registry = CsrfRegistry::default();
//! registry
//!     .customize(&CsrfOptions::new().with_cookie_options(CookieOverrides {
//!         signed: Some(true),
//!         http_only: Some(true),
//!         ..Default::default()
//!     }))
//!     .unwrap();
//!
//! assert!(registry.current().store().is_cookie());
//! ```
//!
//! ## Usage with Armature
//!
//! ```ignore
//! use armature::prelude::*;
//! use armature_csrf::{CsrfMiddleware, CsrfRegistry, RouteFlags};
//!
//! #[controller("/api")]
//! struct ApiController {
//!     csrf: CsrfMiddleware,
//! }
//!
//! impl ApiController {
//!     #[post("/submit")]
//!     async fn submit(&self, req: HttpRequest) -> Result<HttpResponse, Error> {
//!         let mut view = AdaptedRequest::from(req);
//!         let mut response = AdaptedResponse::default();
//!
//!         // Validate CSRF token
//!         self.csrf.validate_request(&mut view, &mut response, RouteFlags::default())?;
//!
//!         Ok(response.into())
//!     }
//! }
//! ```

pub mod compare;
pub mod config;
pub mod cookie;
pub mod error;
pub mod extractor;
pub mod flags;
pub mod generator;
pub mod guard;
pub mod middleware;
pub mod request;
pub mod store;
pub mod token;

pub use compare::{constant_time_eq, timing_safe_eq};
pub use config::{
    CookieSetting, CsrfContext, CsrfOptions, CsrfRegistry, MethodSet, DEFAULT_TOKEN_HEADER,
};
pub use cookie::{CookieOptions, CookieOverrides, SameSite};
pub use error::{CsrfError, Result};
pub use extractor::{default_token_value, TokenExtractor};
pub use flags::RouteFlags;
pub use generator::{CsrfGenerator, GenerateOutcome};
pub use guard::{CsrfGuard, GuardOutcome, GuardState, TokenAccessor};
pub use middleware::CsrfMiddleware;
pub use request::{CsrfRequest, CsrfResponse, MemoryRequest, MemoryResponse, SessionData};
pub use store::SecretStore;
pub use token::CsrfTokens;
