//! OAuth 2.1 authorization server endpoints
//!
//! One logical authorization server per configured downstream, all derived
//! from the same stateless machinery: discovery metadata, the authorize
//! step (credential form or IdP redirect), the chained-OAuth callback, and
//! the token endpoint.

pub mod authorize;
pub mod discovery;
pub mod token;
