/// Router Module Index
///
/// Routing is split by access level so the authentication layer is applied
/// at the module boundary, not per handler: a route added to the
/// authenticated module is protected by construction.

/// Routes accessible without credentials: the banner, health probe, and the
/// register/login entry points.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware. Requires a valid
/// bearer token on every request.
pub mod authenticated;
