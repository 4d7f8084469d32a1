//! Registrar protocol support.

/// Registrar check endpoint client
pub mod registrar;

/// Suffix to endpoint routing
pub mod routes;

pub use registrar::{classify_response, RegistrarClient};
pub use routes::{builtin_routes, RouteTable};
