//! Middleware stack for the API Gateway.
//!
//! Layer order: Request → CORS → Trace → BodyLimit → Timeout (REST only) → Handler
//!
//! Streaming routes skip the request timeout; they stay open until the
//! client goes away.

pub mod cors;

pub use cors::create_cors_layer;
