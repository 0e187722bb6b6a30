//! Policy engine transport and the object API seam
//!
//! [`EngineClient`] owns the HTTP transport: auth, TLS, proxies, and the
//! mapping from response statuses to the API error taxonomy. [`ObjectApi`]
//! is the capability set the reconciler depends on; the reconciler never
//! sees the transport directly.

pub mod config;
pub mod http;
pub mod object;

pub use config::EngineConfig;
pub use http::EngineClient;
pub use object::{HttpObjectApi, ObjectApi};
