//! Service boundary: dataset registry and request handling
//!
//! Transport (routing, HTTP marshaling) stays outside the crate. Handlers here
//! take deserialized requests and return serializable responses or a
//! [`request::ServiceError`] carrying a status code.

/// Engines keyed by dataset identifier
pub mod registry;
/// Request normalization and handlers
pub mod request;
