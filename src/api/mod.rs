//! HTTP-facing pieces: the extension handler and the middleware the host
//! wraps it in.

pub mod auth;
pub mod health;
pub mod request_id;
