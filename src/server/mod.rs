//! HTTP server relaying chat completions to the upstream provider.
//!
//! - [`chat_api`]: Request/response types, route handlers and error mapping
//! - [`streaming`]: plain-text streaming of upstream chunks

pub mod chat_api;
pub mod streaming;
