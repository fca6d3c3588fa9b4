//! hf-chat-relay: streaming HTTP relay for Hugging Face hosted inference.
//!
//! Exposes one POST endpoint that forwards a system + user message pair to
//! the inference router and streams the generated text back as it arrives,
//! keeping the API key on the server.

pub mod config;
pub mod provider;
pub mod server;
