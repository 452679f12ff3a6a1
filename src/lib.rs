//! prototype-api - backend boilerplate over a document store
//!
//! - MongoDB connection opened once at startup and lent to handlers
//! - Item listing with store identifiers rendered as strings
//! - Optional Firebase ID token gate for protected routes
//! - Optional forwarding of prompts to an OpenAI-compatible API
//! - Simple HTTP API

pub mod api;
pub mod auth;
pub mod completion;
pub mod config;
pub mod error;
pub mod items;
pub mod store;

pub use error::{Error, Result};
