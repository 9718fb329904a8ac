//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (random tokens, SHA-256)
//! - Cookie management
//! - Bearer token extraction
//! - Bounded outbound HTTP client
//! - Environment configuration helpers

pub mod client;
pub mod config;
pub mod cookie;
pub mod crypto;
pub mod http_client;
