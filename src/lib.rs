//! AbandonAuth identity service library crate.
//!
//! Issues and validates signed bearer tokens, trades short-lived exchange tokens for
//! long-lived session tokens, manages developer application credentials and callback
//! URIs, and federates logins through Discord, GitHub and Google.

pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod storage;
