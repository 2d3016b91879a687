//! Axum HTTP server handlers and middleware for the AbandonAuth API and browser login flows.

pub mod context;
mod handler_developer_application;
mod handler_index;
mod handler_password;
mod handler_ui;
pub mod middleware_auth;
pub mod server;
pub mod utils_http;

pub use context::AppState;
pub use handler_developer_application::{ApplicationCredentialsResponse, ApplicationDetail};
pub use handler_index::{ApplicationSummary, TokenBody, UserBody};
pub use handler_password::{CreateTestUserResponse, LoginTestUserResponse};
pub use handler_ui::{LoginOptions, ProviderLink};
pub use server::build_router;
