//! Client core for the todo service: session lifecycle and list sync.
//!
//! # Overview
//! `Session` restores, establishes and ends an authenticated session,
//! persisting the bearer token through a `TokenStore`. `TodoSync` keeps the
//! local todo list in step with the REST API. `TodoApp` wires the two
//! together in start-up order.
//!
//! # Design
//! - `TodoClient` is stateless: it holds only `base_url` and builds
//!   `HttpRequest` values / parses `HttpResponse` values.
//! - Actual I/O goes through the `Transport` trait; `UreqTransport` is the
//!   blocking implementation, tests use scripted ones.
//! - Credentials are passed into every request explicitly; there is no
//!   shared default header.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod sync;
pub mod types;

#[cfg(test)]
mod test_support;

pub use app::{TodoApp, View};
pub use auth::{Credential, FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
pub use client::TodoClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use session::Session;
pub use sync::{PendingFetch, Redirect, TodoSync};
pub use types::{CreateTodo, EditDraft, Importance, TodoItem, UpdateTodo, User};
