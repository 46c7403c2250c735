//! Stateless HTTP request builder and response parser for the todo API.
//!
//! # Design
//! `TodoClient` holds only a `base_url` and carries no mutable state between
//! calls. Each endpoint is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Authenticated builders take the `Credential` explicitly; nothing is kept
//! as a default header.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::Credential;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    AuthResponse, CreateTodo, LoginRequest, RegisterRequest, TodoItem, UpdateTodo, User,
};

/// Synchronous, stateless client for the todo API.
#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
}

impl TodoClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // --- auth ---

    pub fn build_login(&self, input: &LoginRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/login", None, input)
    }

    pub fn build_register(&self, input: &RegisterRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/register", None, input)
    }

    pub fn build_me(&self, credential: &Credential) -> HttpRequest {
        self.empty_request(HttpMethod::Get, "/auth/me", credential)
    }

    /// Parses the `{token, user}` body shared by login and register.
    pub fn parse_auth(&self, response: HttpResponse) -> Result<AuthResponse, ApiError> {
        parse_json(response)
    }

    pub fn parse_me(&self, response: HttpResponse) -> Result<User, ApiError> {
        parse_json(response)
    }

    // --- todos ---

    pub fn build_list_todos(&self, credential: &Credential) -> HttpRequest {
        self.empty_request(HttpMethod::Get, "/todos", credential)
    }

    pub fn build_create_todo(
        &self,
        credential: &Credential,
        input: &CreateTodo,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/todos", Some(credential), input)
    }

    pub fn build_update_todo(
        &self,
        credential: &Credential,
        id: &str,
        input: &UpdateTodo,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Patch,
            &format!("/todos/{id}"),
            Some(credential),
            input,
        )
    }

    pub fn build_delete_todo(&self, credential: &Credential, id: &str) -> HttpRequest {
        self.empty_request(HttpMethod::Delete, &format!("/todos/{id}"), credential)
    }

    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<Vec<TodoItem>, ApiError> {
        parse_json(response)
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<TodoItem, ApiError> {
        parse_json(response)
    }

    pub fn parse_update_todo(&self, response: HttpResponse) -> Result<TodoItem, ApiError> {
        parse_json(response)
    }

    /// Delete carries no required response body.
    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    fn empty_request(&self, method: HttpMethod, path: &str, credential: &Credential) -> HttpRequest {
        HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers: vec![("authorization".to_string(), credential.header_value())],
            body: None,
        }
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        credential: Option<&Credential>,
        input: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(input).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
        if let Some(credential) = credential {
            headers.push(("authorization".to_string(), credential.header_value()));
        }
        Ok(HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers,
            body: Some(body),
        })
    }
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-2xx status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    match response.status {
        200..=299 => Ok(()),
        401 => Err(ApiError::Unauthorized),
        404 => Err(ApiError::NotFound),
        status => Err(ApiError::HttpError {
            status,
            body: response.body.clone(),
        }),
    }
}
