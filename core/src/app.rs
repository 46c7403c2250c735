//! Composition root tying the session and the synchronizer together.
//!
//! # Design
//! `TodoApp` enforces the start-up order (restore the session, then load the
//! list) and turns a `Redirect::Login` from the synchronizer into a full
//! session logout, so the visible view falls back to the login screen.

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{FileTokenStore, TokenStore};
use crate::client::TodoClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{Transport, UreqTransport};
use crate::session::Session;
use crate::sync::{Redirect, TodoSync};
use crate::types::{CreateTodo, EditDraft, TodoItem};

/// Which screen the user should be looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Loading,
    Login,
    Todos,
}

pub struct TodoApp {
    session: Session,
    todos: TodoSync,
}

impl TodoApp {
    /// Real HTTP transport and a token file under `config.data_dir`.
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_parts(
            &config.api_url,
            Arc::new(UreqTransport::new()),
            Arc::new(FileTokenStore::new(&config.data_dir)),
        )
    }

    pub fn with_parts(
        base_url: &str,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let client = TodoClient::new(base_url);
        Self {
            session: Session::new(client.clone(), transport.clone(), tokens.clone()),
            todos: TodoSync::new(client, transport, tokens),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn todos(&self) -> &TodoSync {
        &self.todos
    }

    pub fn view(&self) -> View {
        if self.session.is_loading() {
            View::Loading
        } else if self.session.is_authenticated() {
            View::Todos
        } else {
            View::Login
        }
    }

    /// Restore the session, then load the list if it is authenticated.
    pub fn start(&mut self) -> Result<(), ApiError> {
        self.session.restore();
        if !self.session.is_authenticated() {
            return Ok(());
        }
        self.fetch_all()
    }

    pub fn login(&mut self, email: &str, password: &str) -> bool {
        if !self.session.login(email, password) {
            return false;
        }
        if let Err(e) = self.fetch_all() {
            warn!(error = %e, "initial fetch after login failed");
        }
        true
    }

    pub fn register(&mut self, name: &str, email: &str, password: &str) -> Result<(), ApiError> {
        self.session.register(name, email, password)?;
        self.fetch_all()
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.todos.reset();
    }

    pub fn fetch_all(&mut self) -> Result<(), ApiError> {
        let result = self.todos.fetch_all();
        self.settle(result)
    }

    pub fn create(&mut self, input: &CreateTodo) -> Result<(), ApiError> {
        let result = self.todos.create(input);
        self.settle(result)
    }

    pub fn delete(&mut self, id: &str) -> Result<(), ApiError> {
        let result = self.todos.delete(id);
        self.settle(result)
    }

    pub fn toggle_complete(&mut self, id: &str) -> Result<(), ApiError> {
        let item = self.item(id)?;
        let result = self.todos.toggle_complete(&item);
        self.settle(result)
    }

    pub fn start_edit(&mut self, id: &str) -> Result<(), ApiError> {
        let item = self.item(id)?;
        self.todos.start_edit(&item);
        Ok(())
    }

    /// Mutable access to the open draft, for filling in the edit form.
    pub fn draft_mut(&mut self) -> Option<&mut EditDraft> {
        self.todos.draft_mut()
    }

    pub fn submit_edit(&mut self) -> Result<TodoItem, ApiError> {
        let result = self.todos.submit_edit();
        self.settle(result)
    }

    fn item(&self, id: &str) -> Result<TodoItem, ApiError> {
        self.todos.find(id).cloned().ok_or(ApiError::NotFound)
    }

    fn settle<T>(&mut self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Some(Redirect::Login) = self.todos.take_redirect() {
            info!("session rejected by todo service");
            self.session.logout();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;
    use crate::test_support::{ScriptedTransport, BASE_URL};

    fn app(transport: &Arc<ScriptedTransport>, tokens: &Arc<MemoryTokenStore>) -> TodoApp {
        TodoApp::with_parts(BASE_URL, transport.clone(), tokens.clone())
    }

    #[test]
    fn start_without_token_lands_on_login() {
        let transport = ScriptedTransport::new();
        let tokens = Arc::new(MemoryTokenStore::new());
        let mut app = app(&transport, &tokens);
        assert_eq!(app.view(), View::Loading);

        app.start().unwrap();

        assert_eq!(app.view(), View::Login);
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn start_restores_then_fetches() {
        let transport = ScriptedTransport::new();
        transport
            .respond(200, r#"{"_id":"u1","name":"Ada"}"#)
            .respond(200, r#"[{"_id":"1","title":"Buy milk"}]"#);
        let tokens = Arc::new(MemoryTokenStore::with_token("tok"));
        let mut app = app(&transport, &tokens);

        app.start().unwrap();

        assert_eq!(app.view(), View::Todos);
        assert_eq!(transport.calls(), vec!["GET /auth/me", "GET /todos"]);
        assert_eq!(app.todos().todos().len(), 1);
    }

    #[test]
    fn unauthorized_todo_request_ends_session() {
        let transport = ScriptedTransport::new();
        transport
            .respond(200, r#"{"_id":"u1","name":"Ada"}"#)
            .respond(200, r#"[{"_id":"1","title":"Buy milk"}]"#)
            .respond(401, "");
        let tokens = Arc::new(MemoryTokenStore::with_token("tok"));
        let mut app = app(&transport, &tokens);
        app.start().unwrap();

        assert!(app.delete("1").unwrap_err().is_unauthorized());

        assert_eq!(app.view(), View::Login);
        assert!(app.session().user().is_none());
        assert_eq!(tokens.load().unwrap(), None);
        assert!(app.todos().todos().is_empty());
    }

    #[test]
    fn login_loads_list() {
        let transport = ScriptedTransport::new();
        transport
            .respond(200, r#"{"token":"t","user":{"_id":"u1"}}"#)
            .respond(200, r#"[]"#);
        let tokens = Arc::new(MemoryTokenStore::new());
        let mut app = app(&transport, &tokens);
        app.start().unwrap();

        assert!(app.login("ada@example.com", "pw"));

        assert_eq!(app.view(), View::Todos);
        assert_eq!(transport.calls(), vec!["POST /auth/login", "GET /todos"]);
    }

    #[test]
    fn toggle_unknown_id_is_not_found_locally() {
        let transport = ScriptedTransport::new();
        let tokens = Arc::new(MemoryTokenStore::with_token("tok"));
        let mut app = app(&transport, &tokens);
        assert!(matches!(app.toggle_complete("missing"), Err(ApiError::NotFound)));
        assert!(transport.requests().is_empty());
    }
}
