//! Todo synchronizer: local list state reconciled against the server.
//!
//! # Design
//! The server is the source of truth. Mutations are never applied locally
//! ahead of confirmation: create, delete and toggle are followed by a full
//! `fetch_all`, and only `update` splices the item the server returned.
//!
//! A refetch that fails after a confirmed mutation is logged, not returned:
//! the caller's operation did succeed.
//!
//! Every list fetch is stamped with a generation from a monotonic counter.
//! A completion whose generation is not newer than the state already shown
//! is discarded, so out-of-order responses cannot roll the list back. A
//! splice also advances the generation, which retires any fetch that was in
//! flight before it.
//!
//! An unauthorized response, or having no token to send, clears the stored
//! token, drops the local list and records `Redirect::Login` for the caller.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::auth::{Credential, TokenStore};
use crate::client::TodoClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::types::{CreateTodo, EditDraft, TodoItem, UpdateTodo};

/// Where the caller should send the user after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Login,
}

/// A list fetch that has been issued but not yet applied.
#[derive(Debug, Clone)]
pub struct PendingFetch {
    pub generation: u64,
    pub request: HttpRequest,
}

pub struct TodoSync {
    client: TodoClient,
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenStore>,
    todos: Vec<TodoItem>,
    draft: Option<EditDraft>,
    issued: u64,
    applied: u64,
    redirect: Option<Redirect>,
}

impl TodoSync {
    pub fn new(client: TodoClient, transport: Arc<dyn Transport>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            client,
            transport,
            tokens,
            todos: Vec::new(),
            draft: None,
            issued: 0,
            applied: 0,
            redirect: None,
        }
    }

    pub fn todos(&self) -> &[TodoItem] {
        &self.todos
    }

    pub fn find(&self, id: &str) -> Option<&TodoItem> {
        self.todos.iter().find(|t| t.id == id)
    }

    pub fn draft(&self) -> Option<&EditDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut EditDraft> {
        self.draft.as_mut()
    }

    /// Drain the pending redirect, if any.
    pub fn take_redirect(&mut self) -> Option<Redirect> {
        self.redirect.take()
    }

    /// Drop all local state, e.g. after logout.
    pub fn reset(&mut self) {
        self.todos.clear();
        self.draft = None;
        self.issued += 1;
        self.applied = self.issued;
    }

    /// Replace the local list with the server's.
    pub fn fetch_all(&mut self) -> Result<(), ApiError> {
        let PendingFetch {
            generation,
            request,
        } = self.begin_fetch()?;
        let response = self.transport.execute(request);
        self.complete_fetch(generation, response).map(|_| ())
    }

    /// Issue a list fetch without executing it. Pair with
    /// [`TodoSync::complete_fetch`] when the host drives I/O itself.
    pub fn begin_fetch(&mut self) -> Result<PendingFetch, ApiError> {
        let credential = self.credential()?;
        self.issued += 1;
        Ok(PendingFetch {
            generation: self.issued,
            request: self.client.build_list_todos(&credential),
        })
    }

    /// Apply the outcome of a fetch. Returns `Ok(false)` when the result was
    /// stale and discarded, whatever it was: a stale 401 must not end a
    /// session that was established after the request went out.
    pub fn complete_fetch(
        &mut self,
        generation: u64,
        response: Result<HttpResponse, ApiError>,
    ) -> Result<bool, ApiError> {
        if generation <= self.applied {
            match &response {
                Ok(r) => debug!(generation, applied = self.applied, status = r.status, "discarding stale fetch"),
                Err(e) => debug!(generation, applied = self.applied, error = %e, "discarding stale fetch"),
            }
            return Ok(false);
        }
        let todos = match response.and_then(|r| self.client.parse_list_todos(r)) {
            Ok(todos) => todos,
            Err(e) => {
                error!(error = %e, "error fetching todos");
                return Err(self.settle(e));
            }
        };
        debug!(generation, count = todos.len(), "todo list replaced");
        self.todos = todos;
        self.applied = generation;
        Ok(true)
    }

    /// Create an item, then refetch so server-assigned fields show up.
    pub fn create(&mut self, input: &CreateTodo) -> Result<(), ApiError> {
        let credential = self.credential()?;
        let request = self.client.build_create_todo(&credential, input);
        match self.round_trip(request, TodoClient::parse_create_todo) {
            Ok(created) => {
                info!(id = %created.id, "todo created");
                self.refresh();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "error adding todo");
                Err(self.settle(e))
            }
        }
    }

    pub fn delete(&mut self, id: &str) -> Result<(), ApiError> {
        let credential = self.credential()?;
        let request = Ok(self.client.build_delete_todo(&credential, id));
        match self.round_trip(request, TodoClient::parse_delete_todo) {
            Ok(()) => {
                info!(id, "todo deleted");
                self.refresh();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, id, "error deleting todo");
                Err(self.settle(e))
            }
        }
    }

    /// Flip `completed`, sending only that field.
    pub fn toggle_complete(&mut self, item: &TodoItem) -> Result<(), ApiError> {
        let credential = self.credential()?;
        let patch = UpdateTodo::completed(!item.completed);
        let request = self.client.build_update_todo(&credential, &item.id, &patch);
        match self.round_trip(request, TodoClient::parse_update_todo) {
            Ok(_) => {
                self.refresh();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, id = %item.id, "error updating todo");
                Err(self.settle(e))
            }
        }
    }

    /// Open `item` for editing, replacing any draft already open.
    pub fn start_edit(&mut self, item: &TodoItem) {
        if let Some(previous) = &self.draft {
            debug!(id = %previous.id, "discarding open edit draft");
        }
        self.draft = Some(EditDraft::from_item(item));
    }

    pub fn cancel_edit(&mut self) {
        self.draft = None;
    }

    /// Send the open draft through [`TodoSync::update`].
    pub fn submit_edit(&mut self) -> Result<TodoItem, ApiError> {
        let Some(draft) = self.draft.clone() else {
            error!("no todo selected for editing");
            return Err(ApiError::NoDraft);
        };
        self.update(&draft)
    }

    /// Patch every editable field of `draft` and splice the server's answer
    /// into the list. On failure the list is refetched so no local edit
    /// survives; the draft is closed either way.
    pub fn update(&mut self, draft: &EditDraft) -> Result<TodoItem, ApiError> {
        let credential = self.credential()?;
        let request = self
            .client
            .build_update_todo(&credential, &draft.id, &draft.to_patch());
        match self.round_trip(request, TodoClient::parse_update_todo) {
            Ok(updated) => {
                info!(id = %updated.id, "todo updated");
                self.splice(updated.clone());
                self.draft = None;
                Ok(updated)
            }
            Err(e) => {
                match &e {
                    ApiError::HttpError { status, body } => {
                        error!(id = %draft.id, status, %body, "update failed")
                    }
                    other => error!(id = %draft.id, error = %other, "update failed"),
                }
                let e = self.settle(e);
                self.draft = None;
                if !e.is_unauthorized() {
                    self.refresh();
                }
                Err(e)
            }
        }
    }

    /// Refetch after a mutation the server already confirmed. A failure here
    /// does not undo the mutation, so it is logged rather than returned; an
    /// unauthorized answer still records the redirect.
    fn refresh(&mut self) {
        if let Err(e) = self.fetch_all() {
            warn!(error = %e, "refetch after mutation failed");
        }
    }

    fn splice(&mut self, updated: TodoItem) {
        match self.todos.iter_mut().find(|t| t.id == updated.id) {
            Some(slot) => *slot = updated,
            None => debug!(id = %updated.id, "updated todo not in local list"),
        }
        self.issued += 1;
        self.applied = self.issued;
    }

    fn round_trip<T>(
        &self,
        request: Result<HttpRequest, ApiError>,
        parse: impl FnOnce(&TodoClient, HttpResponse) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let response = self.transport.execute(request?)?;
        parse(&self.client, response)
    }

    fn credential(&mut self) -> Result<Credential, ApiError> {
        match self.tokens.load()? {
            Some(token) => Ok(Credential::new(token)),
            None => {
                warn!("no token available for todo request");
                Err(self.settle(ApiError::Unauthorized))
            }
        }
    }

    /// Apply the unauthorized policy and hand the error back.
    fn settle(&mut self, error: ApiError) -> ApiError {
        if error.is_unauthorized() {
            if let Err(e) = self.tokens.clear() {
                warn!(error = %e, "could not remove persisted token");
            }
            self.reset();
            self.redirect = Some(Redirect::Login);
            info!("unauthorized, redirecting to login");
        }
        error
    }
}
