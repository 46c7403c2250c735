//! Session manager: authentication state and token lifecycle.
//!
//! # Design
//! `Session` is the only writer of the persisted token on the success paths
//! (login, register) and on logout. It never installs a default header
//! anywhere; callers ask it for the current `Credential` and pass that into
//! each request they build.
//!
//! Error policy differs on purpose between `login` (failure reported as
//! `false`, error logged) and `register` (error returned to the caller), to
//! stay compatible with callers written against that contract.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::auth::{Credential, TokenStore};
use crate::client::TodoClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, Transport};
use crate::types::{AuthResponse, LoginRequest, RegisterRequest, User};

pub struct Session {
    client: TodoClient,
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenStore>,
    credential: Option<Credential>,
    user: Option<User>,
    is_authenticated: bool,
    loading: bool,
}

impl Session {
    /// An empty session. `loading` stays set until [`Session::restore`] runs.
    pub fn new(client: TodoClient, transport: Arc<dyn Transport>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            client,
            transport,
            tokens,
            credential: None,
            user: None,
            is_authenticated: false,
            loading: true,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Restore a persisted token, then fetch the profile it belongs to.
    ///
    /// The session is marked authenticated before the profile arrives. A 401
    /// on the profile fetch ends the session; any other failure leaves it
    /// authenticated without a user. `loading` is cleared in every case.
    pub fn restore(&mut self) {
        match self.tokens.load() {
            Ok(Some(token)) => {
                let credential = Credential::new(token);
                self.credential = Some(credential.clone());
                self.is_authenticated = true;
                info!("restored persisted session");

                match self.fetch_user(&credential) {
                    Ok(user) => self.user = Some(user),
                    Err(e) => {
                        error!(error = %e, "error fetching user data");
                        if e.is_unauthorized() {
                            self.logout();
                        }
                    }
                }
            }
            Ok(None) => debug!("no persisted token"),
            Err(e) => warn!(error = %e, "could not read persisted token"),
        }
        self.loading = false;
    }

    /// Returns `true` on success. On failure the previous state is kept.
    pub fn login(&mut self, email: &str, password: &str) -> bool {
        info!(email, "attempting login");
        let request = self.client.build_login(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        });
        match self.authenticate(request) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "login error");
                false
            }
        }
    }

    /// Like [`Session::login`], but failures are returned to the caller.
    pub fn register(&mut self, name: &str, email: &str, password: &str) -> Result<(), ApiError> {
        info!(email, "registration attempt");
        let request = self.client.build_register(&RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        });
        self.authenticate(request)
            .inspect_err(|e| error!(error = %e, "registration failed"))
    }

    /// Forget the token and the user. Safe to call when already logged out.
    pub fn logout(&mut self) {
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "could not remove persisted token");
        }
        self.credential = None;
        self.user = None;
        self.is_authenticated = false;
        info!("logged out");
    }

    /// Feed back the outcome of a request made elsewhere with this session's
    /// credential. An unauthorized response ends an authenticated session.
    pub fn observe(&mut self, error: &ApiError) {
        if error.is_unauthorized() && self.is_authenticated {
            warn!("credential rejected, ending session");
            self.logout();
        }
    }

    fn fetch_user(&self, credential: &Credential) -> Result<User, ApiError> {
        let response = self.transport.execute(self.client.build_me(credential))?;
        self.client.parse_me(response)
    }

    fn authenticate(&mut self, request: Result<HttpRequest, ApiError>) -> Result<(), ApiError> {
        let response = self.transport.execute(request?)?;
        let AuthResponse { token, user } = self.client.parse_auth(response)?;
        self.tokens.save(&token)?;

        self.credential = Some(Credential::new(token));
        self.user = Some(user);
        self.is_authenticated = true;
        info!("session authenticated");
        Ok(())
    }
}
