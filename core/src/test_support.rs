use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};

/// Replays queued responses in order and records every request it sees.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, status: u16, body: &str) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }));
        self
    }

    pub(crate) fn fail(&self, error: ApiError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `METHOD path` for each recorded request, with the base URL stripped.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| {
                let path = r.path.strip_prefix(BASE_URL).unwrap_or(&r.path);
                format!("{} {path}", r.method.as_str())
            })
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let next = self.responses.lock().unwrap().pop_front();
        let Some(next) = next else {
            panic!("unexpected request: {} {}", request.method.as_str(), request.path);
        };
        self.requests.lock().unwrap().push(request);
        next
    }
}

pub(crate) const BASE_URL: &str = "http://api.test";
