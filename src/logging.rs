use std::fmt;
use uuid::Uuid;

/// Logging scope handed to each controller and service.
///
/// Every component gets its own target (`api::service::users`) instead of
/// reaching for a shared per-resource logger; controllers derive a
/// per-request copy tagged with a request id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    target: String,
    request_id: Option<Uuid>,
}

impl LogContext {
    pub fn new(layer: &str, resource: &str) -> Self {
        Self {
            target: format!("api::{}::{}", layer, resource.to_ascii_lowercase()),
            request_id: None,
        }
    }

    /// Copy of this context tagged with the given request id.
    pub fn for_request(&self, request_id: Uuid) -> Self {
        Self {
            target: self.target.clone(),
            request_id: Some(request_id),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn request_id(&self) -> Option<Uuid> {
        self.request_id
    }

    pub fn step(&self, step: &str) {
        self.debug(format_args!("{}", step));
    }

    pub fn debug(&self, args: fmt::Arguments) {
        match self.request_id {
            Some(id) => log::debug!(target: self.target.as_str(), "[{}] {}", id, args),
            None => log::debug!(target: self.target.as_str(), "{}", args),
        }
    }

    pub fn info(&self, args: fmt::Arguments) {
        match self.request_id {
            Some(id) => log::info!(target: self.target.as_str(), "[{}] {}", id, args),
            None => log::info!(target: self.target.as_str(), "{}", args),
        }
    }
}
