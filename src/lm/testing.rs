//! Scripted generation client for unit tests.
use super::{GenerationClient, GenerationError, GenerationRequest};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

/// Returns `[<label>] texto gerado` (or a canned response) for every call and
/// records each request. Labels in the failing set return a rate-limit error.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    calls: RefCell<Vec<(String, String)>>,
    failing: RefCell<BTreeSet<String>>,
    responses: BTreeMap<String, String>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_response(mut self, label: &str, text: &str) -> Self {
        self.responses.insert(label.to_string(), text.to_string());
        self
    }

    pub(crate) fn fail_on(&self, label: &str) {
        self.failing.borrow_mut().insert(label.to_string());
    }

    pub(crate) fn recover(&self) {
        self.failing.borrow_mut().clear();
    }

    pub(crate) fn marker(label: &str) -> String {
        format!("[{label}] texto gerado")
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub(crate) fn calls_for(&self, label: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|(called, _)| called == label)
            .count()
    }

    pub(crate) fn last_prompt(&self, label: &str) -> Option<String> {
        self.calls
            .borrow()
            .iter()
            .rev()
            .find(|(called, _)| called == label)
            .map(|(_, prompt)| prompt.clone())
    }
}

impl GenerationClient for ScriptedClient {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        self.calls
            .borrow_mut()
            .push((request.label.to_string(), request.prompt.to_string()));
        if request.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        if self.failing.borrow().contains(request.label) {
            return Err(GenerationError::RateLimited(format!(
                "quota exhausted for {}",
                request.label
            )));
        }
        Ok(self
            .responses
            .get(request.label)
            .cloned()
            .unwrap_or_else(|| Self::marker(request.label)))
    }
}
