/// Registration form state
///
/// The form does no validation of its own: whatever the operator typed is
/// sent, with the ports coerced and the lease policy attached.

use std::future::Future;
use std::sync::Arc;

use crate::core::actions::{register_then_reload, ActionReport};
use crate::core::models::Registration;
use crate::core::registry::RegistryApi;

/// (JSON key, label) in display order
pub const FORM_FIELDS: [(&str, &str); 7] = [
    ("serviceName", "Service-Name"),
    ("healthEndpointPath", "Health-Pfad"),
    ("infoEndpointPath", "Info-Pfad"),
    ("httpPort", "HTTP-Port"),
    ("securePort", "HTTPS-Port"),
    ("hostName", "Hostname"),
    ("dataCenterInfoName", "Datacenter"),
];

#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    values: [String; FORM_FIELDS.len()],
    focused: usize,
}

impl RegistrationForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> usize {
        self.focused
    }

    pub fn next_field(&mut self) {
        self.focused = (self.focused + 1) % FORM_FIELDS.len();
    }

    pub fn prev_field(&mut self) {
        self.focused = (self.focused + FORM_FIELDS.len() - 1) % FORM_FIELDS.len();
    }

    pub fn insert_char(&mut self, c: char) {
        self.values[self.focused].push(c);
    }

    pub fn backspace(&mut self) {
        self.values[self.focused].pop();
    }

    pub fn set(&mut self, key: &str, value: &str) {
        if let Some(idx) = FORM_FIELDS.iter().position(|(k, _)| *k == key) {
            self.values[idx] = value.to_string();
        }
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        FORM_FIELDS
            .iter()
            .position(|(k, _)| *k == key)
            .map(|idx| self.values[idx].as_str())
    }

    /// (label, value, focused) for rendering
    pub fn rows(&self) -> impl Iterator<Item = (&'static str, &str, bool)> + '_ {
        FORM_FIELDS
            .iter()
            .zip(self.values.iter())
            .enumerate()
            .map(move |(idx, ((_, label), value))| (*label, value.as_str(), idx == self.focused))
    }

    pub fn to_registration(&self) -> Registration {
        Registration::from_fields(
            FORM_FIELDS
                .iter()
                .zip(self.values.iter())
                .map(|((key, _), value)| (*key, value.clone())),
        )
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Reset the form and return the request that POSTs what it held, then
    /// reloads the list. The returned future owns everything it needs, so it
    /// can be spawned.
    pub fn submit(&mut self, api: Arc<dyn RegistryApi>) -> impl Future<Output = ActionReport> + Send + 'static {
        let registration = self.to_registration();
        self.reset();
        async move { register_then_reload(api.as_ref(), &registration).await }
    }
}
