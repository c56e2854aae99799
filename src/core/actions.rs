/// Operator actions against the registry
///
/// Every mutating action is followed by exactly one list reload, whatever
/// its outcome. The reload is the only way the dashboard re-synchronizes
/// with the registry; nothing is updated optimistically.

use tracing::{info, warn};

use crate::core::models::{ClientRecord, Registration};
use crate::core::registry::{RegistryApi, RegistryError};
use crate::utils::{VERB_DELETE, VERB_REGISTER, VERB_START, VERB_STOP};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Start,
    Stop,
    Delete,
}

impl LifecycleAction {
    /// German verb used in alert texts
    pub fn verb(&self) -> &'static str {
        match self {
            LifecycleAction::Start => VERB_START,
            LifecycleAction::Stop => VERB_STOP,
            LifecycleAction::Delete => VERB_DELETE,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LifecycleAction::Start => "Start",
            LifecycleAction::Stop => "Stop",
            LifecycleAction::Delete => "Löschen",
        }
    }
}

/// Result of a single operator action, as shown to the operator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Blocking alert text; `None` on success
    pub alert: Option<String>,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        self.alert.is_none()
    }
}

/// An action outcome together with the list reload that followed it
#[derive(Debug)]
pub struct ActionReport {
    pub outcome: ActionOutcome,
    pub clients: Result<Vec<ClientRecord>, RegistryError>,
}

/// Alert text for a failed action
pub fn alert_for(verb: &str, name: &str, err: &RegistryError) -> String {
    match err {
        RegistryError::Http { detail: Some(detail), .. } => format!("⚠️ {}", detail),
        RegistryError::Http { .. } | RegistryError::Decode(_) => {
            format!("⚠️ Fehler beim {} von {}", verb, name)
        }
        RegistryError::Network(_) | RegistryError::InvalidUrl { .. } => {
            format!("❌ Netzwerkfehler beim {} von {}", verb, name)
        }
    }
}

fn outcome(verb: &str, name: &str, result: Result<(), RegistryError>) -> ActionOutcome {
    match result {
        Ok(()) => {
            info!(service = %name, action = verb, "action succeeded");
            ActionOutcome::default()
        }
        Err(e) => {
            warn!(service = %name, action = verb, error = %e, "action failed");
            ActionOutcome {
                alert: Some(alert_for(verb, name, &e)),
            }
        }
    }
}

pub async fn run_action(api: &dyn RegistryApi, action: LifecycleAction, name: &str) -> ActionOutcome {
    let result = match action {
        LifecycleAction::Start => api.start(name).await,
        LifecycleAction::Stop => api.stop(name).await,
        LifecycleAction::Delete => api.delete(name).await,
    };
    outcome(action.verb(), name, result)
}

pub async fn register(api: &dyn RegistryApi, registration: &Registration) -> ActionOutcome {
    let result = api.register(registration).await;
    outcome(VERB_REGISTER, registration.service_name(), result)
}

/// Fetch the full list. Failures are logged and returned; the caller decides
/// how to show them.
pub async fn reload(api: &dyn RegistryApi) -> Result<Vec<ClientRecord>, RegistryError> {
    let result = api.list_clients().await;
    match &result {
        Ok(clients) => info!(count = clients.len(), "client list reloaded"),
        Err(e) => warn!(error = %e, "failed to load client list"),
    }
    result
}

pub async fn run_action_then_reload(
    api: &dyn RegistryApi,
    action: LifecycleAction,
    name: &str,
) -> ActionReport {
    let outcome = run_action(api, action, name).await;
    let clients = reload(api).await;
    ActionReport { outcome, clients }
}

pub async fn register_then_reload(api: &dyn RegistryApi, registration: &Registration) -> ActionReport {
    let outcome = register(api, registration).await;
    let clients = reload(api).await;
    ActionReport { outcome, clients }
}
