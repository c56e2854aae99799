pub mod models;
pub mod registry;
pub mod actions;
pub mod form;
pub mod log_stream;

pub use models::{ClientRecord, LeaseInfo, PortValue, Registration};
pub use registry::{RegistryApi, RegistryClient, RegistryError};
pub use actions::{ActionOutcome, ActionReport, LifecycleAction};
pub use form::RegistrationForm;
pub use log_stream::{LogPanels, ToggleResult};
