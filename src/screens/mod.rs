pub mod dashboard;

// The dashboard is a single screen: the client list, with the registration
// form, help and alerts drawn as overlays and log panels split below it.

pub use dashboard::{Dashboard, Theme};
