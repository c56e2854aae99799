/// Registry dashboard defaults and user-facing strings
///
/// The operator console is German-localized; every string the dashboard
/// shows to the user lives here.

use std::time::Duration;

/// Registry API used when neither `--url`, `REGISTRY_URL` nor the config file set one
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment variable overriding the configured registry URL
pub const REGISTRY_URL_ENV: &str = "REGISTRY_URL";

/// Directory name under the user's config dir
pub const APP_DIR_NAME: &str = "registry-cli";

/// Lease policy sent with every registration (not operator-configurable)
pub const LEASE_RENEWAL_INTERVAL_SECS: u32 = 30;
pub const LEASE_DURATION_SECS: u32 = 90;

/// Timeout for unary API calls. Log streams are not bounded.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum bytes kept per log panel (oldest text is dropped first)
pub const MAX_LOG_BYTES: usize = 256 * 1024;

// Service status
pub const LABEL_RUNNING: &str = "🟢 läuft";
pub const LABEL_STOPPED: &str = "🔴 gestoppt";

// Action verbs, used in "Fehler beim <verb> von <name>"
pub const VERB_START: &str = "Starten";
pub const VERB_STOP: &str = "Stoppen";
pub const VERB_DELETE: &str = "Löschen";
pub const VERB_REGISTER: &str = "Registrieren";

// Log viewer
pub const LOGS_LOADING: &str = "Logs werden geladen...";
pub const LOGS_DISABLED: &str = "Log-Streaming ist deaktiviert.";
pub const LOGS_STREAM_FAILED: &str = "❌ Log-Stream abgebrochen";

// List
pub const LIST_EMPTY: &str = "Keine Clients registriert.";
pub const LIST_LOAD_FAILED: &str = "❌ Client-Liste konnte nicht geladen werden";

// Dialogs
pub const ALERT_TITLE: &str = " Hinweis ";
pub const ALERT_DISMISS: &str = "[Enter] OK";
pub const FORM_TITLE: &str = " Neuen Client registrieren ";
pub const FORM_HINT: &str = "[Tab/↑/↓] Feld wechseln | [Enter] Registrieren | [Esc] Abbrechen";
