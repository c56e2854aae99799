/// Data model of the registry API
///
/// The registry is the only source of truth: these types are decoded fresh
/// on every list reload and never cached.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::utils::{parse_int_lenient, LABEL_RUNNING, LABEL_STOPPED, LEASE_DURATION_SECS, LEASE_RENEWAL_INTERVAL_SECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseInfo {
    pub renewal_interval_in_secs: u32,
    pub duration_in_secs: u32,
}

impl LeaseInfo {
    /// The lease policy attached to every registration
    pub const FIXED: LeaseInfo = LeaseInfo {
        renewal_interval_in_secs: LEASE_RENEWAL_INTERVAL_SECS,
        duration_in_secs: LEASE_DURATION_SECS,
    };
}

/// A registered service as returned by `GET /clients`.
///
/// Only `serviceName` is guaranteed; registries that report just the name and
/// the running flag decode with the remaining fields unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub service_name: String,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub http_port: Option<i64>,
    #[serde(default)]
    pub secure_port: Option<i64>,
    #[serde(default)]
    pub lease_info: Option<LeaseInfo>,
}

impl ClientRecord {
    pub fn status_label(&self) -> &'static str {
        if self.running {
            LABEL_RUNNING
        } else {
            LABEL_STOPPED
        }
    }

    /// "orders — 🟢 läuft"
    pub fn summary(&self) -> String {
        format!("{} — {}", self.service_name, self.status_label())
    }
}

/// A coerced port field. `NotANumber` is what a non-numeric form entry turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortValue {
    Number(i64),
    NotANumber,
}

impl PortValue {
    pub fn parse(raw: &str) -> Self {
        match parse_int_lenient(raw) {
            Some(n) => PortValue::Number(n),
            None => PortValue::NotANumber,
        }
    }
}

// JSON has no NaN; it goes out as `null` so the key is still present.
impl Serialize for PortValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PortValue::Number(n) => serializer.serialize_i64(*n),
            PortValue::NotANumber => serializer.serialize_none(),
        }
    }
}

/// Body of `POST /clients`: every form field as a string, the two ports
/// coerced, and the fixed lease policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registration {
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
    #[serde(rename = "httpPort")]
    pub http_port: PortValue,
    #[serde(rename = "securePort")]
    pub secure_port: PortValue,
    #[serde(rename = "leaseInfo")]
    pub lease_info: LeaseInfo,
}

impl Registration {
    pub fn from_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields: BTreeMap<String, String> = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        // A missing port behaves like an unparsable one
        let http_port = fields
            .remove("httpPort")
            .map_or(PortValue::NotANumber, |raw| PortValue::parse(&raw));
        let secure_port = fields
            .remove("securePort")
            .map_or(PortValue::NotANumber, |raw| PortValue::parse(&raw));
        fields.remove("leaseInfo");

        Self {
            fields,
            http_port,
            secure_port,
            lease_info: LeaseInfo::FIXED,
        }
    }

    pub fn service_name(&self) -> &str {
        self.fields.get("serviceName").map(String::as_str).unwrap_or("")
    }
}

/// Error body returned by the registry on non-2xx responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// The detail text to show the operator, if any.
    /// Structured details (validation errors) are shown as compact JSON.
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_record_full() {
        let record: ClientRecord = serde_json::from_value(json!({
            "serviceName": "orders",
            "running": true,
            "httpPort": 8080,
            "securePort": 8443,
            "leaseInfo": {"renewalIntervalInSecs": 30, "durationInSecs": 90}
        }))
        .unwrap();

        assert_eq!(record.service_name, "orders");
        assert!(record.running);
        assert_eq!(record.http_port, Some(8080));
        assert_eq!(record.lease_info, Some(LeaseInfo::FIXED));
        assert_eq!(record.summary(), "orders — 🟢 läuft");
    }

    #[test]
    fn test_client_record_minimal() {
        let record: ClientRecord =
            serde_json::from_value(json!({"serviceName": "BILLING", "running": false})).unwrap();
        assert_eq!(record.http_port, None);
        assert_eq!(record.lease_info, None);
        assert_eq!(record.summary(), "BILLING — 🔴 gestoppt");
    }

    #[test]
    fn test_registration_injects_lease_and_coerces_ports() {
        let registration = Registration::from_fields([
            ("serviceName", "orders"),
            ("hostName", "orders.local"),
            ("httpPort", "8080"),
            ("securePort", "443"),
            ("leaseInfo", "ignored"),
        ]);

        let body = serde_json::to_value(&registration).unwrap();
        assert_eq!(
            body,
            json!({
                "serviceName": "orders",
                "hostName": "orders.local",
                "httpPort": 8080,
                "securePort": 443,
                "leaseInfo": {"renewalIntervalInSecs": 30, "durationInSecs": 90}
            })
        );
    }

    #[test]
    fn test_registration_keeps_non_numeric_ports() {
        let registration = Registration::from_fields([
            ("serviceName", "orders"),
            ("httpPort", "http"),
        ]);
        assert_eq!(registration.http_port, PortValue::NotANumber);
        assert_eq!(registration.secure_port, PortValue::NotANumber);

        let body = serde_json::to_value(&registration).unwrap();
        let object = body.as_object().unwrap();
        assert!(object.contains_key("httpPort"));
        assert!(object["httpPort"].is_null());
        assert!(object["securePort"].is_null());
    }

    #[test]
    fn test_error_body_message() {
        let body: ErrorBody = serde_json::from_value(json!({"detail": "already running"})).unwrap();
        assert_eq!(body.message().as_deref(), Some("already running"));

        let body: ErrorBody = serde_json::from_value(json!({"detail": ""})).unwrap();
        assert_eq!(body.message(), None);

        let body: ErrorBody = serde_json::from_value(json!({})).unwrap();
        assert_eq!(body.message(), None);

        let body: ErrorBody = serde_json::from_value(json!({"detail": [{"loc": ["body"]}]})).unwrap();
        assert_eq!(body.message().as_deref(), Some(r#"[{"loc":["body"]}]"#));
    }
}
