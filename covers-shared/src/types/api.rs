//! Response envelopes shared by every service: `{success, data}` on the
//! happy path, `{success, error: {code, message}}` on failure.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorDetail,
}

/// Machine-readable code plus a human message; `details` carries
/// structured context (e.g. the rejected field) when a caller can act on it.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }
}

/// Severity ordering drives aggregation: the worst individual check
/// becomes the overall status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
}

impl HealthResponse {
    pub fn healthy(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            service: service.into(),
            version: version.into(),
            checks: None,
        }
    }

    pub fn with_checks(mut self, checks: Vec<HealthCheck>) -> Self {
        self.status = checks
            .iter()
            .map(|check| check.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);
        self.checks = Some(checks);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(name: &str, status: HealthStatus) -> HealthCheck {
        HealthCheck { name: name.into(), status, message: None }
    }

    #[test]
    fn success_envelope_nests_the_payload_under_data() {
        let json = serde_json::to_value(ApiResponse::ok(serde_json::json!({"id": 7}))).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["id"], 7);
    }

    #[test]
    fn error_envelope_carries_code_and_message() {
        let json = serde_json::to_value(ApiErrorResponse::new("E0002", "title is required")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "E0002");
        assert_eq!(json["error"]["message"], "title is required");
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn worst_check_wins_the_overall_status() {
        let degraded = HealthResponse::healthy("svc", "0.1.0").with_checks(vec![
            check("database", HealthStatus::Healthy),
            check("queue", HealthStatus::Degraded),
        ]);
        assert_eq!(degraded.status, HealthStatus::Degraded);

        let down = HealthResponse::healthy("svc", "0.1.0").with_checks(vec![
            check("database", HealthStatus::Unhealthy),
            check("queue", HealthStatus::Degraded),
        ]);
        assert_eq!(down.status, HealthStatus::Unhealthy);

        let empty = HealthResponse::healthy("svc", "0.1.0").with_checks(vec![]);
        assert_eq!(empty.status, HealthStatus::Healthy);
    }
}
