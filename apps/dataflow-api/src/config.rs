use std::time::Duration;

/// Dataflow API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Workflow engine webhook that receives client `data` messages.
    pub webhook_url: String,
    /// Upper bound on a single webhook call.
    pub forward_timeout: Duration,
    /// HMAC secret used to verify bearer JWTs on the admin API.
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    /// Number of audit records kept in memory.
    pub audit_log_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            port: parsed_var("PORT").unwrap_or(3000),
            webhook_url: required_var("N8N_WEBHOOK_URL"),
            forward_timeout: Duration::from_secs(parsed_var("FORWARD_TIMEOUT_SECS").unwrap_or(10)),
            jwt_secret: required_var("JWT_SECRET"),
            jwt_issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "iDataflow".to_string()),
            jwt_audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "iDataflow-users".to_string()),
            audit_log_capacity: parsed_var("AUDIT_LOG_CAPACITY").unwrap_or(1000),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| panic!("{name} env var is required"))
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
