use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// What the audit log knows about one intercepted request.
#[derive(Debug, Clone, Copy)]
pub struct RequestTrace<'a> {
    pub time: DateTime<Utc>,
    /// Route template the request matched, e.g. `/meter-readings/month/{month}`.
    pub route: &'a str,
    pub method: &'a str,
    pub path: &'a str,
    pub query: Option<&'a str>,
}

impl RequestTrace<'_> {
    /// Renders the four-line audit message. Bodies are never part of it.
    pub fn message(&self) -> String {
        let arguments = match self.query {
            Some(q) if !q.is_empty() => format!("[{q}]"),
            _ => "[]".to_string(),
        };

        format!(
            "Time: {}\nMethod Name: {}\nSignature: {} {}\nArguments: {}",
            self.time.format("%Y-%m-%d %H:%M:%S"),
            self.route,
            self.method,
            self.path,
            arguments,
        )
    }
}
