use std::time::Duration;
use thiserror::Error;

/// Failure of a single call against a ledger node.
///
/// `Display` is the message shown to the operator: the node's own `message`
/// when it sent one, otherwise a transport description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Network failure, non-2xx answer or undecodable body.
    #[error("{message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// A bounded call ran out of time. Still a transport failure, but one the
    /// controller reports as "node unreachable".
    #[error("{message}")]
    Timeout { message: String },
}

impl LedgerError {
    pub fn transport(message: impl Into<String>) -> Self {
        LedgerError::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn timeout_after(target: &str, bound: Duration) -> Self {
        LedgerError::Timeout {
            message: format!(
                "{} did not respond within {}s",
                target,
                bound.as_secs_f64()
            ),
        }
    }

    /// Error for a non-2xx response. Prefers the server's `message` field.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let server_message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v["message"].as_str().map(str::to_string))
            .filter(|m| !m.trim().is_empty());

        LedgerError::Transport {
            status: Some(status.as_u16()),
            message: server_message.unwrap_or_else(|| format!("HTTP {}", status)),
        }
    }

    /// Map a reqwest failure. `bound` is the per-request limit, if the call had one.
    pub fn from_reqwest(err: reqwest::Error, target: &str, bound: Option<Duration>) -> Self {
        if err.is_timeout() {
            return match bound {
                Some(bound) => LedgerError::timeout_after(target, bound),
                None => LedgerError::Timeout {
                    message: format!("{} timed out: {}", target, err),
                },
            };
        }
        LedgerError::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: format!("network error talking to {}: {}", target, err),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            LedgerError::Transport { status, .. } => *status,
            LedgerError::Timeout { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            LedgerError::Transport { message, .. } | LedgerError::Timeout { message } => message,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LedgerError::Timeout { .. })
    }

    /// Every ledger error is a transport error; timeouts are a subtype.
    pub fn is_transport(&self) -> bool {
        true
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(s) if (500..600).contains(&s))
    }
}
