use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bad operator input. Caught where the input is entered; never sent to a node.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("node address must not be empty")]
    EmptyNodeAddress,

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("amount must be a positive number, got '{0}'")]
    InvalidAmount(String),
}

/// Body of `POST /transaction/new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
}

impl TransactionRequest {
    pub fn new(sender: &str, recipient: &str, amount: f64) -> Result<Self, ValidationError> {
        let sender = sender.trim();
        let recipient = recipient.trim();
        if sender.is_empty() {
            return Err(ValidationError::EmptyField("sender"));
        }
        if recipient.is_empty() {
            return Err(ValidationError::EmptyField("recipient"));
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ValidationError::InvalidAmount(amount.to_string()));
        }
        Ok(TransactionRequest {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount,
        })
    }
}

/// Raw text fields of the transaction form.
///
/// The form is only cleared after the node accepted the transaction, so a
/// failed submission can be retried as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionForm {
    pub sender: String,
    pub recipient: String,
    pub amount: String,
}

impl TransactionForm {
    pub fn new(sender: &str, recipient: &str, amount: &str) -> Self {
        TransactionForm {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount: amount.to_string(),
        }
    }

    pub fn validate(&self) -> Result<TransactionRequest, ValidationError> {
        let raw = self.amount.trim();
        if raw.is_empty() {
            return Err(ValidationError::EmptyField("amount"));
        }
        let amount: f64 = raw
            .parse()
            .map_err(|_| ValidationError::InvalidAmount(raw.to_string()))?;
        TransactionRequest::new(&self.sender, &self.recipient, amount)
    }

    pub fn clear(&mut self) {
        *self = TransactionForm::default();
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty() && self.recipient.is_empty() && self.amount.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_form_builds_request() {
        let form = TransactionForm::new(" alice ", "bob", "10.5");
        let req = form.validate().unwrap();
        assert_eq!(req.sender, "alice");
        assert_eq!(req.recipient, "bob");
        assert_eq!(req.amount, 10.5);
    }

    #[test]
    fn test_missing_fields_are_reported_by_name() {
        assert_eq!(
            TransactionForm::new("", "bob", "1").validate(),
            Err(ValidationError::EmptyField("sender"))
        );
        assert_eq!(
            TransactionForm::new("alice", "  ", "1").validate(),
            Err(ValidationError::EmptyField("recipient"))
        );
        assert_eq!(
            TransactionForm::new("alice", "bob", "").validate(),
            Err(ValidationError::EmptyField("amount"))
        );
    }

    #[test]
    fn test_bad_amounts_rejected() {
        for raw in ["ten", "0", "-3", "NaN", "inf"] {
            let err = TransactionForm::new("alice", "bob", raw).validate().unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidAmount(_)),
                "{} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_request_serializes_wire_shape() {
        let req = TransactionRequest::new("alice", "bob", 10.0).unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"sender": "alice", "recipient": "bob", "amount": 10.0})
        );
    }

    #[test]
    fn test_clear_resets_form() {
        let mut form = TransactionForm::new("alice", "bob", "1");
        assert!(!form.is_empty());
        form.clear();
        assert!(form.is_empty());
    }
}
