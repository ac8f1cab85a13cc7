//! Emergency messaging
//!
//! Bulk delivery runs strictly in sequence, one request per recipient.
//! Each recipient succeeds or fails on its own: a transport error or a
//! `success: false` reply puts that number on the failed list and the loop
//! moves on. Nothing is retried.

use crate::error::{OrchestratorError, Result};
use drc_core::{DisasterPrediction, SmsGateway};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Editable recipient list: no blanks, no duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientList {
    numbers: Vec<String>,
}

impl RecipientList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a number. Returns false for a blank or already-listed number.
    pub fn add(&mut self, number: impl Into<String>) -> bool {
        let number = number.into().trim().to_string();
        if number.is_empty() || self.numbers.contains(&number) {
            return false;
        }
        self.numbers.push(number);
        true
    }

    /// Remove by position
    pub fn remove(&mut self, index: usize) -> Option<String> {
        (index < self.numbers.len()).then(|| self.numbers.remove(index))
    }

    pub fn numbers(&self) -> &[String] {
        &self.numbers
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for RecipientList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = Self::new();
        for number in iter {
            list.add(number);
        }
        list
    }
}

/// Per-recipient outcome of a bulk send, each list in send order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSendResult {
    pub success: Vec<String>,
    pub failed: Vec<String>,
}

/// Overall result of a bulk send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryOutcome {
    AllSucceeded,
    Partial,
    AllFailed,
}

impl BulkSendResult {
    pub fn outcome(&self) -> DeliveryOutcome {
        match (self.success.is_empty(), self.failed.is_empty()) {
            (_, true) => DeliveryOutcome::AllSucceeded,
            (false, false) => DeliveryOutcome::Partial,
            (true, false) => DeliveryOutcome::AllFailed,
        }
    }

    /// Operator-facing summary line
    pub fn summary(&self) -> String {
        match self.outcome() {
            DeliveryOutcome::AllSucceeded => {
                format!("Alert sent to {} recipients", self.success.len())
            }
            DeliveryOutcome::Partial => format!(
                "{} messages sent, {} failed",
                self.success.len(),
                self.failed.len()
            ),
            DeliveryOutcome::AllFailed => {
                "All messages failed to send. Please check the numbers and try again.".to_string()
            }
        }
    }
}

/// Send `body` to every number in order
pub async fn send_bulk<G>(gateway: &G, numbers: &[String], body: &str) -> Result<BulkSendResult>
where
    G: SmsGateway + ?Sized,
{
    if numbers.is_empty() {
        return Err(OrchestratorError::validation("at least one recipient is required"));
    }
    if body.trim().is_empty() {
        return Err(OrchestratorError::validation("message body is empty"));
    }

    let mut result = BulkSendResult::default();
    for number in numbers {
        match gateway.send_sms(number, body).await {
            Ok(response) if response.success => result.success.push(number.clone()),
            Ok(response) => {
                warn!(to = %number, error = ?response.error, "SMS not delivered");
                result.failed.push(number.clone());
            }
            Err(e) => {
                warn!(to = %number, error = %e, "SMS send failed");
                result.failed.push(number.clone());
            }
        }
    }

    info!(
        sent = result.success.len(),
        failed = result.failed.len(),
        "{}",
        result.summary()
    );
    Ok(result)
}

/// Alert text for an accepted prediction
pub fn emergency_message(prediction: &DisasterPrediction) -> String {
    format!(
        "EMERGENCY ALERT: {} {} predicted in {} area. Expected at {}. \
         Please seek shelter immediately and follow official instructions. \
         DO NOT attempt to travel to affected areas.",
        prediction.severity.as_str().to_uppercase(),
        prediction.kind.as_str().to_uppercase(),
        prediction.location.name,
        prediction.estimated_time.format("%H:%M:%S"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use drc_core::{DisasterType, DrcError, PredictionArea, Severity, SmsResponse};
    use std::sync::Mutex;

    /// Scripted gateway: replies in order, records every call
    struct ScriptedGateway {
        replies: Mutex<Vec<drc_core::Result<SmsResponse>>>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedGateway {
        fn new(replies: Vec<drc_core::Result<SmsResponse>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SmsGateway for ScriptedGateway {
        async fn send_sms(&self, to: &str, body: &str) -> drc_core::Result<SmsResponse> {
            self.calls.lock().unwrap().push((to.to_string(), body.to_string()));
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(DrcError::internal("script exhausted")))
        }
    }

    fn ok() -> drc_core::Result<SmsResponse> {
        Ok(SmsResponse {
            success: true,
            message: "sent".to_string(),
            sid: Some("SM1".to_string()),
            error: None,
        })
    }

    fn rejected() -> drc_core::Result<SmsResponse> {
        Ok(SmsResponse {
            success: false,
            message: "rejected".to_string(),
            sid: None,
            error: Some("invalid number".to_string()),
        })
    }

    fn numbers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_second_recipient_fails() {
        let gateway = ScriptedGateway::new(vec![ok(), rejected(), ok()]);
        let to = numbers(&["+1001", "+1002", "+1003"]);

        let result = tokio_test::block_on(send_bulk(&gateway, &to, "evacuate")).unwrap();

        assert_eq!(result.success, numbers(&["+1001", "+1003"]));
        assert_eq!(result.failed, numbers(&["+1002"]));
        assert_eq!(result.outcome(), DeliveryOutcome::Partial);
        assert_eq!(result.summary(), "2 messages sent, 1 failed");

        let calls = gateway.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(_, body)| body == "evacuate"));
    }

    #[test]
    fn test_transport_error_is_per_recipient() {
        let gateway = ScriptedGateway::new(vec![Err(DrcError::network("timeout")), ok()]);
        let to = numbers(&["+1001", "+1002"]);

        let result = tokio_test::block_on(send_bulk(&gateway, &to, "evacuate")).unwrap();
        assert_eq!(result.success, numbers(&["+1002"]));
        assert_eq!(result.failed, numbers(&["+1001"]));
    }

    #[test]
    fn test_outcomes() {
        let gateway = ScriptedGateway::new(vec![ok(), ok()]);
        let result =
            tokio_test::block_on(send_bulk(&gateway, &numbers(&["+1", "+2"]), "hi")).unwrap();
        assert_eq!(result.outcome(), DeliveryOutcome::AllSucceeded);
        assert_eq!(result.summary(), "Alert sent to 2 recipients");

        let gateway = ScriptedGateway::new(vec![rejected()]);
        let result = tokio_test::block_on(send_bulk(&gateway, &numbers(&["+1"]), "hi")).unwrap();
        assert_eq!(result.outcome(), DeliveryOutcome::AllFailed);
    }

    #[test]
    fn test_rejects_empty_input() {
        let gateway = ScriptedGateway::new(vec![]);
        assert!(matches!(
            tokio_test::block_on(send_bulk(&gateway, &[], "hi")),
            Err(OrchestratorError::Validation(_))
        ));
        assert!(matches!(
            tokio_test::block_on(send_bulk(&gateway, &numbers(&["+1"]), "   ")),
            Err(OrchestratorError::Validation(_))
        ));
        assert!(gateway.calls().is_empty());
    }

    #[test]
    fn test_recipient_list() {
        let mut list = RecipientList::new();
        assert!(list.add("+1001"));
        assert!(list.add(" +1002 "));
        assert!(!list.add("+1001"));
        assert!(!list.add("  "));
        assert_eq!(list.numbers(), &numbers(&["+1001", "+1002"])[..]);

        assert_eq!(list.remove(0).as_deref(), Some("+1001"));
        assert_eq!(list.remove(5), None);
        assert_eq!(list.len(), 1);

        let list: RecipientList = ["+1", "+2", "+1", ""].into_iter().collect();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_emergency_message() {
        let prediction = DisasterPrediction {
            id: "pred-1".to_string(),
            kind: DisasterType::Landslide,
            probability: 0.85,
            location: PredictionArea {
                name: "Mangan".to_string(),
                latitude: 27.5167,
                longitude: 88.5333,
                radius: 900.0,
            },
            estimated_time: DateTime::parse_from_rfc3339("2024-06-01T14:05:09Z")
                .unwrap()
                .with_timezone(&Utc),
            severity: Severity::Extreme,
            description: String::new(),
            affected_areas: vec!["Mangan".to_string()],
            triggered_by: Vec::new(),
        };

        assert_eq!(
            emergency_message(&prediction),
            "EMERGENCY ALERT: EXTREME LANDSLIDE predicted in Mangan area. Expected at 14:05:09. \
             Please seek shelter immediately and follow official instructions. \
             DO NOT attempt to travel to affected areas."
        );
    }
}
