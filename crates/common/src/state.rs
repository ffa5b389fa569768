use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::operation::OperationResponse;

/// Idempotency ledger a resource keeps for one caller.
///
/// `sequence` is the highest sequence processed so far; `responses` holds
/// the reply recorded at each sequence for replay; `prepared_actions` are
/// the payloads with a pending Prepare awaiting Confirm or Cancel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallerLedger {
    pub sequence: i64,
    #[serde(default)]
    pub prepared_actions: Vec<serde_json::Value>,
    #[serde(default)]
    pub responses: BTreeMap<i64, OperationResponse>,
}

/// Persisted state of one resource: the opaque domain state plus the
/// ledger per caller. Written wholesale after every mutating operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub inner_state: serde_json::Value,
    #[serde(default)]
    pub caller_ledgers: BTreeMap<String, CallerLedger>,
}

/// Terminal verdict of a saga body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SagaResult {
    pub completed: bool,
    pub succeeded: bool,
    #[serde(default)]
    pub error_messages: Vec<String>,
}

/// Persisted state of one saga: the domain input, the result, and the
/// participants whose ledgers must be wiped on completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaState {
    pub input: serde_json::Value,
    pub result: SagaResult,
    #[serde(default)]
    pub participants_to_clean_up: BTreeSet<String>,
}

impl SagaState {
    /// Fresh state for a newly received input, result zeroed.
    pub fn new(input: serde_json::Value) -> Self {
        Self {
            input,
            result: SagaResult::default(),
            participants_to_clean_up: BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_defaults_to_sequence_zero() {
        let ledger = CallerLedger::default();
        assert_eq!(ledger.sequence, 0);
        assert!(ledger.prepared_actions.is_empty());
        assert!(ledger.responses.is_empty());
    }

    #[test]
    fn ledger_serde_preserves_response_cache() {
        let mut ledger = CallerLedger::default();
        ledger.sequence = 2;
        ledger
            .responses
            .insert(1, OperationResponse::ok());
        ledger
            .responses
            .insert(2, OperationResponse::error("Insufficient funds"));

        let json = serde_json::to_string(&ledger).unwrap();
        let back: CallerLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ledger);
    }

    #[test]
    fn resource_state_serde_roundtrip() {
        let mut state = ResourceState::default();
        state.inner_state = serde_json::json!({"total_funds": 100});
        state
            .caller_ledgers
            .insert("TransferSaga/t-1".to_string(), CallerLedger::default());

        let json = serde_json::to_string(&state).unwrap();
        let back: ResourceState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn new_saga_state_is_incomplete() {
        let state = SagaState::new(serde_json::json!({"amount": 40}));
        assert!(!state.result.completed);
        assert!(!state.result.succeeded);
        assert!(state.participants_to_clean_up.is_empty());
    }
}
