//! Feedback Sink
//!
//! Write path for actual outcomes, joined with the stored decision.
//! Blocking (store calls); the engine runs it on the blocking pool.

use std::sync::Arc;

use crate::error::{StorageError, StorageResult};
use crate::logic::storage::{DecisionStore, OutcomeRecord};

use super::types::{ratio, FeedbackSummary};

pub struct FeedbackSink {
    store: Arc<dyn DecisionStore>,
}

impl FeedbackSink {
    pub fn new(store: Arc<dyn DecisionStore>) -> Self {
        Self { store }
    }

    /// `RecordOutcome(transactionId, actualFraud, notes)`
    pub fn record_outcome(
        &self,
        transaction_id: &str,
        actual_fraud: bool,
        notes: &str,
    ) -> StorageResult<OutcomeRecord> {
        let decision = self
            .store
            .get_decision(transaction_id)?
            .ok_or_else(|| StorageError::NotFound(transaction_id.to_string()))?;

        let outcome = OutcomeRecord::from_decision(&decision.result, actual_fraud, notes);
        self.store.save_outcome(&outcome)?;

        tracing::info!(
            transaction_id,
            vertical = %outcome.vertical,
            actual_fraud,
            predicted = %outcome.predicted_decision,
            "Outcome recorded"
        );
        Ok(outcome)
    }

    pub fn summary(&self, vertical: Option<&str>) -> StorageResult<FeedbackSummary> {
        let outcomes = self.store.outcomes(vertical)?;
        Ok(summarize(vertical, &outcomes))
    }
}

pub fn summarize(vertical: Option<&str>, outcomes: &[OutcomeRecord]) -> FeedbackSummary {
    let mut summary = FeedbackSummary {
        vertical: vertical.map(str::to_string),
        ..FeedbackSummary::default()
    };

    for outcome in outcomes {
        summary.labelled += 1;
        if outcome.actual_fraud {
            summary.actual_fraud += 1;
        }

        match (outcome.predicted_fraud(), outcome.actual_fraud) {
            (true, true) => summary.true_positives += 1,
            (true, false) => summary.false_positives += 1,
            (false, true) => summary.false_negatives += 1,
            (false, false) => summary.true_negatives += 1,
        }

        for rule_id in &outcome.rule_ids {
            let entry = summary.rules.entry(rule_id.clone()).or_default();
            entry.triggered += 1;
            if outcome.actual_fraud {
                entry.confirmed_fraud += 1;
            }
        }
    }

    summary.precision = ratio(summary.true_positives, summary.true_positives + summary.false_positives);
    summary.recall = ratio(summary.true_positives, summary.true_positives + summary.false_negatives);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::context::TransactionContext;
    use crate::logic::policy::VerticalPolicy;
    use crate::logic::rules::{Flag, RuleCategory, Severity};
    use crate::logic::scoring::{aggregate, DecisionResult, ModelOutcome};
    use crate::logic::storage::{DecisionRecord, MemoryStore};

    fn flag(id: &str, score: u32) -> Flag {
        Flag {
            rule_id: id.to_string(),
            rule_name: id.to_string(),
            category: RuleCategory::Custom,
            severity: Severity::High,
            score,
            confidence: 1.0,
            message: String::new(),
            metadata: Default::default(),
        }
    }

    fn store_decision(store: &MemoryStore, id: &str, vertical: &str, flags: Vec<Flag>) {
        let breakdown = aggregate(flags, &VerticalPolicy::new(vertical), &ModelOutcome::NotConfigured);
        let result = DecisionResult::new(id, vertical, breakdown, Vec::new(), 1);
        store
            .save_decision(&DecisionRecord::new(result, TransactionContext::default()))
            .unwrap();
    }

    fn sink() -> FeedbackSink {
        let store = MemoryStore::new();
        // 80 → decline, 55 → review, 10 → approve (default 70/50)
        store_decision(&store, "t1", "lending", vec![flag("A", 50), flag("B", 30)]);
        store_decision(&store, "t2", "lending", vec![flag("A", 55)]);
        store_decision(&store, "t3", "lending", vec![flag("C", 10)]);
        store_decision(&store, "t4", "crypto", vec![]);
        FeedbackSink::new(Arc::new(store))
    }

    #[test]
    fn test_unknown_transaction() {
        let err = sink().record_outcome("nope", true, "").unwrap_err();
        assert!(matches!(err, StorageError::NotFound(id) if id == "nope"));
    }

    #[test]
    fn test_summary_counts() {
        let sink = sink();
        sink.record_outcome("t1", true, "chargeback").unwrap();
        sink.record_outcome("t2", false, "").unwrap();
        sink.record_outcome("t3", true, "missed").unwrap();
        sink.record_outcome("t4", false, "").unwrap();

        let lending = sink.summary(Some("lending")).unwrap();
        assert_eq!(lending.labelled, 3);
        assert_eq!(lending.true_positives, 1);
        assert_eq!(lending.false_positives, 1);
        assert_eq!(lending.false_negatives, 1);
        assert_eq!(lending.precision, Some(0.5));
        assert_eq!(lending.recall, Some(0.5));

        let a = &lending.rules["A"];
        assert_eq!((a.triggered, a.confirmed_fraud), (2, 1));
        assert_eq!(a.precision(), Some(0.5));

        let all = sink.summary(None).unwrap();
        assert_eq!(all.labelled, 4);
        assert_eq!(all.true_negatives, 1);
    }

    #[test]
    fn test_relabel_overwrites() {
        let sink = sink();
        sink.record_outcome("t1", true, "").unwrap();
        sink.record_outcome("t1", false, "dispute reversed").unwrap();

        let summary = sink.summary(Some("lending")).unwrap();
        assert_eq!(summary.labelled, 1);
        assert_eq!(summary.false_positives, 1);
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(Some("gaming"), &[]);
        assert_eq!(summary.labelled, 0);
        assert_eq!(summary.precision, None);
    }
}
