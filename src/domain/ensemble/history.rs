use super::method::AggregationMethod;
use crate::domain::signal::{EnsembleSignal, ModelSignal};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One aggregation call: the input batch, the decision, and the realized outcome once known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub sequence: u64,
    pub method: AggregationMethod,
    pub regime: Option<String>,
    pub signals: Vec<ModelSignal>,
    pub ensemble: EnsembleSignal,
    /// Meta-learner input that produced a stacking decision
    pub meta_features: Option<Vec<f64>>,
    pub outcome: Option<f64>,
}

/// Fixed-capacity ring buffer of decisions, evicting the oldest entry when full
#[derive(Debug, Clone)]
pub struct DecisionHistory {
    capacity: usize,
    records: VecDeque<DecisionRecord>,
    next_sequence: u64,
}

impl DecisionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
            next_sequence: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a decision and returns its sequence number
    pub fn push(
        &mut self,
        method: AggregationMethod,
        signals: Vec<ModelSignal>,
        ensemble: EnsembleSignal,
        meta_features: Option<Vec<f64>>,
    ) -> u64 {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.records.push_back(DecisionRecord {
            sequence,
            method,
            regime: ensemble.regime.clone(),
            signals,
            ensemble,
            meta_features,
            outcome: None,
        });
        sequence
    }

    pub fn latest(&self) -> Option<&DecisionRecord> {
        self.records.back()
    }

    pub fn get(&self, sequence: u64) -> Option<&DecisionRecord> {
        // Sequences are contiguous, so the offset from the oldest entry is the index
        let oldest = self.records.front()?.sequence;
        let index = sequence.checked_sub(oldest)? as usize;
        self.records.get(index)
    }

    pub fn get_mut(&mut self, sequence: u64) -> Option<&mut DecisionRecord> {
        let oldest = self.records.front()?.sequence;
        let index = sequence.checked_sub(oldest)? as usize;
        self.records.get_mut(index)
    }

    pub fn records(&self) -> impl Iterator<Item = &DecisionRecord> {
        self.records.iter()
    }

    /// Ensemble decisions, oldest first
    pub fn ensembles(&self) -> Vec<EnsembleSignal> {
        self.records.iter().map(|r| r.ensemble.clone()).collect()
    }

    /// Realized outcomes aligned with `ensembles()`
    pub fn outcomes(&self) -> Vec<Option<f64>> {
        self.records.iter().map(|r| r.outcome).collect()
    }

    /// Drops every record. Sequence numbers keep increasing so stale ids never alias.
    pub fn reset(&mut self) {
        self.records.clear();
    }
}
