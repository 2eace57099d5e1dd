// argus_core/src/estimation/history.rs

use std::collections::VecDeque;

use crate::config::HistoryConfig;
use crate::error::HistoryError;
use crate::frames::FilterState;
use crate::types::StateIndex;

/// A bounded, time-ordered buffer of filter-state snapshots.
///
/// Snapshots are appended in time order. When the buffer is full the oldest
/// snapshot is evicted. Every snapshot gets a fresh [`StateIndex`].
#[derive(Debug, Clone)]
pub struct StateHistory {
    config: HistoryConfig,
    entries: VecDeque<(StateIndex, FilterState)>,
    next_index: u64,
}

impl StateHistory {
    pub fn new(config: HistoryConfig) -> Self {
        assert!(config.capacity > 0, "StateHistory: capacity must be positive");
        Self {
            config,
            entries: VecDeque::with_capacity(config.capacity),
            next_index: 0,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a snapshot and returns its index.
    ///
    /// A snapshot older than the newest buffered one is still accepted, but
    /// it is inserted at its place in time so lookups stay ordered.
    pub fn push(&mut self, state: FilterState) -> StateIndex {
        let index = StateIndex(self.next_index);
        self.next_index += 1;

        if self.entries.len() == self.config.capacity {
            self.entries.pop_front();
        }

        let position = self
            .entries
            .iter()
            .rposition(|(_, s)| s.timestamp <= state.timestamp)
            .map_or(0, |i| i + 1);
        self.entries.insert(position, (index, state));
        index
    }

    /// The newest snapshot.
    pub fn latest(&self) -> Option<(StateIndex, &FilterState)> {
        self.entries.back().map(|(i, s)| (*i, s))
    }

    pub fn get(&self, index: StateIndex) -> Option<&FilterState> {
        self.entries
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, s)| s)
    }

    pub fn get_mut(&mut self, index: StateIndex) -> Option<&mut FilterState> {
        self.entries
            .iter_mut()
            .find(|(i, _)| *i == index)
            .map(|(_, s)| s)
    }

    /// Mutable access to every snapshot newer than `timestamp`.
    pub fn newer_than_mut(&mut self, timestamp: f64) -> impl Iterator<Item = &mut FilterState> {
        self.entries
            .iter_mut()
            .map(|(_, s)| s)
            .filter(move |s| s.timestamp > timestamp)
    }

    /// Finds the snapshot nearest to `timestamp`.
    ///
    /// Fails with [`HistoryError::NotFound`] when the nearest snapshot is
    /// farther than the configured tolerance.
    pub fn closest(&self, timestamp: f64) -> Result<(StateIndex, &FilterState), HistoryError> {
        let (index, state) = self
            .entries
            .iter()
            .min_by(|(_, a), (_, b)| {
                (a.timestamp - timestamp)
                    .abs()
                    .total_cmp(&(b.timestamp - timestamp).abs())
            })
            .ok_or(HistoryError::Empty)?;

        if (state.timestamp - timestamp).abs() > self.config.tolerance {
            return Err(HistoryError::NotFound {
                query: timestamp,
                nearest: state.timestamp,
                tolerance: self.config.tolerance,
            });
        }
        Ok((*index, state))
    }
}

impl Default for StateHistory {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}
