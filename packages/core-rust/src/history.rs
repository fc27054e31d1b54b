//! Append-only ledger of performed calculations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which calculation mode produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Origin {
    Stack,
    Independent,
}

impl Origin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stack => "STACK",
            Self::Independent => "INDEPENDENT",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown origin tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown origin: {0}")]
pub struct UnknownOrigin(pub String);

impl FromStr for Origin {
    type Err = UnknownOrigin;

    /// Parses the exact upper-case tags `STACK` and `INDEPENDENT`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STACK" => Ok(Self::Stack),
            "INDEPENDENT" => Ok(Self::Independent),
            other => Err(UnknownOrigin(other.to_string())),
        }
    }
}

/// One performed calculation. Immutable once recorded.
///
/// Serializes with the wire field name `flavor` for the origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "flavor")]
    pub origin: Origin,
    pub operation: String,
    pub arguments: Vec<i64>,
    pub result: i64,
}

/// Chronologically ordered list of [`HistoryEntry`] values.
///
/// Entries are only ever appended or cleared all at once; they are never
/// reordered or mutated in place.
#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
}

impl HistoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(
        &mut self,
        origin: Origin,
        operation: impl Into<String>,
        arguments: Vec<i64>,
        result: i64,
    ) {
        self.entries.push(HistoryEntry {
            origin,
            operation: operation.into(),
            arguments,
            result,
        });
    }

    /// Returns entries in insertion order, optionally restricted to one origin.
    ///
    /// With no filter the whole ledger is returned in global chronological
    /// order; stack and independent entries stay interleaved as recorded.
    #[must_use]
    pub fn fetch(&self, filter: Option<Origin>) -> Vec<HistoryEntry> {
        match filter {
            Some(origin) => self
                .entries
                .iter()
                .filter(|entry| entry.origin == origin)
                .cloned()
                .collect(),
            None => self.entries.clone(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HistoryLedger {
        let mut ledger = HistoryLedger::new();
        ledger.record(Origin::Independent, "plus", vec![2, 3], 5);
        ledger.record(Origin::Stack, "minus", vec![20, 10], 10);
        ledger.record(Origin::Independent, "abs", vec![-4], 4);
        ledger.record(Origin::Stack, "times", vec![3, 3], 9);
        ledger
    }

    #[test]
    fn fetch_all_is_chronological() {
        let ops: Vec<_> = sample()
            .fetch(None)
            .into_iter()
            .map(|e| e.operation)
            .collect();
        assert_eq!(ops, vec!["plus", "minus", "abs", "times"]);
    }

    #[test]
    fn fetch_filters_by_origin_preserving_order() {
        let ledger = sample();
        let stack: Vec<_> = ledger
            .fetch(Some(Origin::Stack))
            .into_iter()
            .map(|e| e.operation)
            .collect();
        assert_eq!(stack, vec!["minus", "times"]);

        let independent = ledger.fetch(Some(Origin::Independent));
        assert!(independent.iter().all(|e| e.origin == Origin::Independent));
        assert_eq!(independent.len(), 2);
    }

    #[test]
    fn clear_removes_everything() {
        let mut ledger = sample();
        assert_eq!(ledger.len(), 4);
        ledger.clear();
        assert!(ledger.is_empty());
        assert!(ledger.fetch(None).is_empty());
    }

    #[test]
    fn entry_serializes_with_flavor_field() {
        let entry = HistoryEntry {
            origin: Origin::Stack,
            operation: "minus".to_string(),
            arguments: vec![20, 10],
            result: 10,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "flavor": "STACK",
                "operation": "minus",
                "arguments": [20, 10],
                "result": 10,
            })
        );
    }

    #[test]
    fn origin_round_trips_through_str() {
        for origin in [Origin::Stack, Origin::Independent] {
            assert_eq!(origin.as_str().parse::<Origin>().unwrap(), origin);
        }
        assert!("Stack".parse::<Origin>().is_err());
    }
}
