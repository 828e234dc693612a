use std::collections::BTreeMap;

use tracing::{debug, error};

use crate::{
    errors::{AttestError, Result},
    measurement::{MeasurementKey, MeasurementRecord, MeasurementValue},
};

/// Measurements received from one device, keyed by what was measured.
///
/// Every evidence source of a single verification feeds the same aggregate.
/// A key may be reported by more than one source as long as all of them
/// agree on its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurementAggregate {
    map: BTreeMap<MeasurementKey, MeasurementValue>,
}

impl MeasurementAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds records to the aggregate.
    ///
    /// Records without any key or value information are ignored and a record
    /// equal to one already present is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AttestError::AggregationConflict` if a key is already present
    /// with a different value. Records preceding the conflicting one stay in
    /// the aggregate.
    pub fn add(&mut self, records: impl IntoIterator<Item = MeasurementRecord>) -> Result<()> {
        for MeasurementRecord { key, value } in records {
            if key.is_empty() && value.is_empty() {
                debug!("Ignoring empty measurement record");
                continue;
            }
            match self.map.get(&key) {
                Some(existing) if *existing == value => {
                    debug!(key = %key, "Measurement already aggregated");
                }
                Some(existing) => {
                    error!(
                        key = %key,
                        existing = ?existing,
                        new = ?value,
                        "Conflicting measurements reported for the same key"
                    );
                    return Err(AttestError::AggregationConflict {
                        key,
                        existing: existing.clone(),
                        new: value,
                    });
                }
                None => {
                    self.map.insert(key, value);
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &MeasurementKey) -> Option<&MeasurementValue> {
        self.map.get(key)
    }

    pub fn map(&self) -> &BTreeMap<MeasurementKey, MeasurementValue> {
        &self.map
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MeasurementKey, &MeasurementValue)> {
        self.map.iter()
    }
}

impl std::fmt::Display for MeasurementAggregate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{{")?;
        for (key, value) in &self.map {
            writeln!(f, "\t{key} = {value:?}")?;
        }
        write!(f, "}}")
    }
}
