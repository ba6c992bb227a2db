use crate::extract::{circuit_identity, Category, MetricReading, Unit};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorDefinition {
    pub identity: String,
    pub display_name: String,
    pub unit: &'static str,
    pub device_class: &'static str,
    pub unique_id: String,
}

/// Maps metric identities to stable sensor definitions and remembers which
/// identities have been announced this process lifetime.
#[derive(Debug)]
pub struct SensorRegistry {
    device_id: String,
    seen: BTreeSet<String>,
}

impl SensorRegistry {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            seen: BTreeSet::new(),
        }
    }

    /// Pure mapping from reading to sensor definition. Same identity and
    /// device id always yield the same definition, also across restarts, so
    /// retained discovery registrations stay valid.
    pub fn resolve(&self, reading: &MetricReading) -> SensorDefinition {
        SensorDefinition {
            identity: reading.identity.clone(),
            display_name: reading.category.display_name(reading.circuit_index),
            unit: reading.unit.as_str(),
            device_class: match reading.unit {
                Unit::KilowattHours => "energy",
                Unit::Watts => "power",
            },
            unique_id: format!("{}_{}", self.device_id, reading.identity),
        }
    }

    pub fn is_first_seen(&self, identity: &str) -> bool {
        !self.seen.contains(identity)
    }

    pub fn mark_seen(&mut self, identity: &str) {
        self.seen.insert(identity.to_string());
    }

    pub fn all_known_identities(&self) -> &BTreeSet<String> {
        &self.seen
    }

    /// Every identity this configuration can ever produce: the four totals
    /// plus circuits 1..=circuit_max. Used by the cleanup tool, which has no
    /// process history to enumerate.
    pub fn configured_identities(circuit_max: u16) -> Vec<String> {
        let mut out: Vec<String> = Category::TOTALS
            .iter()
            .map(|c| c.key().to_string())
            .collect();
        out.extend((1..=circuit_max).map(circuit_identity));
        out
    }
}
