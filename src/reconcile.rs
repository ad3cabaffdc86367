use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::additives::{AdditiveId, Canonical, CompoundSelection, BASE_ADDITIVE};

/// Allocation record for one dispensing slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdditiveSlot {
    pub id: AdditiveId,
    pub port: u8,
    pub used: bool,
    pub percentage: f64,
    /// Dispensed volume in ml.
    pub volume: f64,
}

impl AdditiveSlot {
    fn empty(id: AdditiveId) -> Self {
        AdditiveSlot {
            id,
            port: id.port(),
            used: false,
            percentage: 0.0,
            volume: 0.0,
        }
    }
}

/// Every slot of the closed set, keyed by identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditiveMap {
    slots: BTreeMap<AdditiveId, AdditiveSlot>,
}

impl AdditiveMap {
    /// Idle state before any run: the whole batch is base electrolyte.
    pub fn idle(total_volume: f64) -> Self {
        reconcile(&[], 0.0, total_volume).additives
    }

    fn cleared() -> Self {
        AdditiveMap {
            slots: AdditiveId::ALL
                .into_iter()
                .map(|id| (id, AdditiveSlot::empty(id)))
                .collect(),
        }
    }

    pub fn get(&self, id: AdditiveId) -> &AdditiveSlot {
        // Every identity is inserted by `cleared`.
        &self.slots[&id]
    }

    pub fn iter(&self) -> impl Iterator<Item = &AdditiveSlot> {
        self.slots.values()
    }

    pub fn used(&self) -> impl Iterator<Item = &AdditiveSlot> {
        self.slots.values().filter(|s| s.used)
    }

    pub fn used_percentage(&self) -> f64 {
        self.used().map(|s| s.percentage).sum()
    }

    pub fn used_volume(&self) -> f64 {
        self.used().map(|s| s.volume).sum()
    }
}

/// A compound whose normalized key has no slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnrecognizedCompound {
    pub key: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub additives: AdditiveMap,
    /// Identities excluded from `additives`, with their summed percentage.
    pub unrecognized: Vec<UnrecognizedCompound>,
}

/// Turns operator selections plus the declared total into a slot mapping with
/// volumes.
///
/// Percentages for the same identity accumulate. The base slot is always used
/// and receives `max(0, 100 - declared_total)`. Volumes are
/// `percentage / 100 * total_volume` for used slots. The function does not
/// check that the sums agree with the declared total; that is advisory and
/// belongs to the session.
pub fn reconcile(
    selections: &[CompoundSelection],
    declared_total: f64,
    total_volume: f64,
) -> Reconciliation {
    let mut additives = AdditiveMap::cleared();

    let mut known: BTreeMap<AdditiveId, f64> = BTreeMap::new();
    let mut unknown: BTreeMap<String, f64> = BTreeMap::new();
    for selection in selections {
        match selection.canonical() {
            Canonical::Known(id) => *known.entry(id).or_insert(0.0) += selection.percentage(),
            Canonical::Unrecognized(key) => *unknown.entry(key).or_insert(0.0) += selection.percentage(),
        }
    }

    for (id, percentage) in known {
        if percentage > 0.0 {
            if let Some(slot) = additives.slots.get_mut(&id) {
                slot.used = true;
                slot.percentage = percentage;
            }
        }
    }

    let leftover = (100.0 - declared_total).max(0.0);
    if let Some(base) = additives.slots.get_mut(&BASE_ADDITIVE) {
        base.used = true;
        base.percentage = leftover;
    }

    for slot in additives.slots.values_mut().filter(|s| s.used) {
        slot.volume = slot.percentage / 100.0 * total_volume;
    }

    Reconciliation {
        additives,
        unrecognized: unknown
            .into_iter()
            .filter(|(_, percentage)| *percentage > 0.0)
            .map(|(key, percentage)| UnrecognizedCompound { key, percentage })
            .collect(),
    }
}
