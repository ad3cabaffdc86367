use serde::{Deserialize, Serialize};

use crate::error::{MixerError, Result};

pub const PORT_ELECTROLYTE_LP30: u8 = 1;
pub const PORT_ADDITIVE_TEP: u8 = 2;
pub const PORT_ARGON_GAS: u8 = 3;
pub const PORT_ADDITIVE_X: u8 = 4;
pub const PORT_ADDITIVE_Y: u8 = 5;

/// Compounds offered in the pick lists.
pub const DEFAULT_COMPOUNDS: [&str; 3] = ["Compound 1", "Compound 2", "Compound 3"];

/// The closed set of dispensing slots. Declaration order is the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AdditiveId {
    #[serde(rename = "TEP")]
    Tep,
    #[serde(rename = "ADDITIVE_X")]
    AdditiveX,
    #[serde(rename = "ADDITIVE_Y")]
    AdditiveY,
    #[serde(rename = "LP30")]
    Lp30,
}

/// Slot that absorbs whatever the declared total leaves over.
pub const BASE_ADDITIVE: AdditiveId = AdditiveId::Lp30;

impl AdditiveId {
    pub const ALL: [AdditiveId; 4] = [
        AdditiveId::Tep,
        AdditiveId::AdditiveX,
        AdditiveId::AdditiveY,
        AdditiveId::Lp30,
    ];

    pub fn key(self) -> &'static str {
        match self {
            AdditiveId::Tep => "TEP",
            AdditiveId::AdditiveX => "ADDITIVE_X",
            AdditiveId::AdditiveY => "ADDITIVE_Y",
            AdditiveId::Lp30 => "LP30",
        }
    }

    pub fn port(self) -> u8 {
        match self {
            AdditiveId::Tep => PORT_ADDITIVE_TEP,
            AdditiveId::AdditiveX => PORT_ADDITIVE_X,
            AdditiveId::AdditiveY => PORT_ADDITIVE_Y,
            AdditiveId::Lp30 => PORT_ELECTROLYTE_LP30,
        }
    }

    pub fn is_base(self) -> bool {
        self == BASE_ADDITIVE
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.key() == key)
    }
}

impl std::fmt::Display for AdditiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Result of mapping an operator-facing compound name onto a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Canonical {
    Known(AdditiveId),
    /// Normalized key with no matching slot.
    Unrecognized(String),
}

/// Maps a compound name to its canonical identity.
///
/// The catalog aliases resolve first. Any other name is trimmed, uppercased and
/// has spaces replaced by underscores, so `"additive x"` lands on `ADDITIVE_X`.
pub fn normalize(name: &str) -> Canonical {
    let name = name.trim();
    match name {
        "Compound 1" => return Canonical::Known(AdditiveId::Tep),
        "Compound 2" => return Canonical::Known(AdditiveId::AdditiveX),
        "Compound 3" => return Canonical::Known(AdditiveId::AdditiveY),
        _ => {}
    }
    let key = name.to_uppercase().replace(' ', "_");
    match AdditiveId::from_key(&key) {
        Some(id) => Canonical::Known(id),
        None => Canonical::Unrecognized(key),
    }
}

/// One operator entry: a compound name and the percentage it should occupy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundSelection {
    name: String,
    percentage: f64,
}

impl CompoundSelection {
    pub fn new(name: impl Into<String>, percentage: f64) -> Result<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(MixerError::EmptyCompoundName);
        }
        if !percentage.is_finite() {
            return Err(MixerError::InvalidConcentration(percentage.to_string()));
        }
        if percentage < 0.0 {
            return Err(MixerError::NegativeConcentration(percentage));
        }
        Ok(CompoundSelection { name, percentage })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    pub fn canonical(&self) -> Canonical {
        normalize(&self.name)
    }

    pub(crate) fn scaled(&self, factor: f64) -> Self {
        CompoundSelection {
            name: self.name.clone(),
            percentage: self.percentage * factor,
        }
    }
}

impl std::fmt::Display for CompoundSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:.2}%", self.name, self.percentage)
    }
}

/// Parses a concentration field as typed by the operator. A trailing `%` is
/// accepted.
pub fn parse_concentration(input: &str) -> Result<f64> {
    let t = input.trim().trim_end_matches('%').trim();
    if t.is_empty() {
        return Err(MixerError::InvalidConcentration(input.to_string()));
    }
    let value = t
        .parse::<f64>()
        .map_err(|_| MixerError::InvalidConcentration(input.to_string()))?;
    if !value.is_finite() {
        return Err(MixerError::InvalidConcentration(input.to_string()));
    }
    if value < 0.0 {
        return Err(MixerError::NegativeConcentration(value));
    }
    Ok(value)
}

/// Sum of the raw percentages, regardless of identity.
pub fn total_percentage(selections: &[CompoundSelection]) -> f64 {
    selections.iter().map(|s| s.percentage).sum()
}
