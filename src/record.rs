//! The wound assessment record and its derived fields.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of entries kept in `precautions` and `meds`.
pub const MAX_LIST_ENTRIES: usize = 4;
/// Upper bound of the severity score.
pub const MAX_SEVERITY: u8 = 100;

/// Wound classification label.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WoundType {
    Burn,
    Cut,
    #[serde(rename = "Diabetic Foot Ulcer")]
    DiabeticFootUlcer,
    #[serde(rename = "Infected Wound")]
    InfectedWound,
    #[default]
    Other,
}

impl WoundType {
    pub const ALL: [WoundType; 5] = [
        WoundType::Burn,
        WoundType::Cut,
        WoundType::DiabeticFootUlcer,
        WoundType::InfectedWound,
        WoundType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WoundType::Burn => "Burn",
            WoundType::Cut => "Cut",
            WoundType::DiabeticFootUlcer => "Diabetic Foot Ulcer",
            WoundType::InfectedWound => "Infected Wound",
            WoundType::Other => "Other",
        }
    }

    /// Case-insensitive lookup; unknown labels map to `Other`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(label))
            .unwrap_or_default()
    }
}

/// Healing phase label.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealingStage {
    Inflammatory,
    Proliferative,
    Maturation,
    #[default]
    Unknown,
}

impl HealingStage {
    pub const ALL: [HealingStage; 4] = [
        HealingStage::Inflammatory,
        HealingStage::Proliferative,
        HealingStage::Maturation,
        HealingStage::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealingStage::Inflammatory => "Inflammatory",
            HealingStage::Proliferative => "Proliferative",
            HealingStage::Maturation => "Maturation",
            HealingStage::Unknown => "Unknown",
        }
    }

    /// Case-insensitive lookup; unknown labels map to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(label))
            .unwrap_or_default()
    }
}

/// Age bucket used to tailor advice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeGroup {
    Child,
    Adult,
    Elderly,
    #[serde(rename = "Any Age")]
    AnyAge,
}

impl AgeGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Child => "Child",
            AgeGroup::Adult => "Adult",
            AgeGroup::Elderly => "Elderly",
            AgeGroup::AnyAge => "Any Age",
        }
    }
}

macro_rules! impl_display_via_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

impl_display_via_as_str!(WoundType, HealingStage, AgeGroup);

/// Parses the free-form age field. Empty, non-numeric and negative input is absent.
pub fn parse_age(input: &str) -> Option<u32> {
    let value: f64 = input.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    // saturating float-to-int cast
    Some(value.trunc() as u32)
}

pub fn age_group(age: Option<u32>) -> AgeGroup {
    match age {
        None => AgeGroup::AnyAge,
        Some(0..=12) => AgeGroup::Child,
        Some(13..=59) => AgeGroup::Adult,
        Some(_) => AgeGroup::Elderly,
    }
}

/// The model-derived part of a record, already normalized.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisCore {
    #[serde(rename = "type")]
    pub wound_type: WoundType,
    pub stage: HealingStage,
    pub severity: u8,
    pub precautions: Vec<String>,
    pub meds: Vec<String>,
}

impl AnalysisCore {
    /// Re-applies the record invariants to data that did not pass through normalization.
    pub fn sanitize(&mut self) {
        self.severity = self.severity.min(MAX_SEVERITY);
        for list in [&mut self.precautions, &mut self.meds] {
            list.retain_mut(|entry| {
                let trimmed = entry.trim();
                if trimmed.len() != entry.len() {
                    *entry = trimmed.to_string();
                }
                !entry.is_empty()
            });
            list.truncate(MAX_LIST_ENTRIES);
        }
    }
}

/// One normalized assessment tied to one submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Milliseconds since the Unix epoch, assigned at creation.
    pub timestamp: i64,
    pub image_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_group: Option<AgeGroup>,
    #[serde(flatten)]
    pub core: AnalysisCore,
}

impl AnalysisResult {
    /// Builds a record stamped with the current time. The age group is derived once here.
    pub fn new(core: AnalysisCore, image_source: String, age: Option<u32>) -> Self {
        Self::with_timestamp(chrono::Utc::now().timestamp_millis(), core, image_source, age)
    }

    pub fn with_timestamp(
        timestamp: i64,
        core: AnalysisCore,
        image_source: String,
        age: Option<u32>,
    ) -> Self {
        Self {
            timestamp,
            image_source,
            age,
            age_group: Some(age_group(age)),
            core,
        }
    }

    /// Local creation time, if the timestamp is representable.
    pub fn created_at(&self) -> Option<chrono::DateTime<chrono::Local>> {
        chrono::DateTime::<chrono::Utc>::from_timestamp_millis(self.timestamp)
            .map(|utc| utc.with_timezone(&chrono::Local))
    }
}
