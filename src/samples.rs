//! Built-in illustrative assessments shown without calling the endpoint.

use crate::record::{AnalysisCore, AnalysisResult, HealingStage, WoundType};

struct Sample {
    image: &'static str,
    age: Option<u32>,
    wound_type: WoundType,
    stage: HealingStage,
    severity: u8,
    precautions: &'static [&'static str],
    meds: &'static [&'static str],
}

const SAMPLES: [Sample; 4] = [
    Sample {
        image: "samples/burn.jpg",
        age: Some(34),
        wound_type: WoundType::Burn,
        stage: HealingStage::Inflammatory,
        severity: 45,
        precautions: &[
            "Cool the area under running water for 20 minutes",
            "Do not pop blisters",
            "Keep the burn covered with a clean non-stick dressing",
        ],
        meds: &["Silver sulfadiazine cream", "Paracetamol for pain"],
    },
    Sample {
        image: "samples/cut.jpg",
        age: Some(9),
        wound_type: WoundType::Cut,
        stage: HealingStage::Proliferative,
        severity: 20,
        precautions: &["Keep the wound clean and dry", "Change the bandage daily"],
        meds: &["Antiseptic solution", "Child-safe antibiotic ointment"],
    },
    Sample {
        image: "samples/diabetic-foot-ulcer.jpg",
        age: Some(67),
        wound_type: WoundType::DiabeticFootUlcer,
        stage: HealingStage::Inflammatory,
        severity: 78,
        precautions: &[
            "Avoid putting weight on the affected foot",
            "Monitor blood glucose closely",
            "Inspect both feet daily",
            "See a foot care specialist promptly",
        ],
        meds: &["Saline wound cleanser", "Hydrocolloid dressing"],
    },
    Sample {
        image: "samples/infected-wound.jpg",
        age: None,
        wound_type: WoundType::InfectedWound,
        stage: HealingStage::Inflammatory,
        severity: 85,
        precautions: &[
            "Seek medical attention",
            "Watch for fever or spreading redness",
        ],
        meds: &["Povidone-iodine solution", "Sterile gauze"],
    },
];

/// Returns the sample records, stamped with fixed timestamps.
pub fn sample_results() -> Vec<AnalysisResult> {
    SAMPLES
        .iter()
        .enumerate()
        .map(|(i, s)| {
            AnalysisResult::with_timestamp(
                i as i64,
                AnalysisCore {
                    wound_type: s.wound_type,
                    stage: s.stage,
                    severity: s.severity,
                    precautions: s.precautions.iter().map(|p| p.to_string()).collect(),
                    meds: s.meds.iter().map(|m| m.to_string()).collect(),
                },
                s.image.to_string(),
                s.age,
            )
        })
        .collect()
}
