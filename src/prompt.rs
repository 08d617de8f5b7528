use crate::record::{HealingStage, MAX_LIST_ENTRIES, WoundType};

/// Builds the instruction sent alongside the wound image.
///
/// The age-group rule is spelled out for the model so that advice is tailored
/// without the client carrying any medical logic of its own.
pub fn build_prompt(age: Option<u32>) -> String {
    let age = age.map_or_else(|| "unknown".to_string(), |a| a.to_string());
    let types = join_labels(WoundType::ALL.iter().map(|t| t.as_str()));
    let stages = join_labels(HealingStage::ALL.iter().map(|s| s.as_str()));

    format!(
        "You are a wound care assistant. Analyze the wound in the attached image.\n\
         Patient age: {age}.\n\
         Age groups: Child if age <= 12, Adult if age is 13-59, Elderly if age >= 60. \
         If the age is unknown, give advice suitable for any age.\n\
         Respond with ONLY a JSON object, no prose and no code fences, using this schema:\n\
         {{\n\
         \x20 \"type\": one of {types},\n\
         \x20 \"stage\": one of {stages},\n\
         \x20 \"severity\": integer from 0 to 100,\n\
         \x20 \"precautions\": array of at most {max} short strings,\n\
         \x20 \"meds\": array of at most {max} short care or medicine suggestions suited to the age group\n\
         }}",
        max = MAX_LIST_ENTRIES,
    )
}

fn join_labels<'a>(labels: impl Iterator<Item = &'a str>) -> String {
    labels
        .map(|l| format!("\"{l}\""))
        .collect::<Vec<_>>()
        .join(", ")
}
