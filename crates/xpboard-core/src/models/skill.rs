//! Skill transactions and the radar chart axes built from them.

use serde::{Deserialize, Serialize};

use crate::api::queries::SKILL_TYPES;

/// Skill amount that fills a radar axis completely
const SKILL_AXIS_MAX: f64 = 100.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillTransaction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// One spoke of the skills radar chart.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillAxis {
    pub skill_type: &'static str,
    pub label: &'static str,
    /// Fraction of the axis filled, in `[0, 1]`
    pub value: f64,
    pub raw: f64,
}

pub fn skill_label(skill_type: &str) -> Option<&'static str> {
    match skill_type {
        "skill_prog" => Some("Prog"),
        "skill_go" => Some("Go"),
        "skill_back-end" => Some("Back-End"),
        "skill_front-end" => Some("Front-End"),
        "skill_js" => Some("JS"),
        "skill_php" => Some("Php"),
        _ => None,
    }
}

/// Radar axes in fixed order, one per charted skill.
///
/// Skills with no transaction get a zero axis; when a type repeats, the
/// largest amount wins.
pub fn skill_axes(skills: &[SkillTransaction]) -> Vec<SkillAxis> {
    SKILL_TYPES
        .iter()
        .map(|&skill_type| {
            let raw = skills
                .iter()
                .filter(|s| s.kind == skill_type)
                .filter_map(|s| s.amount)
                .fold(0.0_f64, f64::max);
            SkillAxis {
                skill_type,
                label: skill_label(skill_type).unwrap_or(skill_type),
                value: (raw / SKILL_AXIS_MAX).clamp(0.0, 1.0),
                raw,
            }
        })
        .collect()
}
