use serde::{Deserialize, Serialize};

/// Structured narrative returned by the narrative generator
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiInsights {
    pub archetype: String,
    pub archetype_description: String,
    pub narrative: String,
    /// One-line quote for the share card
    pub card_insight: String,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,

    // Richer sections the model may or may not produce
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executive_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archetype_explanation: Option<ArchetypeExplanation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_looking: Option<ForwardLooking>,
}

/// Why the archetype was chosen
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchetypeExplanation {
    #[serde(default)]
    pub reasoning: Vec<String>,
    #[serde(default)]
    pub key_factors: Vec<KeyFactor>,
    /// 0.0 to 1.0, as reported by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyFactor {
    pub factor: String,
    pub evidence: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwardLooking {
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub opportunities: Vec<String>,
}
