// ── Analysis Response ──
//
// The structured result of one consultation, the schema declared to the
// model, and strict parsing of the model's JSON text.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, SakuraError};

// ── Types ──

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub skin_analysis: SkinAnalysis,
    pub beauty_advice: BeautyAdvice,
    pub health_advice: HealthAdvice,
    pub overall_impression: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkinAnalysis {
    pub tone: String,
    pub texture: String,
    pub concerns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BeautyAdvice {
    pub makeup_tips: Vec<String>,
    pub skincare_routine: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthAdvice {
    pub dietary: Vec<String>,
    pub lifestyle: Vec<String>,
}

// ── Public API ──

/// Parse the model's raw text into an `AnalysisResponse`.
///
/// Every field is required; a missing, null or wrong-typed field is a
/// schema error rather than a silently defaulted value.
pub fn parse_analysis(text: &str) -> Result<AnalysisResponse> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SakuraError::EmptyResponse);
    }

    let body = strip_code_fence(trimmed);
    serde_json::from_str(body).map_err(|e| SakuraError::SchemaValidation(e.to_string()))
}

/// The response schema declared to the model, in Gemini's OpenAPI subset.
pub fn response_schema() -> Value {
    let string = json!({ "type": "STRING" });
    let strings = json!({ "type": "ARRAY", "items": { "type": "STRING" } });

    json!({
        "type": "OBJECT",
        "properties": {
            "skinAnalysis": {
                "type": "OBJECT",
                "properties": {
                    "tone": string,
                    "texture": string,
                    "concerns": strings,
                },
                "required": ["tone", "texture", "concerns"],
            },
            "beautyAdvice": {
                "type": "OBJECT",
                "properties": {
                    "makeupTips": strings,
                    "skincareRoutine": strings,
                },
                "required": ["makeupTips", "skincareRoutine"],
            },
            "healthAdvice": {
                "type": "OBJECT",
                "properties": {
                    "dietary": strings,
                    "lifestyle": strings,
                },
                "required": ["dietary", "lifestyle"],
            },
            "overallImpression": string,
        },
        "required": ["skinAnalysis", "beautyAdvice", "healthAdvice", "overallImpression"],
    })
}

// ── Helpers ──

/// Models occasionally wrap JSON mode output in a markdown fence.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

// ── Tests ──
