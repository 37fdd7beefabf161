// ── Prompt Builder ──
//
// Pure composition of the persona template and the knowledge-base context.

/// The instruction pair sent alongside the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub system_instruction: String,
    pub user_prompt: String,
}

const PERSONA: &str = "You are a highly experienced Japanese Beauty Consultant (J-Beauty expert).
Your goal is to provide a polite, respectful, and holistic analysis of the user's face to improve their health and beauty.

You have access to a specific Knowledge Base of tips. You MUST incorporate relevant principles from this knowledge base into your advice where applicable.";

const TONE: &str = "Tone: Polite, encouraging, \"Omotenashi\" (hospitality) spirit.
Focus on natural beauty, skin health, and minimalist makeup typical of Japanese trends.";

pub const USER_PROMPT: &str = "Please analyze this image. Provide skin analysis, makeup advice, and health/lifestyle recommendations based on visual cues (e.g., dark circles might indicate lack of sleep). Output strictly in JSON.";

// ── Public API ──

/// Compose the system instruction and user prompt for one consultation.
/// `kb_context` is embedded verbatim.
pub fn build_instruction(kb_context: &str) -> Instruction {
    let system_instruction = format!(
        "{}\n\nKnowledge Base Context:\n{}\n\n{}\n",
        PERSONA, kb_context, TONE
    );

    Instruction {
        system_instruction,
        user_prompt: USER_PROMPT.to_string(),
    }
}

// ── Tests ──
