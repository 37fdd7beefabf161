//! Vision-model seam and the Gemini REST implementation behind it.

use async_trait::async_trait;
use sakura_core::{Instruction, Result};
use serde_json::Value;

mod client;

pub use client::GeminiClient;

/// One schema-constrained request: an image plus its instructions.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub image: Vec<u8>,
    pub mime_type: String,
    pub instruction: Instruction,
    pub response_schema: Value,
}

/// A vision-capable model that answers with JSON text.
///
/// Implementations make exactly one attempt. Transport failures map to
/// `SakuraError::Upstream`, a reply without text to `SakuraError::EmptyResponse`.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn generate(&self, request: VisionRequest) -> Result<String>;
}
