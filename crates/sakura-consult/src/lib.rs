use std::path::Path;

use sakura_core::{
    build_instruction, parse_analysis, response_schema, AnalysisResponse, Result, SakuraError,
};
use sakura_gemini::{VisionModel, VisionRequest};
use sakura_store::KnowledgeStore;
use tokio_util::sync::CancellationToken;

// ── Types ──

/// Runs one knowledge-base-augmented analysis per call against a vision model.
pub struct Consultant<'a, M> {
    store: &'a KnowledgeStore,
    model: M,
}

// ── Helpers ──

/// Guess an image mime type from a file extension.
pub fn mime_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

fn validate_image(image: &[u8], mime_type: &str) -> Result<()> {
    if image.is_empty() {
        return Err(SakuraError::Validation("image is empty".to_string()));
    }
    if !mime_type.starts_with("image/") {
        return Err(SakuraError::Validation(format!(
            "unsupported mime type '{}', expected image/*",
            mime_type
        )));
    }
    Ok(())
}

// ── Public API ──

impl<'a, M: VisionModel> Consultant<'a, M> {
    pub fn new(store: &'a KnowledgeStore, model: M) -> Self {
        Self { store, model }
    }

    /// Assemble the request for `image` using the current knowledge base.
    pub fn prepare_request(&self, image: Vec<u8>, mime_type: &str) -> Result<VisionRequest> {
        validate_image(&image, mime_type)?;

        let context = self.store.context()?;
        Ok(VisionRequest {
            image,
            mime_type: mime_type.to_string(),
            instruction: build_instruction(&context),
            response_schema: response_schema(),
        })
    }

    /// Analyze one photo. Exactly one model call; failures are returned as-is.
    pub async fn analyze(&self, image: Vec<u8>, mime_type: &str) -> Result<AnalysisResponse> {
        self.analyze_with_cancel(image, mime_type, &CancellationToken::new())
            .await
    }

    /// Like `analyze`, but gives up with `SakuraError::Cancelled` once
    /// `cancel` fires.
    pub async fn analyze_with_cancel(
        &self,
        image: Vec<u8>,
        mime_type: &str,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResponse> {
        let request = self.prepare_request(image, mime_type)?;
        log::info!(
            "starting consultation: {} image bytes ({})",
            request.image.len(),
            request.mime_type
        );

        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("consultation cancelled");
                return Err(SakuraError::Cancelled);
            }
            result = self.model.generate(request) => result,
        };

        let analysis = text.and_then(|t| parse_analysis(&t));
        match &analysis {
            Ok(_) => log::info!("consultation complete"),
            Err(e) => log::warn!("consultation failed: {}", e),
        }
        analysis
    }
}

// ── Tests ──
