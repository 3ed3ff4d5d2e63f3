//! Generative content collaborator boundary.
//!
//! Views send a prompt to an external text/image service and render whatever
//! comes back. The service is opaque here: a request yields structured JSON or
//! freeform text, or fails, in which case the caller shows a fixed fallback.
//! Failures are never retried.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::identity::View;

/// A prompt addressed to the content service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSpec {
    pub view: View,
    /// Short task name, used for logging only.
    pub task: String,
    pub prompt: String,
    /// Ask for JSON matching the view's fixed schema rather than prose.
    #[serde(default)]
    pub structured: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedContent {
    Structured(JsonValue),
    Freeform(String),
}

impl GeneratedContent {
    /// Text for display: freeform as-is, structured pretty-printed.
    pub fn render(&self) -> String {
        match self {
            GeneratedContent::Freeform(s) => s.clone(),
            GeneratedContent::Structured(v) => serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()),
        }
    }
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, spec: &PromptSpec) -> Result<GeneratedContent>;
}

/// Used when no content service is configured; every request fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGenerator;

#[async_trait]
impl ContentGenerator for OfflineGenerator {
    async fn generate(&self, spec: &PromptSpec) -> Result<GeneratedContent> {
        Err(anyhow!("no content service configured for task '{}'", spec.task))
    }
}

/// Ask the service and substitute `fallback` on any failure.
pub async fn generate_or_fallback(
    generator: &dyn ContentGenerator,
    spec: &PromptSpec,
    fallback: GeneratedContent,
) -> GeneratedContent {
    match generator.generate(spec).await {
        Ok(content) => content,
        Err(e) => {
            warn!(target: "fatecraft::content", view = %spec.view, task = %spec.task, "content generation failed, using fallback: {:#}", e);
            fallback
        }
    }
}

/// Static text each view shows when its narrative cannot be generated.
pub fn fallback_for(view: View) -> GeneratedContent {
    let text = match view {
        View::Citizen => "<h3>System Error</h3><p>We could not generate your climate future at this time. Please try again.</p>",
        View::Industry => "<h3>Error</h3><p>Unable to analyze the report at this time.</p>",
        View::Government => "<h3>Error</h3><p>Unable to generate executive report at this time.</p>",
    };
    GeneratedContent::Freeform(text.to_string())
}
