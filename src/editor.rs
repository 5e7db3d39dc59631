use serde::{Deserialize, Serialize};
use tracing::info;

use crate::capability::{Analyzer, ImageGenerator};
use crate::codec;
use crate::error::EditorError;
use crate::prompt;
use crate::types::EncodedImage;

/// One generated edit, newest first in [`EditSession::history`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRecord {
    pub image: EncodedImage,
    /// The edit request as the user typed it.
    pub prompt: String,
    pub created_at: String,
}

/// Single-image edit flow: load, analyze, then apply edits grounded in the analysis.
pub struct EditSession<B> {
    backend: B,
    image: Option<EncodedImage>,
    analysis: Option<String>,
    last_prompt: Option<String>,
    history: Vec<EditRecord>,
}

impl<B> EditSession<B>
where
    B: Analyzer + ImageGenerator,
{
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            image: None,
            analysis: None,
            last_prompt: None,
            history: Vec::new(),
        }
    }

    /// Load a new source image. Clears the analysis and last prompt.
    pub fn load_image(&mut self, bytes: &[u8], mime_type: &str) -> Result<(), EditorError> {
        let image = codec::encode(bytes, mime_type)?;
        self.image = Some(image);
        self.analysis = None;
        self.last_prompt = None;
        Ok(())
    }

    pub async fn analyze(&mut self) -> Result<&str, EditorError> {
        let image = self.image.as_ref().ok_or(EditorError::NoImage)?;
        let analysis = self.backend.analyze(image).await?;
        info!(chars = analysis.len(), "image analyzed");
        Ok(self.analysis.insert(analysis).as_str())
    }

    /// Generate an edited version of the loaded image.
    ///
    /// The full prompt is kept in [`last_prompt`](Self::last_prompt) before
    /// the request is sent, so it stays inspectable when generation fails.
    pub async fn apply_edit(&mut self, request: &str) -> Result<&EditRecord, EditorError> {
        if request.trim().is_empty() {
            return Err(EditorError::EmptyPrompt);
        }
        let image = self.image.as_ref().ok_or(EditorError::NoImage)?;
        let analysis = self.analysis.as_deref().ok_or(EditorError::NotAnalyzed)?;

        let full_prompt = self.last_prompt.insert(prompt::edit_prompt(analysis, request));
        let edited = self.backend.generate(Some(image), full_prompt.as_str()).await?;
        info!(mime = %edited.mime_type, "edit generated");

        self.history.insert(
            0,
            EditRecord {
                image: edited,
                prompt: request.to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        Ok(&self.history[0])
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn image(&self) -> Option<&EncodedImage> {
        self.image.as_ref()
    }

    pub fn analysis(&self) -> Option<&str> {
        self.analysis.as_deref()
    }

    /// Full prompt of the most recent edit attempt, successful or not.
    pub fn last_prompt(&self) -> Option<&str> {
        self.last_prompt.as_deref()
    }

    pub fn history(&self) -> &[EditRecord] {
        &self.history
    }
}

/// Download name for an edited image, `edited-image-<millis>.<ext>`.
pub fn suggested_filename(image: &EncodedImage) -> String {
    format!(
        "edited-image-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        codec::extension_for(Some(&image.mime_type))
    )
}
