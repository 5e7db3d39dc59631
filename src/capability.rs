//! The external services the explorer consumes.
//!
//! [`GeminiClient`](crate::GeminiClient) implements every trait here; tests and
//! alternative backends can implement them independently.

use std::future::Future;

use crate::error::{AnalysisError, ExplorationError, FetchError, GenerationError};
use crate::types::{EncodedImage, FetchedImage, Idea};

/// Image -> structured descriptive text.
pub trait Analyzer: Send + Sync {
    fn analyze(
        &self,
        image: &EncodedImage,
    ) -> impl Future<Output = Result<String, AnalysisError>> + Send;
}

/// Image -> up to `count` creative ideas.
///
/// An empty list is a valid answer, not an error.
pub trait IdeaSource: Send + Sync {
    fn explore(
        &self,
        image: &EncodedImage,
        count: usize,
    ) -> impl Future<Output = Result<Vec<Idea>, ExplorationError>> + Send;
}

/// Optional source image + prompt -> new image.
pub trait ImageGenerator: Send + Sync {
    fn generate(
        &self,
        source: Option<&EncodedImage>,
        prompt: &str,
    ) -> impl Future<Output = Result<EncodedImage, GenerationError>> + Send;
}

/// URL -> raw image bytes.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedImage, FetchError>> + Send;
}

impl ImageFetcher for reqwest::Client {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        let resp = self
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Connection {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = resp.bytes().await.map_err(|e| FetchError::Read {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
