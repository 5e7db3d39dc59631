#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use latent_explorer::*;

/// Scripted stand-in for the model service.
///
/// Explorations pop scripted results first and then fall back to returning
/// `count` numbered ideas. Generated images encode their prompt as PNG bytes.
#[derive(Default)]
pub struct MockBackend {
    pub analyze_calls: AtomicUsize,
    pub explore_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub requested_counts: Mutex<Vec<usize>>,
    /// `(had_source_image, prompt)` per generate call.
    pub generate_requests: Mutex<Vec<(bool, String)>>,
    script: Mutex<VecDeque<Result<Vec<Idea>, ExplorationError>>>,
    analysis: Mutex<Option<Result<String, AnalysisError>>>,
    fail_generation: AtomicBool,
    explore_delay: Duration,
    generate_delay: Duration,
    remote: HashMap<String, FetchedImage>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(self, results: Vec<Result<Vec<Idea>, ExplorationError>>) -> Self {
        *self.script.lock().unwrap() = results.into();
        self
    }

    pub fn with_analysis(self, result: Result<String, AnalysisError>) -> Self {
        *self.analysis.lock().unwrap() = Some(result);
        self
    }

    pub fn with_explore_delay(mut self, ms: u64) -> Self {
        self.explore_delay = Duration::from_millis(ms);
        self
    }

    pub fn with_generate_delay(mut self, ms: u64) -> Self {
        self.generate_delay = Duration::from_millis(ms);
        self
    }

    pub fn failing_generation(self) -> Self {
        self.set_generation_failure(true);
        self
    }

    pub fn with_remote_image(mut self, url: &str, bytes: &[u8], content_type: &str) -> Self {
        self.remote.insert(
            url.to_string(),
            FetchedImage {
                bytes: bytes.to_vec(),
                content_type: Some(content_type.to_string()),
            },
        );
        self
    }

    pub fn set_generation_failure(&self, fail: bool) {
        self.fail_generation.store(fail, Ordering::SeqCst);
    }

    pub fn explore_count(&self) -> usize {
        self.explore_calls.load(Ordering::SeqCst)
    }

    pub fn generate_count(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

/// `n` ideas whose prompts are tagged with `tag` so calls stay distinguishable.
pub fn numbered_ideas(tag: &str, n: usize) -> Vec<Idea> {
    (0..n)
        .map(|i| Idea::new(format!("{tag} idea {i}"), format!("{tag} prompt {i}")))
        .collect()
}

/// A tiny PNG-looking payload.
pub fn sample_png() -> Vec<u8> {
    b"\x89PNG\r\n\x1a\nsample".to_vec()
}

pub fn inline_root() -> ImageRef {
    ImageRef::Inline(codec::encode(&sample_png(), "image/png").unwrap())
}

impl IdeaSource for MockBackend {
    async fn explore(&self, _image: &EncodedImage, count: usize) -> Result<Vec<Idea>, ExplorationError> {
        let call = self.explore_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requested_counts.lock().unwrap().push(count);
        if !self.explore_delay.is_zero() {
            tokio::time::sleep(self.explore_delay).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(result) => result,
            None => Ok(numbered_ideas(&format!("call{call}"), count)),
        }
    }
}

impl ImageGenerator for MockBackend {
    async fn generate(
        &self,
        source: Option<&EncodedImage>,
        prompt: &str,
    ) -> Result<EncodedImage, GenerationError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.generate_requests
            .lock()
            .unwrap()
            .push((source.is_some(), prompt.to_string()));
        if !self.generate_delay.is_zero() {
            tokio::time::sleep(self.generate_delay).await;
        }
        if self.fail_generation.load(Ordering::SeqCst) {
            return Err(GenerationError::NoImageInResponse {
                text: Some("I can only describe this".into()),
            });
        }
        Ok(codec::encode(prompt.as_bytes(), "image/png").unwrap())
    }
}

impl Analyzer for MockBackend {
    async fn analyze(&self, _image: &EncodedImage) -> Result<String, AnalysisError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        self.analysis
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok("OBJECTS: one cat, centered\nSUMMARY: a cat on a sofa".into()))
    }
}

impl ImageFetcher for MockBackend {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.remote.get(url).cloned().ok_or_else(|| FetchError::Http {
            url: url.to_string(),
            status: 404,
        })
    }
}
