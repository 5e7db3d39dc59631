//! # latent-explorer
//!
//! Image analysis, latent-space idea exploration and branching generation
//! trees on top of a hosted multimodal model (Gemini).
//!
//! ## Features
//!
//! - **Structured analysis** of an image through a layered descriptive directive
//! - **Idea exploration**: a model proposes creative directions for an image,
//!   each with a ready-to-use generation prompt
//! - **Branching tree** of generated images with per-node concurrency control:
//!   one exploration per node at a time, any number of concurrent generations
//! - **Auto-explore** down a chain of first ideas with a status callback and
//!   cooperative cancellation
//! - **Session export** to a zip archive with a JSON manifest, plus an
//!   idea-history document
//! - **Linear editing**: analyze once, then apply edits grounded in the analysis
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use latent_explorer::{AutoExplore, Explorer, GeminiClient, GeminiConfig, ImageRef, codec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GeminiConfig::from_env().ok_or("GEMINI_API_KEY is not set")?;
//!     let explorer = Explorer::new(GeminiClient::new(config));
//!
//!     let image = codec::encode(&std::fs::read("photo.png")?, "image/png")?;
//!     let root = explorer.start(ImageRef::Inline(image));
//!
//!     // Branch by hand
//!     let ideas = explorer.explore(&root, 4).await?;
//!     let results = explorer.generate_selected(&root, &[0, 2]).await?;
//!     println!("{} ideas, {} children", ideas.len(), results.len());
//!
//!     // Or let the explorer walk down on its own
//!     let report = explorer
//!         .auto_explore(AutoExplore::new(root).with_depth(3), |s| println!("{}", s))
//!         .await;
//!     println!("{}", report.status);
//!     println!("{}", explorer.store().render_outline());
//!     Ok(())
//! }
//! ```
//!
//! ## Parsing Robustness
//!
//! Idea lists are validated strictly but tolerate the wrappers models add:
//!
//! ```rust
//! use latent_explorer::parse_ideas;
//!
//! let raw = r#"[{"description": "a face in the bark", "suggestedPrompt": "an ancient tree spirit"}]"#;
//! assert_eq!(parse_ideas(raw).unwrap().len(), 1);
//!
//! // Markdown code blocks
//! assert!(parse_ideas(&format!("```json\n{}\n```", raw)).is_ok());
//!
//! // Wrong shape is a parse error, not an empty list
//! assert!(parse_ideas(r#"{"ideas": []}"#).is_err());
//! ```

pub mod auto;
pub mod capability;
pub mod client;
pub mod codec;
pub mod config;
pub mod editor;
pub mod error;
pub mod explorer;
pub mod export;
pub mod parser;
pub mod prompt;
pub mod store;
pub mod types;

// Re-export main types at crate root
pub use auto::{AutoExplore, AutoExploreReport, StopReason};
pub use capability::{Analyzer, IdeaSource, ImageFetcher, ImageGenerator};
pub use client::GeminiClient;
pub use config::{ExplorerConfig, GeminiConfig, MAX_IDEAS};
pub use editor::{EditRecord, EditSession};
pub use error::{
    AnalysisError, CodecError, EditorError, ExplorationError, ExplorerError, ExportError,
    FetchError, GenerationError, StoreError,
};
pub use explorer::Explorer;
pub use export::{export_idea_history, export_session, ManifestEntry, SessionArchive};
pub use parser::parse_ideas;
pub use store::{ExplorationStore, ExploreTicket, GenerationTicket, Node, NodeState, OutlineEntry};
pub use types::{EncodedImage, FetchedImage, Idea, IdeasHistoryItem, ImageRef, NodeId};
