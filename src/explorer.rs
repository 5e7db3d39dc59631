use futures::future::join_all;
use tracing::{info, warn};

use crate::capability::{IdeaSource, ImageFetcher, ImageGenerator};
use crate::codec;
use crate::config::ExplorerConfig;
use crate::error::{ExplorerError, StoreError};
use crate::store::{ExplorationStore, GenerationTicket};
use crate::types::{Idea, ImageRef, NodeId};

/// Drives an [`ExplorationStore`] with a capability backend.
///
/// The backend supplies ideas, images and remote image fetches; with the
/// [`GeminiClient`](crate::GeminiClient) a single value does all three.
///
/// # Example
/// ```no_run
/// use latent_explorer::{Explorer, GeminiClient, GeminiConfig, ImageRef};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let explorer = Explorer::new(GeminiClient::new(GeminiConfig::new("my-api-key")));
/// let root = explorer.start(ImageRef::Url("https://example.com/cat.png".into()));
///
/// let ideas = explorer.explore(&root, 4).await?;
/// let child = explorer.generate_child(&root, &ideas[0], 0).await?;
/// explorer.navigate(&child)?;
/// # Ok(())
/// # }
/// ```
pub struct Explorer<C> {
    store: ExplorationStore,
    backend: C,
    config: ExplorerConfig,
}

impl<C> Explorer<C>
where
    C: IdeaSource + ImageGenerator + ImageFetcher,
{
    pub fn new(backend: C) -> Self {
        Self::with_config(backend, ExplorerConfig::default())
    }

    pub fn with_config(backend: C, config: ExplorerConfig) -> Self {
        Self {
            store: ExplorationStore::new(),
            backend,
            config,
        }
    }

    pub fn store(&self) -> &ExplorationStore {
        &self.store
    }

    pub fn backend(&self) -> &C {
        &self.backend
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// Start a fresh session rooted at `image`, discarding any previous tree.
    pub fn start(&self, image: ImageRef) -> NodeId {
        self.store.create_root(image)
    }

    pub fn navigate(&self, node_id: &str) -> Result<(), ExplorerError> {
        Ok(self.store.navigate(node_id)?)
    }

    /// Fetch ideas for `node_id` and store them on the node.
    ///
    /// `count` is clamped to `1..=max_ideas`. A second call for a node that is
    /// still exploring fails with `AlreadyExploring` and never reaches the
    /// backend. On failure the node keeps whatever ideas it had.
    pub async fn explore(&self, node_id: &str, count: usize) -> Result<Vec<Idea>, ExplorerError> {
        let ticket = self.store.begin_explore(node_id)?;
        let image = codec::resolve(&self.backend, ticket.image()).await?;
        let count = self.config.idea_count(count);

        let ideas = match self.backend.explore(&image, count).await {
            Ok(ideas) => ideas,
            Err(e) => {
                warn!(node = node_id, error = %e, "exploration failed");
                return Err(e.into());
            }
        };

        ticket.complete(ideas.clone())?;
        Ok(ideas)
    }

    /// [`explore`](Self::explore) with the configured default idea count.
    pub async fn explore_default(&self, node_id: &str) -> Result<Vec<Idea>, ExplorerError> {
        self.explore(node_id, self.config.default_ideas).await
    }

    /// Generate a child of `parent_id` from `idea`, reserving `index` while in flight.
    ///
    /// The image is synthesized from the idea's prompt alone. The index is
    /// released whether the call succeeds or fails.
    pub async fn generate_child(
        &self,
        parent_id: &str,
        idea: &Idea,
        index: usize,
    ) -> Result<NodeId, ExplorerError> {
        let ticket = self.store.begin_generation(parent_id, index)?;
        self.generate_from(ticket, &idea.suggested_prompt).await
    }

    /// Generate a child from the idea currently stored at `index` on `parent_id`.
    ///
    /// The idea is read under the same lock that reserves the index, so a
    /// refresh landing in between can never pair an index with an idea from
    /// another list.
    pub async fn generate_idea(&self, parent_id: &str, index: usize) -> Result<NodeId, ExplorerError> {
        let ticket = self.store.begin_generation(parent_id, index)?;
        let prompt = ticket.idea().suggested_prompt.clone();
        self.generate_from(ticket, &prompt).await
    }

    async fn generate_from(
        &self,
        ticket: GenerationTicket<'_>,
        prompt: &str,
    ) -> Result<NodeId, ExplorerError> {
        let image = match self.backend.generate(None, prompt).await {
            Ok(image) => image,
            Err(e) => {
                warn!(parent = ticket.parent_id(), index = ticket.index(), error = %e, "generation failed");
                return Err(e.into());
            }
        };

        Ok(ticket.attach(image, prompt.to_string())?)
    }

    /// Generate children for several ideas of one node concurrently.
    ///
    /// Returns one result per requested index, in request order. Indices
    /// outside the node's current ideas fail individually.
    pub async fn generate_selected(
        &self,
        parent_id: &str,
        indices: &[usize],
    ) -> Result<Vec<(usize, Result<NodeId, ExplorerError>)>, ExplorerError> {
        if self.store.node(parent_id).is_none() {
            return Err(StoreError::UnknownNode(parent_id.to_string()).into());
        }

        info!(parent = parent_id, count = indices.len(), "generating selected ideas");
        let tasks = indices
            .iter()
            .map(|&index| async move { (index, self.generate_idea(parent_id, index).await) });
        Ok(join_all(tasks).await)
    }
}
