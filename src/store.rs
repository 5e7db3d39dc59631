use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::types::{EncodedImage, Idea, IdeasHistoryItem, ImageRef, NodeId};

/// One image in the exploration tree plus its per-node activity state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    /// `None` only for the root.
    pub parent_id: Option<NodeId>,
    pub children_ids: Vec<NodeId>,
    pub image: ImageRef,
    /// Prompt that produced this image; `None` only for the root.
    pub prompt: Option<String>,
    /// Current ideas, replaced wholesale by each successful exploration.
    pub ideas: Option<Vec<Idea>>,
    pub is_exploring: bool,
    /// Indices into `ideas` currently being generated.
    pub generating_indices: BTreeSet<usize>,
    #[serde(skip)]
    ideas_version: u64,
}

/// Behavioural state of a node, derived from its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Idle,
    Exploring,
    IdeasReady,
}

impl Node {
    fn new(parent_id: Option<NodeId>, image: ImageRef, prompt: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            parent_id,
            children_ids: Vec::new(),
            image,
            prompt,
            ideas: None,
            is_exploring: false,
            generating_indices: BTreeSet::new(),
            ideas_version: 0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn state(&self) -> NodeState {
        if self.is_exploring {
            NodeState::Exploring
        } else if self.ideas.is_some() {
            NodeState::IdeasReady
        } else {
            NodeState::Idle
        }
    }
}

/// A row of the depth-first tree outline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineEntry {
    pub id: NodeId,
    pub depth: usize,
    pub prompt: Option<String>,
    pub is_current: bool,
}

type NodeHandle = Arc<Mutex<Node>>;

#[derive(Default)]
struct Tree {
    nodes: HashMap<NodeId, NodeHandle>,
    root: Option<NodeId>,
    current: Option<NodeId>,
    history: Vec<IdeasHistoryItem>,
}

impl Tree {
    fn handle(&self, node_id: &str) -> Result<&NodeHandle, StoreError> {
        if self.root.is_none() {
            return Err(StoreError::NoSession);
        }
        self.nodes
            .get(node_id)
            .ok_or_else(|| StoreError::UnknownNode(node_id.to_string()))
    }

    fn owns(&self, node_id: &str, handle: &NodeHandle) -> bool {
        self.nodes
            .get(node_id)
            .is_some_and(|live| Arc::ptr_eq(live, handle))
    }
}

/// In-memory exploration tree shared by every operation of a session.
///
/// Nodes live behind their own mutex so that operations on different nodes
/// never contend, while the map itself is only write-locked to insert nodes or
/// reset the session. Locks are never held across an `.await`: async work is
/// bracketed by [`ExploreTicket`] and [`GenerationTicket`], whose `Drop` impls
/// restore the node's activity flags on every exit path.
///
/// Lock order is always map, then node.
#[derive(Default)]
pub struct ExplorationStore {
    tree: RwLock<Tree>,
}

fn lock(node: &Mutex<Node>) -> MutexGuard<'_, Node> {
    node.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ExplorationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tree> {
        self.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tree> {
        self.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Discard everything and start a new tree rooted at `image`.
    ///
    /// The root becomes the current node. Idea history is cleared as well.
    pub fn create_root(&self, image: ImageRef) -> NodeId {
        let root = Node::new(None, image, None);
        let id = root.id.clone();

        let mut tree = self.write();
        let discarded = tree.nodes.len();
        *tree = Tree {
            nodes: HashMap::from([(id.clone(), Arc::new(Mutex::new(root)))]),
            root: Some(id.clone()),
            current: Some(id.clone()),
            history: Vec::new(),
        };
        info!(root = %id, discarded, "started exploration session");
        id
    }

    /// Make `node_id` the current node. Unknown ids leave the selection as is.
    pub fn navigate(&self, node_id: &str) -> Result<(), StoreError> {
        let mut tree = self.write();
        tree.handle(node_id)?;
        tree.current = Some(node_id.to_string());
        debug!(node = node_id, "navigated");
        Ok(())
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.read().root.clone()
    }

    pub fn current_node_id(&self) -> Option<NodeId> {
        self.read().current.clone()
    }

    /// Snapshot of a node.
    pub fn node(&self, node_id: &str) -> Option<Node> {
        let tree = self.read();
        tree.nodes.get(node_id).map(|handle| lock(handle).clone())
    }

    pub fn current_node(&self) -> Option<Node> {
        let tree = self.read();
        let id = tree.current.as_ref()?;
        tree.nodes.get(id).map(|handle| lock(handle).clone())
    }

    /// Snapshots of every node, depth-first from the root.
    pub fn nodes(&self) -> Vec<Node> {
        let tree = self.read();
        let mut out = Vec::with_capacity(tree.nodes.len());
        let mut stack: Vec<NodeId> = tree.root.iter().cloned().collect();
        while let Some(id) = stack.pop() {
            if let Some(handle) = tree.nodes.get(&id) {
                let node = lock(handle).clone();
                stack.extend(node.children_ids.iter().rev().cloned());
                out.push(node);
            }
        }
        out
    }

    /// Number of idea generations currently reserved across the whole tree.
    pub fn generations_in_flight(&self) -> usize {
        let tree = self.read();
        tree.nodes
            .values()
            .map(|handle| lock(handle).generating_indices.len())
            .sum()
    }

    pub fn len(&self) -> usize {
        self.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().nodes.is_empty()
    }

    /// Every completed exploration of this session, oldest first.
    pub fn idea_history(&self) -> Vec<IdeasHistoryItem> {
        self.read().history.clone()
    }

    /// Mark `node_id` as exploring.
    ///
    /// Fails with [`StoreError::AlreadyExploring`] if an exploration is in
    /// flight for the node; the check and the flag update happen under one
    /// lock, so overlapping callers cannot both pass. Existing ideas stay
    /// visible until the ticket completes.
    pub fn begin_explore(&self, node_id: &str) -> Result<ExploreTicket<'_>, StoreError> {
        let tree = self.read();
        let handle = tree.handle(node_id)?;
        let image = {
            let mut node = lock(handle);
            if node.is_exploring {
                return Err(StoreError::AlreadyExploring(node_id.to_string()));
            }
            node.is_exploring = true;
            node.image.clone()
        };
        debug!(node = node_id, "exploration started");
        Ok(ExploreTicket {
            store: self,
            node_id: node_id.to_string(),
            handle: Arc::clone(handle),
            image,
            settled: false,
        })
    }

    /// Reserve idea `index` of `node_id` for generation.
    ///
    /// The index must point into the node's current ideas and must not
    /// already be generating.
    pub fn begin_generation(
        &self,
        node_id: &str,
        index: usize,
    ) -> Result<GenerationTicket<'_>, StoreError> {
        let tree = self.read();
        let handle = tree.handle(node_id)?;
        let mut node = lock(handle);

        let Some(idea) = node.ideas.as_ref().and_then(|ideas| ideas.get(index)).cloned() else {
            return Err(StoreError::StaleIdeaIndex {
                node_id: node_id.to_string(),
                index,
            });
        };
        if !node.generating_indices.insert(index) {
            return Err(StoreError::AlreadyGenerating {
                node_id: node_id.to_string(),
                index,
            });
        }

        debug!(node = node_id, index, "generation started");
        Ok(GenerationTicket {
            store: self,
            parent_id: node_id.to_string(),
            handle: Arc::clone(handle),
            index,
            idea,
            ideas_version: node.ideas_version,
        })
    }

    /// Ideas of `node_id` that no child was generated from yet, with their indices.
    ///
    /// An idea counts as generated when some child's prompt equals its
    /// suggested prompt, so an unrelated child with an identical prompt also
    /// hides it.
    pub fn pending_ideas(&self, node_id: &str) -> Result<Vec<(usize, Idea)>, StoreError> {
        let tree = self.read();
        let (ideas, children) = {
            let node = lock(tree.handle(node_id)?);
            (node.ideas.clone().unwrap_or_default(), node.children_ids.clone())
        };
        let used: Vec<String> = children
            .iter()
            .filter_map(|id| tree.nodes.get(id))
            .filter_map(|handle| lock(handle).prompt.clone())
            .collect();

        Ok(ideas
            .into_iter()
            .enumerate()
            .filter(|(_, idea)| !used.contains(&idea.suggested_prompt))
            .collect())
    }

    /// Depth-first outline of the tree, children in creation order.
    pub fn outline(&self) -> Vec<OutlineEntry> {
        let tree = self.read();
        let mut out = Vec::new();
        let mut stack: Vec<(NodeId, usize)> = tree.root.iter().map(|id| (id.clone(), 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            let Some(handle) = tree.nodes.get(&id) else {
                continue;
            };
            let (prompt, children) = {
                let node = lock(handle);
                (node.prompt.clone(), node.children_ids.clone())
            };
            stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
            out.push(OutlineEntry {
                is_current: tree.current.as_deref() == Some(id.as_str()),
                id,
                depth,
                prompt,
            });
        }
        out
    }

    /// Plain-text rendering of [`outline`](Self::outline), current node starred.
    pub fn render_outline(&self) -> String {
        self.outline()
            .iter()
            .map(|entry| {
                let marker = if entry.is_current { '*' } else { '-' };
                let label = match &entry.prompt {
                    Some(prompt) => truncate(prompt, 60),
                    None => "(root)".to_string(),
                };
                format!("{}{} {}", "  ".repeat(entry.depth), marker, label)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head.trim_end())
}

/// An in-flight exploration of one node.
///
/// Dropping the ticket without calling [`complete`](Self::complete) clears the
/// node's exploring flag and leaves its ideas untouched.
pub struct ExploreTicket<'a> {
    store: &'a ExplorationStore,
    node_id: NodeId,
    handle: NodeHandle,
    image: ImageRef,
    settled: bool,
}

impl ExploreTicket<'_> {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// The image being explored.
    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    /// Replace the node's ideas and clear its exploring flag in one step.
    ///
    /// Generations still reserved against the old ideas are released from
    /// `generating_indices`; they may still finish and attach their child.
    /// If the session was reset meanwhile the ideas land on the orphaned node
    /// only and [`StoreError::SessionReset`] is returned.
    pub fn complete(mut self, ideas: Vec<Idea>) -> Result<(), StoreError> {
        let mut tree = self.store.write();
        let live = tree.owns(&self.node_id, &self.handle);
        let count = ideas.len();
        {
            let mut node = lock(&self.handle);
            node.ideas = Some(ideas.clone());
            node.ideas_version += 1;
            node.generating_indices.clear();
            node.is_exploring = false;
        }
        self.settled = true;

        if !live {
            warn!(node = %self.node_id, "exploration finished after session reset, ideas dropped");
            return Err(StoreError::SessionReset(self.node_id.clone()));
        }
        tree.history.push(IdeasHistoryItem {
            node_id: self.node_id.clone(),
            image_url: self.image.as_url(),
            ideas,
            created_at: chrono::Utc::now().to_rfc3339(),
        });
        info!(node = %self.node_id, count, "ideas ready");
        Ok(())
    }
}

impl Drop for ExploreTicket<'_> {
    fn drop(&mut self) {
        if !self.settled {
            lock(&self.handle).is_exploring = false;
            debug!(node = %self.node_id, "exploration abandoned, previous ideas kept");
        }
    }
}

/// A reserved idea index on a parent node.
///
/// The index leaves `generating_indices` when the ticket is dropped, whether
/// or not a child was attached, unless the ideas were replaced in the
/// meantime (the refresh already evicted it).
pub struct GenerationTicket<'a> {
    store: &'a ExplorationStore,
    parent_id: NodeId,
    handle: NodeHandle,
    index: usize,
    idea: Idea,
    ideas_version: u64,
}

impl GenerationTicket<'_> {
    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The idea at the reserved index when the reservation was taken.
    pub fn idea(&self) -> &Idea {
        &self.idea
    }

    /// Append a new leaf under the parent and return its id.
    ///
    /// Insertion and the parent's `children_ids` append happen under the map
    /// write lock, so concurrent completions never lose a child.
    pub fn attach(self, image: EncodedImage, prompt: String) -> Result<NodeId, StoreError> {
        let mut tree = self.store.write();
        if !tree.owns(&self.parent_id, &self.handle) {
            warn!(parent = %self.parent_id, index = self.index, "generation finished after session reset, child dropped");
            return Err(StoreError::SessionReset(self.parent_id.clone()));
        }

        let child = Node::new(Some(self.parent_id.clone()), ImageRef::Inline(image), Some(prompt));
        let child_id = child.id.clone();
        tree.nodes
            .insert(child_id.clone(), Arc::new(Mutex::new(child)));
        lock(&self.handle).children_ids.push(child_id.clone());

        info!(parent = %self.parent_id, child = %child_id, index = self.index, "child attached");
        Ok(child_id)
    }
}

impl Drop for GenerationTicket<'_> {
    fn drop(&mut self) {
        let mut node = lock(&self.handle);
        if node.ideas_version == self.ideas_version {
            node.generating_indices.remove(&self.index);
        }
    }
}
