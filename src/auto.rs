use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::capability::{IdeaSource, ImageFetcher, ImageGenerator};
use crate::error::ExplorerError;
use crate::explorer::Explorer;
use crate::types::NodeId;

/// Parameters for an automatic exploration run.
#[derive(Debug, Clone)]
pub struct AutoExplore {
    pub start: NodeId,
    /// Number of explore-then-generate steps (clamped to the configured maximum).
    pub depth: usize,
    pub ideas_per_step: usize,
    /// Checked before each step; an in-flight call is never interrupted.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl AutoExplore {
    pub fn new(start: impl Into<NodeId>) -> Self {
        Self {
            start: start.into(),
            depth: 2,
            ideas_per_step: 5,
            cancel: None,
        }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_ideas_per_step(mut self, count: usize) -> Self {
        self.ideas_per_step = count;
        self
    }

    /// Set a flag that stops the run before its next step.
    pub fn with_cancellation(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Why a run ended before reaching its depth. Steps are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// The idea source found nothing to continue from.
    NoIdeas { step: usize },
    ExploreFailed { step: usize, error: ExplorerError },
    GenerationFailed { step: usize, error: ExplorerError },
    Cancelled { step: usize },
    /// Refused because idea generations were still running in the tree.
    Busy { step: usize, in_flight: usize },
}

impl StopReason {
    pub fn step(&self) -> usize {
        match self {
            StopReason::NoIdeas { step }
            | StopReason::ExploreFailed { step, .. }
            | StopReason::GenerationFailed { step, .. }
            | StopReason::Cancelled { step }
            | StopReason::Busy { step, .. } => *step,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::NoIdeas { step } => {
                write!(f, "Step {}: no new ideas found, stopping exploration.", step)
            }
            StopReason::ExploreFailed { step, error } => {
                write!(f, "Step {}: could not explore ideas ({}).", step, error)
            }
            StopReason::GenerationFailed { step, error } => {
                write!(f, "Step {}: failed to generate the next image ({}).", step, error)
            }
            StopReason::Cancelled { step } => {
                write!(f, "Stopped before step {}.", step)
            }
            StopReason::Busy { in_flight, .. } => {
                write!(f, "Wait for {} running generation(s) to finish before auto-exploring.", in_flight)
            }
        }
    }
}

/// Outcome of an automatic exploration run.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoExploreReport {
    /// New nodes in creation order; each is the child of the one before.
    pub created: Vec<NodeId>,
    /// `None` when every step ran.
    pub stop: Option<StopReason>,
    /// Final status line, also the last one sent to the status callback.
    pub status: String,
}

impl AutoExploreReport {
    pub fn completed(&self) -> bool {
        self.stop.is_none()
    }

    pub fn last_node(&self) -> Option<&NodeId> {
        self.created.last()
    }
}

impl<C> Explorer<C>
where
    C: IdeaSource + ImageGenerator + ImageFetcher,
{
    /// A request from `start` using the configured default depth and idea count.
    pub fn auto_request(&self, start: impl Into<NodeId>) -> AutoExplore {
        AutoExplore::new(start)
            .with_depth(self.config().default_depth)
            .with_ideas_per_step(self.config().default_ideas)
    }

    /// Walk down from `request.start`, one explore-then-generate step at a time.
    ///
    /// Each step explores the current node, generates a child from its first
    /// idea and navigates to that child. The run stops at the first step that
    /// yields no ideas or fails; that outcome is reported, never returned as
    /// an error. A run is refused while any generation is in flight.
    /// `on_status` receives a line before each phase, one after each finished
    /// step and the final status.
    pub async fn auto_explore<F>(&self, request: AutoExplore, mut on_status: F) -> AutoExploreReport
    where
        F: FnMut(&str),
    {
        let depth = self.config().depth(request.depth);
        let mut created = Vec::new();
        let mut current = request.start.clone();

        let in_flight = self.store().generations_in_flight();
        if in_flight > 0 {
            return self.finish(created, Some(StopReason::Busy { step: 1, in_flight }), &mut on_status);
        }

        info!(start = %current, depth, "auto-explore started");

        for step in 1..=depth {
            if request.is_cancelled() {
                return self.finish(created, Some(StopReason::Cancelled { step }), &mut on_status);
            }

            on_status(&format!("Step {}/{}: exploring ideas...", step, depth));
            let ideas = match self.explore(&current, request.ideas_per_step).await {
                Ok(ideas) => ideas,
                Err(error) => {
                    let stop = StopReason::ExploreFailed { step, error };
                    return self.finish(created, Some(stop), &mut on_status);
                }
            };

            let Some(first) = ideas.first() else {
                return self.finish(created, Some(StopReason::NoIdeas { step }), &mut on_status);
            };

            on_status(&format!("Step {}/{}: generating \"{}\"...", step, depth, first.description));
            let child = match self.generate_child(&current, first, 0).await {
                Ok(child) => child,
                Err(error) => {
                    let stop = StopReason::GenerationFailed { step, error };
                    return self.finish(created, Some(stop), &mut on_status);
                }
            };

            if let Err(error) = self.navigate(&child) {
                let stop = StopReason::GenerationFailed { step, error };
                return self.finish(created, Some(stop), &mut on_status);
            }
            on_status(&format!("Step {}/{}: created {}", step, depth, child));
            created.push(child.clone());
            current = child;
        }

        self.finish(created, None, &mut on_status)
    }

    fn finish<F>(
        &self,
        created: Vec<NodeId>,
        stop: Option<StopReason>,
        on_status: &mut F,
    ) -> AutoExploreReport
    where
        F: FnMut(&str),
    {
        let status = match &stop {
            None => format!("Auto-exploration complete: {} new images.", created.len()),
            Some(reason) => reason.to_string(),
        };
        match &stop {
            None => info!(created = created.len(), "auto-explore finished"),
            Some(reason) => warn!(created = created.len(), step = reason.step(), "auto-explore stopped: {}", reason),
        }
        on_status(&status);
        AutoExploreReport {
            created,
            stop,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExplorationError, StoreError};

    #[test]
    fn request_builder() {
        let cancel = Arc::new(AtomicBool::new(false));
        let request = AutoExplore::new("root")
            .with_depth(3)
            .with_ideas_per_step(2)
            .with_cancellation(cancel.clone());
        assert_eq!(request.start, "root");
        assert_eq!(request.depth, 3);
        assert_eq!(request.ideas_per_step, 2);
        assert!(!request.is_cancelled());

        cancel.store(true, Ordering::Relaxed);
        assert!(request.is_cancelled());
    }

    #[test]
    fn stop_reasons_are_distinguishable() {
        let no_ideas = StopReason::NoIdeas { step: 2 };
        let failed = StopReason::GenerationFailed {
            step: 2,
            error: ExplorerError::Store(StoreError::SessionReset("n".into())),
        };
        assert_ne!(no_ideas, failed);
        assert_eq!(no_ideas.step(), failed.step());
        assert!(no_ideas.to_string().contains("no new ideas"));
        assert!(failed.to_string().contains("failed to generate"));

        let explore = StopReason::ExploreFailed {
            step: 1,
            error: ExplorationError::Blocked("SAFETY".into()).into(),
        };
        assert!(explore.to_string().contains("blocked"));

        let busy = StopReason::Busy { step: 1, in_flight: 2 };
        assert_eq!(busy.step(), 1);
        assert!(busy.to_string().contains("2 running generation"));
    }
}
