//! Ordered "first success wins" strategy lists.
//!
//! Every extraction path in the service is a list of strategies tried in turn:
//! platform dispatch, the per-platform attempts, the YouTube metadata sources,
//! the transcript language stages and the thumbnail candidates. A stage yields
//! `Ok(Some(value))` to win, `Ok(None)` when it simply found nothing, or `Err`
//! when it failed. Both of the latter hand control to the next stage.

use log::{debug, info, warn};
use std::future::Future;
use std::pin::Pin;

pub type StageResult<T> = anyhow::Result<Option<T>>;
pub type StageFuture<'a, T> = Pin<Box<dyn Future<Output = StageResult<T>> + Send + 'a>>;

type AsyncStage<'a, T> = Box<dyn FnOnce() -> StageFuture<'a, T> + Send + 'a>;
type SyncStage<'a, T> = Box<dyn FnOnce() -> StageResult<T> + 'a>;

/// Returned when no stage produced a value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{chain}: {}", .last_error.as_deref().unwrap_or("no strategy produced a result"))]
pub struct Exhausted {
    pub chain: &'static str,
    pub last_error: Option<String>,
}

impl Exhausted {
    /// The most specific reason available, used in placeholder results.
    pub fn reason(&self) -> String {
        self.last_error
            .clone()
            .unwrap_or_else(|| format!("{}: no strategy produced a result", self.chain))
    }
}

/// Lazily evaluated async stages; a stage only starts when every earlier one came up empty.
pub struct FallbackChain<'a, T> {
    name: &'static str,
    stages: Vec<(String, AsyncStage<'a, T>)>,
}

impl<'a, T: Send + 'a> FallbackChain<'a, T> {
    pub fn new(name: &'static str) -> Self {
        FallbackChain {
            name,
            stages: Vec::new(),
        }
    }

    pub fn stage<F, Fut>(mut self, label: impl Into<String>, stage: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = StageResult<T>> + Send + 'a,
    {
        self.stages.push((
            label.into(),
            Box::new(move || Box::pin(stage()) as StageFuture<'a, T>),
        ));
        self
    }

    pub async fn run(self) -> Result<T, Exhausted> {
        let name = self.name;
        let mut last_error = None;

        for (label, stage) in self.stages {
            if let Some(value) = settle(name, &label, stage().await, &mut last_error) {
                return Ok(value);
            }
        }

        Err(Exhausted {
            chain: name,
            last_error,
        })
    }
}

/// Synchronous counterpart of [`FallbackChain`] for stages that only inspect
/// already-fetched data (for example a parsed HTML document).
pub struct SyncFallbackChain<'a, T> {
    name: &'static str,
    stages: Vec<(&'static str, SyncStage<'a, T>)>,
}

impl<'a, T> SyncFallbackChain<'a, T> {
    pub fn new(name: &'static str) -> Self {
        SyncFallbackChain {
            name,
            stages: Vec::new(),
        }
    }

    pub fn stage(
        mut self,
        label: &'static str,
        stage: impl FnOnce() -> StageResult<T> + 'a,
    ) -> Self {
        self.stages.push((label, Box::new(stage)));
        self
    }

    pub fn run(self) -> Result<T, Exhausted> {
        let name = self.name;
        let mut last_error = None;

        for (label, stage) in self.stages {
            if let Some(value) = settle(name, label, stage(), &mut last_error) {
                return Ok(value);
            }
        }

        Err(Exhausted {
            chain: name,
            last_error,
        })
    }
}

fn settle<T>(
    chain: &str,
    label: &str,
    outcome: StageResult<T>,
    last_error: &mut Option<String>,
) -> Option<T> {
    match outcome {
        Ok(Some(value)) => {
            info!("[{chain}] strategy '{label}' succeeded");
            Some(value)
        }
        Ok(None) => {
            debug!("[{chain}] strategy '{label}' found nothing");
            None
        }
        Err(e) => {
            warn!("[{chain}] strategy '{label}' failed: {e}");
            *last_error = Some(e.to_string());
            None
        }
    }
}
