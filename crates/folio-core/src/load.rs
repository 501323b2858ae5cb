//! Load cycle identity and readiness waiting.
//!
//! Each load takes a [`LoadToken`] from the shared [`SandboxGeneration`].
//! Starting another load advances the generation, which makes every older
//! token stale. In-flight waits check their token after every suspension
//! and stop on their own; nothing signals them.

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use crate::config::EditorConfig;
use crate::types::SandboxId;

/// Monotonic source of sandbox ids, shared by every in-flight load.
#[derive(Debug, Clone, Default)]
pub struct SandboxGeneration(Rc<Cell<u64>>);

impl SandboxGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new cycle. All previously issued tokens go stale.
    pub fn advance(&self) -> LoadToken {
        let next = self.0.get() + 1;
        self.0.set(next);
        LoadToken {
            id: SandboxId(next),
            generation: self.clone(),
        }
    }

    /// Make every issued token stale without starting a cycle.
    pub fn invalidate(&self) {
        self.0.set(self.0.get() + 1);
    }

    pub fn current(&self) -> SandboxId {
        SandboxId(self.0.get())
    }
}

/// Ticket for one load cycle.
#[derive(Debug, Clone)]
pub struct LoadToken {
    id: SandboxId,
    generation: SandboxGeneration,
}

impl LoadToken {
    pub fn id(&self) -> SandboxId {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.generation.current() == self.id
    }
}

/// Observed state of a freshly written sandbox document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The context has no document yet.
    DocumentUnavailable,
    /// Parsing or subresources still in progress.
    Loading,
    Complete,
}

/// Reads the readiness of one sandbox.
pub trait ReadinessProbe {
    fn readiness(&self) -> Readiness;
}

/// Async sleep provided by the host event loop.
pub trait Timer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// The wait ended because a newer load took over (or the session closed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("load of {0} superseded")]
pub struct Superseded(pub SandboxId);

/// Poll until the sandbox reports complete, then wait the settle delay.
///
/// There is no retry cap. The loop ends when the document is ready or the
/// token goes stale.
pub async fn wait_until_ready<P, T>(
    probe: &P,
    timer: &T,
    token: &LoadToken,
    config: &EditorConfig,
) -> Result<(), Superseded>
where
    P: ReadinessProbe + ?Sized,
    T: Timer + ?Sized,
{
    let mut polls: u32 = 0;
    loop {
        if !token.is_current() {
            tracing::debug!(target: "folio::load", sandbox = %token.id(), polls, "superseded while polling");
            return Err(Superseded(token.id()));
        }
        match probe.readiness() {
            Readiness::Complete => break,
            state => {
                polls += 1;
                tracing::trace!(target: "folio::load", sandbox = %token.id(), ?state, "not ready");
                timer.sleep(config.poll_interval()).await;
            }
        }
    }

    timer.sleep(config.settle_delay()).await;
    if !token.is_current() {
        tracing::debug!(target: "folio::load", sandbox = %token.id(), "superseded while settling");
        return Err(Superseded(token.id()));
    }
    tracing::debug!(target: "folio::load", sandbox = %token.id(), polls, "sandbox ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InstantTimer, ScriptedProbe};

    #[tokio::test]
    async fn test_polls_until_complete_then_settles() {
        let probe = ScriptedProbe::new([
            Readiness::DocumentUnavailable,
            Readiness::Loading,
            Readiness::Loading,
        ]);
        let timer = InstantTimer::default();
        let generation = SandboxGeneration::new();
        let token = generation.advance();

        wait_until_ready(&probe, &timer, &token, &EditorConfig::default())
            .await
            .unwrap();

        assert_eq!(
            timer.sleeps(),
            vec![
                Duration::from_millis(100),
                Duration::from_millis(100),
                Duration::from_millis(100),
                Duration::from_millis(500),
            ]
        );
    }

    #[tokio::test]
    async fn test_superseded_while_polling() {
        let probe = ScriptedProbe::new([Readiness::Loading; 10]);
        let timer = InstantTimer::default();
        let generation = SandboxGeneration::new();
        let token = generation.advance();

        let newer = generation.clone();
        timer.on_sleep(move |n| {
            if n == 2 {
                newer.advance();
            }
        });

        let result = wait_until_ready(&probe, &timer, &token, &EditorConfig::default()).await;
        assert_eq!(result, Err(Superseded(SandboxId(1))));
        assert_eq!(timer.sleeps().len(), 2);
    }

    #[tokio::test]
    async fn test_superseded_while_settling() {
        let probe = ScriptedProbe::new([]);
        let timer = InstantTimer::default();
        let generation = SandboxGeneration::new();
        let token = generation.advance();

        let closer = generation.clone();
        timer.on_sleep(move |_| closer.invalidate());

        let result = wait_until_ready(&probe, &timer, &token, &EditorConfig::default()).await;
        assert!(result.is_err());
        assert_eq!(timer.sleeps(), vec![Duration::from_millis(500)]);
    }

    #[test]
    fn test_tokens_go_stale() {
        let generation = SandboxGeneration::new();
        let a = generation.advance();
        assert!(a.is_current());
        let b = generation.advance();
        assert!(!a.is_current());
        assert!(b.is_current());
        assert!(b.id() > a.id());
        generation.invalidate();
        assert!(!b.is_current());
    }
}
