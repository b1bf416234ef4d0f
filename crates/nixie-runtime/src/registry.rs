//! Process-wide directory of live actors
//!
//! TigerStyle: One mutual-exclusion domain; snapshot reads never observe a
//! partially-applied mutation.
//!
//! The registry is an explicit container with its own lifecycle, not ambient
//! global state. Actors are inserted at start and remove themselves when
//! their dispatch loop exits. `stop_all` works from a stable snapshot, so
//! actors started concurrently may or may not be included, but the registry
//! itself stays consistent.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, instrument};

use crate::actor_ref::ActorHandle;

/// Insertion-ordered directory of live actors
#[derive(Default)]
pub struct ActorRegistry {
    entries: Mutex<Vec<Arc<dyn ActorHandle>>>,
}

impl ActorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an actor at the tail of the registration order
    pub fn register(&self, handle: Arc<dyn ActorHandle>) {
        assert!(!handle.urn().is_empty(), "actor urn must not be empty");
        let mut entries = self.lock();
        debug_assert!(
            entries.iter().all(|e| e.urn() != handle.urn()),
            "duplicate registration for {}",
            handle.urn()
        );
        debug!(urn = %handle.urn(), "Actor registered");
        entries.push(handle);
    }

    /// Remove an actor by identifier
    ///
    /// Idempotent: removing an unknown urn is a no-op. Returns whether an
    /// entry was actually removed.
    pub fn unregister(&self, urn: &str) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|e| e.urn() != urn);
        let removed = entries.len() < before;
        if removed {
            debug!(urn, "Actor unregistered");
        }
        removed
    }

    /// Look up one actor by identifier
    pub fn get(&self, urn: &str) -> Option<Arc<dyn ActorHandle>> {
        self.lock().iter().find(|e| e.urn() == urn).cloned()
    }

    /// Consistent point-in-time view of live actors, in registration order
    pub fn snapshot(&self) -> Vec<Arc<dyn ActorHandle>> {
        self.lock().clone()
    }

    /// Number of registered actors
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Stop every actor in a stable snapshot and wait for each to finish
    ///
    /// Stop requests go out in reverse registration order, so late-started
    /// actors wind down before the ones they may depend on. Already-dead
    /// actors are skipped. Returns the number of actors waited on.
    #[instrument(skip(self), level = "debug")]
    pub async fn stop_all(&self) -> usize {
        let snapshot = self.snapshot();

        let mut stopped = 0_usize;
        for handle in snapshot.iter().rev() {
            // A dead-actor error here just means it beat us to shutdown.
            let _ = handle.stop();
        }
        for handle in snapshot.iter().rev() {
            handle.wait_stopped().await;
            stopped += 1;
        }

        info!(stopped, "Registry stopped all actors");
        stopped
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn ActorHandle>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ActorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorRegistry")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::system::ActorSystem;
    use async_trait::async_trait;
    use nixie_core::error::Result;

    struct NoopActor;

    #[async_trait]
    impl Actor for NoopActor {
        type Message = ();
        type Reply = ();

        async fn on_receive(&mut self, _message: ()) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_register_snapshot_order() {
        let system = ActorSystem::new();
        let a = system.start(NoopActor);
        let b = system.start(NoopActor);
        let c = system.start(NoopActor);

        let snapshot = system.registry().snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].urn(), a.urn());
        assert_eq!(snapshot[1].urn(), b.urn());
        assert_eq!(snapshot[2].urn(), c.urn());
    }

    struct FakeHandle {
        urn: String,
    }

    #[async_trait]
    impl ActorHandle for FakeHandle {
        fn urn(&self) -> &str {
            &self.urn
        }

        fn is_alive(&self) -> bool {
            true
        }

        fn stop(&self) -> Result<()> {
            Ok(())
        }

        async fn wait_stopped(&self) {}
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = ActorRegistry::new();
        registry.register(Arc::new(FakeHandle {
            urn: "urn:uuid:fake-1".to_string(),
        }));

        assert!(registry.unregister("urn:uuid:fake-1"));
        assert!(!registry.unregister("urn:uuid:fake-1"));
        assert!(!registry.unregister("urn:uuid:never-registered"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_stopped_actor_removes_itself() {
        let system = ActorSystem::new();
        let a = system.start(NoopActor);
        assert_eq!(system.registry().len(), 1);
        assert!(system.registry().get(a.urn()).is_some());

        a.stop().unwrap();
        a.wait_stopped().await;
        assert!(system.registry().get(a.urn()).is_none());
        assert!(system.registry().is_empty());
    }

    #[tokio::test]
    async fn test_stop_all_waits_for_every_actor() {
        let system = ActorSystem::new();
        let refs = [
            system.start(NoopActor),
            system.start(NoopActor),
            system.start(NoopActor),
        ];

        let stopped = system.registry().stop_all().await;
        assert_eq!(stopped, 3);
        assert!(system.registry().is_empty());
        for actor_ref in &refs {
            assert!(!actor_ref.is_alive());
        }
    }

    #[tokio::test]
    async fn test_stop_all_on_empty_registry() {
        let registry = ActorRegistry::new();
        assert_eq!(registry.stop_all().await, 0);
    }
}
