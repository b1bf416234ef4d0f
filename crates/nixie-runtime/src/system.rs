//! Actor system: the assembly point for the engine
//!
//! TigerStyle: Explicit container with init/teardown, no ambient globals.
//!
//! An [`ActorSystem`] owns the registry and the substrate handle. `start`
//! wires an actor's mailbox, lifecycle watch, and dispatch loop together and
//! registers it; `shutdown` stops everything through the registry.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use nixie_core::constants::ACTOR_URN_PREFIX;
use nixie_core::runtime::{ActorRuntime, TokioRuntime};

use crate::actor::{Actor, ActorState};
use crate::actor_ref::ActorRef;
use crate::dispatch::ActorCell;
use crate::mailbox::mailbox;
use crate::registry::ActorRegistry;
use crate::scheduler::Scheduler;

/// One in-process actor runtime instance
pub struct ActorSystem<R: ActorRuntime = TokioRuntime> {
    runtime: R,
    registry: Arc<ActorRegistry>,
}

impl<R: ActorRuntime> Clone for ActorSystem<R> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl ActorSystem<TokioRuntime> {
    /// Create a system on the tokio substrate
    pub fn new() -> Self {
        Self::with_runtime(TokioRuntime::new())
    }
}

impl Default for ActorSystem<TokioRuntime> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ActorRuntime> ActorSystem<R> {
    /// Create a system on an explicit substrate
    pub fn with_runtime(runtime: R) -> Self {
        Self {
            runtime,
            registry: Arc::new(ActorRegistry::new()),
        }
    }

    /// Start an actor and return a reference to it
    ///
    /// Non-blocking: the reference comes back immediately, while `on_start`
    /// runs at the head of the freshly spawned dispatch loop — its effects
    /// are still guaranteed visible to the first processed message.
    pub fn start<A: Actor>(&self, actor: A) -> ActorRef<A, R> {
        let urn = format!("{}{}", ACTOR_URN_PREFIX, Uuid::new_v4());
        assert!(urn.len() > ACTOR_URN_PREFIX.len());

        let (sender, receiver) = mailbox();
        let (state_tx, state_rx) = watch::channel(ActorState::Starting);
        let actor_ref = ActorRef::new(urn.clone(), sender, state_rx, self.runtime.clone());

        // Registered before the loop spawns, so a snapshot taken right after
        // start() already includes this actor.
        self.registry.register(Arc::new(actor_ref.clone()));

        let cell = ActorCell::new(urn.clone(), actor, receiver, state_tx, Arc::clone(&self.registry));
        drop(self.runtime.spawn(cell.run()));

        debug!(urn = %urn, "Actor started");
        actor_ref
    }

    /// The live-actor directory
    pub fn registry(&self) -> &ActorRegistry {
        &self.registry
    }

    /// A scheduler bound to this system's substrate
    pub fn scheduler(&self) -> Scheduler<R> {
        Scheduler::new(self.runtime.clone())
    }

    /// The substrate handle
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Stop every actor and wait for each to finish
    pub async fn shutdown(&self) -> usize {
        self.registry.stop_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nixie_core::error::Result;

    struct PingActor;

    #[async_trait]
    impl Actor for PingActor {
        type Message = String;
        type Reply = String;

        async fn on_receive(&mut self, message: String) -> Result<String> {
            Ok(format!("pong: {}", message))
        }
    }

    #[tokio::test]
    async fn test_start_returns_usable_ref() {
        let system = ActorSystem::new();
        let actor_ref = system.start(PingActor);

        assert!(actor_ref.urn().starts_with(ACTOR_URN_PREFIX));
        assert!(actor_ref.is_alive());
        assert_eq!(
            actor_ref.ask("hi".to_string()).await.unwrap(),
            "pong: hi"
        );
    }

    #[tokio::test]
    async fn test_started_actor_is_registered() {
        let system = ActorSystem::new();
        let actor_ref = system.start(PingActor);

        let found = system.registry().get(actor_ref.urn());
        assert!(found.is_some());
        assert_eq!(found.unwrap().urn(), actor_ref.urn());
    }

    #[tokio::test]
    async fn test_distinct_urns_per_actor() {
        let system = ActorSystem::new();
        let a = system.start(PingActor);
        let b = system.start(PingActor);
        assert_ne!(a.urn(), b.urn());
    }

    #[tokio::test]
    async fn test_shutdown_stops_everything() {
        let system = ActorSystem::new();
        let a = system.start(PingActor);
        let b = system.start(PingActor);

        let stopped = system.shutdown().await;
        assert_eq!(stopped, 2);
        assert!(!a.is_alive());
        assert!(!b.is_alive());
        assert!(system.registry().is_empty());
    }

    #[tokio::test]
    async fn test_system_usable_after_shutdown() {
        let system = ActorSystem::new();
        system.start(PingActor);
        system.shutdown().await;

        // New actors may still be started; shutdown drains, it does not seal.
        let fresh = system.start(PingActor);
        assert_eq!(
            fresh.ask("again".to_string()).await.unwrap(),
            "pong: again"
        );
    }
}
