//! Counting actor driven by the scheduler.
//!
//! Run with: `cargo run --example counter`

use std::time::Duration;

use async_trait::async_trait;

use nixie_core::error::Result;
use nixie_core::telemetry::{init_telemetry, TelemetryConfig};
use nixie_runtime::{Actor, ActorSystem};

#[derive(Clone)]
enum Command {
    Increment,
    Get,
}

#[derive(Default)]
struct Counter {
    count: u64,
}

#[async_trait]
impl Actor for Counter {
    type Message = Command;
    type Reply = u64;

    async fn on_start(&mut self) -> Result<()> {
        tracing::info!("counter starting");
        Ok(())
    }

    async fn on_receive(&mut self, message: Command) -> Result<u64> {
        match message {
            Command::Increment => {
                self.count += 1;
                Ok(self.count)
            }
            Command::Get => Ok(self.count),
        }
    }

    async fn on_stop(&mut self) -> Result<()> {
        tracing::info!(count = self.count, "counter stopping");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry(TelemetryConfig::from_env())?;

    let system = ActorSystem::new();
    let counter = system.start(Counter::default());

    // One increment every 100ms, anchored to the original schedule.
    let ticker = system.scheduler().schedule_at_fixed_rate(
        Duration::from_millis(100),
        Duration::from_millis(100),
        &counter,
        Command::Increment,
    );

    tokio::time::sleep(Duration::from_millis(550)).await;
    ticker.cancel();

    let count = counter.ask(Command::Get).await?;
    tracing::info!(count, "final count");

    system.shutdown().await;
    Ok(())
}
