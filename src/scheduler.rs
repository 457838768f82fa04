use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{error, info};

use crate::{deadline, error::PatdResult, state::AppState};

#[async_trait]
pub trait ScheduledTask: Send + Sync {
    fn name(&self) -> &'static str;
    fn interval(&self) -> Duration;
    async fn run(&self, state: &AppState) -> PatdResult<()>;
}

pub struct DeadlineTicker {
    interval: Duration,
}

impl DeadlineTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[async_trait]
impl ScheduledTask for DeadlineTicker {
    fn name(&self) -> &'static str {
        "tick_deadlines"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self, state: &AppState) -> PatdResult<()> {
        deadline::tick_deadlines(state).await.map(|_| ())
    }
}

pub struct SoftDeleteSweep {
    interval: Duration,
}

impl SoftDeleteSweep {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[async_trait]
impl ScheduledTask for SoftDeleteSweep {
    fn name(&self) -> &'static str {
        "sweep_soft_deleted"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self, state: &AppState) -> PatdResult<()> {
        let report = deadline::sweep_soft_deleted(state).await?;
        info!(purged = report.purged, failed = report.failed, "soft-delete sweep finished");
        Ok(())
    }
}

/// Runs every registered task on its own interval from a single loop.
/// Tasks never overlap; a slow task only delays the next due one.
pub struct Scheduler {
    state: Arc<AppState>,
    tasks: Vec<(Arc<dyn ScheduledTask>, Instant)>,
}

impl Scheduler {
    pub fn new(state: Arc<AppState>, tasks: Vec<Arc<dyn ScheduledTask>>) -> Self {
        let now = Instant::now();
        Self {
            state,
            tasks: tasks.into_iter().map(|task| (task, now)).collect(),
        }
    }

    pub async fn run(&mut self) {
        info!(tasks = self.tasks.len(), "scheduler started");
        loop {
            self.tick().await;
            let next_due = self.tasks.iter().map(|(_, due)| *due).min();
            match next_due {
                Some(due) => tokio::time::sleep_until(due).await,
                None => sleep(Duration::from_secs(60)).await,
            }
        }
    }

    pub async fn tick(&mut self) {
        for (task, due) in &mut self.tasks {
            if Instant::now() < *due {
                continue;
            }
            if let Err(err) = task.run(&self.state).await {
                error!(task = task.name(), error = %err, "scheduled task failed");
            }
            *due = Instant::now() + task.interval();
        }
    }
}

pub fn default_tasks(tick_interval: Duration, sweep_interval: Duration) -> Vec<Arc<dyn ScheduledTask>> {
    vec![
        Arc::new(DeadlineTicker::new(tick_interval)),
        Arc::new(SoftDeleteSweep::new(sweep_interval)),
    ]
}
