//! Cron schedule runner.
//!
//! Keeps one timer task per scheduled job definition. Registration is driven
//! by in-process calls: the external CRUD surface upserts or removes entries
//! when definitions change, and startup re-registers everything enabled so
//! schedules survive restarts without persisting timer state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use runforge_core::cron::{next_after, parse};
use runforge_core::error::CoreError;
use runforge_core::types::{DbId, Timestamp};
use runforge_core::vars::{self, VariableSpec};
use runforge_db::models::{JobDefinition, VariableField};
use runforge_db::repositories::JobDefinitionRepo;
use runforge_db::DbPool;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::RunTrigger;

/// One registered schedule: the parsed expression, the switch that stops its
/// timer task, and the task itself.
struct ScheduleEntry {
    schedule: Schedule,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Fires scheduled runs through a [`RunTrigger`].
///
/// At most one entry exists per job definition id; upserting replaces any
/// previous registration after stopping its timer.
pub struct Scheduler {
    trigger: Arc<dyn RunTrigger>,
    entries: Mutex<HashMap<DbId, ScheduleEntry>>,
}

impl Scheduler {
    pub fn new(trigger: Arc<dyn RunTrigger>) -> Self {
        Self {
            trigger,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register or replace the schedule for a job definition.
    ///
    /// A disabled definition (or one with an empty expression) ends up with
    /// no entry at all; an invalid expression is rejected without touching
    /// the previous registration's replacement (it was already stopped).
    ///
    /// The definition's default variables are snapshotted here; edits to the
    /// fields take effect at the next upsert, while the definition itself is
    /// re-fetched at every fire.
    pub async fn upsert(
        &self,
        definition: &JobDefinition,
        fields: &[VariableField],
    ) -> Result<(), CoreError> {
        self.remove(definition.id).await;

        if !definition.schedule_enabled || definition.schedule_cron.trim().is_empty() {
            tracing::debug!(
                job_definition_id = definition.id,
                "Schedule disabled or empty, nothing registered"
            );
            return Ok(());
        }

        let schedule = parse(&definition.schedule_cron)?;
        let specs: Vec<VariableSpec> = fields.iter().map(VariableField::to_spec).collect();
        let defaults = vars::defaults(&specs);

        let cancel = CancellationToken::new();
        let task = Self::spawn_fire_loop(
            definition.id,
            schedule.clone(),
            defaults,
            Arc::clone(&self.trigger),
            cancel.clone(),
        );

        let mut entries = self.entries.lock().await;
        entries.insert(
            definition.id,
            ScheduleEntry {
                schedule,
                cancel,
                task,
            },
        );
        tracing::info!(
            job_definition_id = definition.id,
            cron = %definition.schedule_cron,
            "Schedule registered"
        );
        Ok(())
    }

    /// Stop and forget the schedule for a job definition, if one exists.
    /// The timer task winds down on its own after the cancel fires.
    pub async fn remove(&self, job_definition_id: DbId) {
        let entry = self.entries.lock().await.remove(&job_definition_id);
        if let Some(entry) = entry {
            entry.cancel.cancel();
            tracing::info!(job_definition_id, "Schedule removed");
        }
    }

    /// Next fire time of a registered schedule, `None` when the definition
    /// has no entry or the expression yields no future time.
    pub async fn next_fire_time(&self, job_definition_id: DbId) -> Option<Timestamp> {
        let entries = self.entries.lock().await;
        let entry = entries.get(&job_definition_id)?;
        next_after(&entry.schedule, Utc::now())
    }

    /// Stop every timer task and wait for them to wind down.
    pub async fn shutdown(&self) {
        let entries: Vec<ScheduleEntry> = {
            let mut map = self.entries.lock().await;
            map.drain().map(|(_, entry)| entry).collect()
        };
        for entry in &entries {
            entry.cancel.cancel();
        }
        for entry in entries {
            let _ = entry.task.await;
        }
        tracing::info!("Scheduler stopped");
    }

    /// Timer task for one schedule: sleep until the next fire time, trigger,
    /// repeat. Triggering only accepts the run; execution is concurrent, so
    /// a long run never delays the next fire.
    fn spawn_fire_loop(
        job_definition_id: DbId,
        schedule: Schedule,
        defaults: runforge_core::vars::VariableMap,
        trigger: Arc<dyn RunTrigger>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let Some(next) = next_after(&schedule, Utc::now()) else {
                    tracing::warn!(
                        job_definition_id,
                        "Schedule has no future fire time, stopping"
                    );
                    break;
                };

                let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
                if Utc::now() < next {
                    // Woke marginally early; recompute the wait.
                    continue;
                }

                match trigger
                    .trigger_run(job_definition_id, defaults.clone())
                    .await
                {
                    Ok(run_id) => {
                        tracing::info!(job_definition_id, run_id, "Scheduled run launched");
                    }
                    Err(err) => {
                        tracing::error!(job_definition_id, error = %err, "Scheduled trigger failed");
                    }
                }
            }
        })
    }
}

/// Register every enabled schedule found in the database. Invalid
/// expressions are logged and skipped so one bad row cannot block startup.
pub async fn register_startup_schedules(
    scheduler: &Scheduler,
    pool: &DbPool,
) -> Result<usize, sqlx::Error> {
    let definitions = JobDefinitionRepo::list_scheduled(pool).await?;
    let mut registered = 0;
    for definition in &definitions {
        let fields = JobDefinitionRepo::fields(pool, definition.id).await?;
        match scheduler.upsert(definition, &fields).await {
            Ok(()) => registered += 1,
            Err(err) => {
                tracing::error!(
                    job_definition_id = definition.id,
                    cron = %definition.schedule_cron,
                    error = %err,
                    "Skipping schedule with invalid expression"
                );
            }
        }
    }
    Ok(registered)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
