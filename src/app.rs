use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::aggregate::{sort_descending, transform};
use crate::batch::BatchOrchestrator;
use crate::cache::CacheStore;
use crate::config::PipelineSettings;
use crate::cursor::CursorManager;
use crate::domain::EmissionsSnapshot;
use crate::error::EmissionsError;
use crate::footprint::FootprintClient;

#[derive(Debug, Clone)]
pub struct PollOptions {
    pub max_rounds: usize,
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            max_rounds: 30,
            interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResult {
    pub rounds: usize,
    pub snapshot: EmissionsSnapshot,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<C: CacheStore, F: FootprintClient> {
    cache: C,
    client: F,
    settings: PipelineSettings,
}

impl<C: CacheStore, F: FootprintClient> App<C, F> {
    pub fn new(cache: C, client: F, settings: PipelineSettings) -> Self {
        Self {
            cache,
            client,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    fn cursor_manager(&self) -> CursorManager<'_, C> {
        CursorManager::new(&self.cache, self.settings.ttls.cursor)
    }

    pub fn prepare_emissions_snapshot(&self) -> Result<EmissionsSnapshot, EmissionsError> {
        let cursor = self.cursor_manager();
        let offset = cursor.read()?;

        let orchestrator = BatchOrchestrator::new(&self.cache, &self.client, &self.settings);
        let outcome = orchestrator.run(offset)?;

        let mut emissions_per_country = transform(&outcome.datasets);
        sort_descending(&mut emissions_per_country);

        cursor.persist(outcome.offset);

        Ok(EmissionsSnapshot {
            emissions_per_country,
            is_completed: outcome.is_completed,
        })
    }

    pub fn poll_until_complete(
        &self,
        options: &PollOptions,
        sink: &dyn ProgressSink,
    ) -> Result<PollResult, EmissionsError> {
        let started = Instant::now();
        let max_rounds = options.max_rounds.max(1);
        let mut round = 1;
        loop {
            let snapshot = self.prepare_emissions_snapshot()?;
            sink.event(ProgressEvent {
                message: format!(
                    "round {round}/{max_rounds}; years={} completed={}",
                    snapshot.emissions_per_country.len(),
                    snapshot.is_completed
                ),
                elapsed: Some(started.elapsed()),
            });
            if snapshot.is_completed || round >= max_rounds {
                return Ok(PollResult {
                    rounds: round,
                    snapshot,
                });
            }
            round += 1;
            if !options.interval.is_zero() {
                thread::sleep(options.interval);
            }
        }
    }

    pub fn cursor(&self) -> Result<usize, EmissionsError> {
        self.cursor_manager().read()
    }

    pub fn reset(&self, flush: bool) -> Result<(), EmissionsError> {
        if flush {
            self.cache.flush_all()
        } else {
            self.cursor_manager().reset()
        }
    }
}
