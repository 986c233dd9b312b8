use std::collections::HashSet;
use std::thread;

use crate::cache::CacheStore;
use crate::config::PipelineSettings;
use crate::cursor::advance;
use crate::domain::{Country, CountryDataset, CountryName, DatasetsByCountry};
use crate::error::EmissionsError;
use crate::fetcher::CacheAsideFetcher;
use crate::footprint::FootprintClient;

#[derive(Debug, Clone)]
pub struct WorkSlice {
    pub countries: Vec<Country>,
    pub offset: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct FetchTask {
    pub country: Country,
    pub name: CountryName,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub datasets: DatasetsByCountry,
    pub fulfilled: usize,
    pub rejected: usize,
    pub offset: usize,
    pub total: usize,
    pub is_completed: bool,
}

pub struct BatchOrchestrator<'a, C: CacheStore + ?Sized, F: FootprintClient + ?Sized> {
    fetcher: CacheAsideFetcher<'a, C, F>,
    settings: &'a PipelineSettings,
}

impl<'a, C: CacheStore + ?Sized, F: FootprintClient + ?Sized> BatchOrchestrator<'a, C, F> {
    pub fn new(cache: &'a C, client: &'a F, settings: &'a PipelineSettings) -> Self {
        Self {
            fetcher: CacheAsideFetcher::new(cache, client, settings.ttls),
            settings,
        }
    }

    pub fn build_work_slice(&self, cursor: usize) -> Result<WorkSlice, EmissionsError> {
        let directory = self.fetcher.country_directory()?;
        let total = directory.len();
        let offset = advance(cursor, self.settings.batch_size, total);
        let countries = if cursor < total {
            directory.into_iter().take(offset).collect()
        } else {
            directory
        };
        Ok(WorkSlice {
            countries,
            offset,
            total,
        })
    }

    pub fn build_fetch_tasks(&self, countries: &[Country]) -> (Vec<FetchTask>, DatasetsByCountry) {
        let mut seen = HashSet::new();
        let mut tasks = Vec::new();
        for country in countries {
            let name = country.normalized_name();
            if self.settings.skipped.contains(&name) || !seen.insert(name.clone()) {
                continue;
            }
            tasks.push(FetchTask {
                country: country.clone(),
                name,
            });
        }
        (tasks, DatasetsByCountry::new())
    }

    pub fn run(&self, cursor: usize) -> Result<BatchOutcome, EmissionsError> {
        let slice = self.build_work_slice(cursor)?;
        let (tasks, mut datasets) = self.build_fetch_tasks(&slice.countries);
        let results = self.execute(&tasks);

        let mut fulfilled = 0usize;
        let mut rejected = 0usize;
        for (task, result) in tasks.iter().zip(results) {
            match result {
                Ok(dataset) => {
                    fulfilled += 1;
                    if let Some(key) = dataset_key(&dataset, task) {
                        datasets.insert(key, dataset);
                    }
                }
                Err(err) => {
                    rejected += 1;
                    tracing::warn!(
                        country = %task.name,
                        code = %task.country.country_code,
                        %err,
                        "country fetch rejected"
                    );
                }
            }
        }

        let is_completed = fulfilled + 1 >= slice.total;
        tracing::info!(
            offset = slice.offset,
            total = slice.total,
            fulfilled,
            rejected,
            is_completed,
            "batch settled"
        );

        Ok(BatchOutcome {
            datasets,
            fulfilled,
            rejected,
            offset: slice.offset,
            total: slice.total,
            is_completed,
        })
    }

    // Every wave is joined before the next one starts.
    fn execute(&self, tasks: &[FetchTask]) -> Vec<Result<CountryDataset, EmissionsError>> {
        let wave = self.settings.max_concurrency.max(1);
        let mut results = Vec::with_capacity(tasks.len());
        for chunk in tasks.chunks(wave) {
            thread::scope(|scope| {
                let handles = chunk
                    .iter()
                    .map(|task| {
                        thread::Builder::new().spawn_scoped(scope, move || {
                            self.fetcher.country_dataset(&task.country.country_code)
                        })
                    })
                    .collect::<Vec<_>>();
                for handle in handles {
                    results.push(match handle {
                        Ok(handle) => handle.join().unwrap_or_else(|_| {
                            Err(EmissionsError::UpstreamHttp("fetch task panicked".to_string()))
                        }),
                        Err(err) => Err(EmissionsError::UpstreamHttp(format!(
                            "failed to start fetch task: {err}"
                        ))),
                    });
                }
            });
        }
        results
    }
}

fn dataset_key(dataset: &CountryDataset, task: &FetchTask) -> Option<CountryName> {
    let first = dataset.first()?;
    let name = CountryName::normalize(&first.country_name);
    if name.is_empty() {
        Some(task.name.clone())
    } else {
        Some(name)
    }
}
