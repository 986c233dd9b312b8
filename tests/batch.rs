mod common;

use assert_matches::assert_matches;
use common::{CountingCache, Failure, StubFootprint, country, records};
use footprint_seed::batch::BatchOrchestrator;
use footprint_seed::config::{DEFAULT_MAX_CONCURRENCY, PipelineSettings};
use footprint_seed::domain::CountryName;
use footprint_seed::error::EmissionsError;

fn settings(batch_size: usize) -> PipelineSettings {
    PipelineSettings {
        batch_size,
        ..PipelineSettings::default()
    }
}

fn directory(len: usize) -> Vec<footprint_seed::domain::Country> {
    (0..len)
        .map(|i| country(&i.to_string(), &format!("Country {i}")))
        .collect()
}

#[test]
fn slice_grows_as_prefix() {
    let cache = CountingCache::new();
    let client = StubFootprint::new(directory(25));
    let settings = settings(10);
    let orchestrator = BatchOrchestrator::new(&cache, &client, &settings);

    let first = orchestrator.build_work_slice(0).unwrap();
    assert_eq!(first.countries.len(), 10);
    assert_eq!(first.offset, 10);
    assert_eq!(first.total, 25);

    let third = orchestrator.build_work_slice(20).unwrap();
    assert_eq!(third.countries.len(), 25);
    assert_eq!(third.offset, 30);
    assert_eq!(third.countries[0].country_code, "0");
}

#[test]
fn slice_is_full_directory_once_past_end() {
    let cache = CountingCache::new();
    let client = StubFootprint::new(directory(25));
    let settings = settings(10);
    let orchestrator = BatchOrchestrator::new(&cache, &client, &settings);

    for _ in 0..3 {
        let slice = orchestrator.build_work_slice(30).unwrap();
        assert_eq!(slice.offset, 30);
        assert_eq!(slice.countries.len(), 25);
    }
}

#[test]
fn two_countries_batch_of_five() {
    let cache = CountingCache::new();
    let client = StubFootprint::new(vec![country("US", "USA"), country("CA", "Canada")]);
    let settings = settings(5);
    let orchestrator = BatchOrchestrator::new(&cache, &client, &settings);

    let slice = orchestrator.build_work_slice(0).unwrap();
    assert_eq!(slice.countries.len(), 2);
    assert_eq!(slice.offset, 5);
    assert_eq!(slice.total, 2);
    assert_eq!(client.directory_calls(), 1);
}

#[test]
fn tasks_skip_listed_and_duplicate_names() {
    let cache = CountingCache::new();
    let client = StubFootprint::new(Vec::new());
    let settings = settings(10);
    let orchestrator = BatchOrchestrator::new(&cache, &client, &settings);

    let countries = vec![
        country("US", "USA"),
        country("CA", "Canada"),
        country("5001", "All"),
        country("US2", " usa "),
    ];
    let (tasks, accumulator) = orchestrator.build_fetch_tasks(&countries);

    let codes = tasks
        .iter()
        .map(|task| task.country.country_code.as_str())
        .collect::<Vec<_>>();
    assert_eq!(codes, vec!["US", "CA"]);
    assert_eq!(tasks[0].name, CountryName::from("usa"));
    assert!(accumulator.is_empty());
}

#[test]
fn partial_failure_does_not_abort_batch() {
    let cache = CountingCache::new();
    let client = StubFootprint::new(vec![
        country("1", "Armenia"),
        country("2", "Afghanistan"),
        country("3", "Kenya"),
        country("5001", "All"),
    ])
    .with_data("1", records("Armenia", "1", &[(2020, 5.0)]))
    .with_data("2", records("Afghanistan", "2", &[(2020, 3.0)]))
    .failing("3", Failure::RateLimited);
    let settings = settings(10);
    let orchestrator = BatchOrchestrator::new(&cache, &client, &settings);

    let outcome = orchestrator.run(0).unwrap();
    assert_eq!(outcome.fulfilled, 2);
    assert_eq!(outcome.rejected, 1);
    assert_eq!(outcome.total, 4);
    assert!(!outcome.is_completed);
    assert_eq!(outcome.datasets.len(), 2);
    assert!(outcome.datasets.contains_key(&CountryName::from("armenia")));
    assert!(!outcome.datasets.contains_key(&CountryName::from("kenya")));
    assert!(!client.requested().contains("5001"));
}

#[test]
fn completes_when_every_real_country_is_fulfilled() {
    let cache = CountingCache::new();
    let client = StubFootprint::new(vec![
        country("1", "Armenia"),
        country("2", "Afghanistan"),
        country("5001", "All"),
    ])
    .with_data("1", records("Armenia", "1", &[(2020, 5.0)]));
    let settings = settings(10);
    let orchestrator = BatchOrchestrator::new(&cache, &client, &settings);

    let outcome = orchestrator.run(0).unwrap();
    // empty datasets still count as fulfilled
    assert_eq!(outcome.fulfilled, 2);
    assert!(outcome.is_completed);
    assert_eq!(outcome.datasets.len(), 1);
}

#[test]
fn merge_key_comes_from_returned_records() {
    let cache = CountingCache::new();
    let client = StubFootprint::new(vec![country("US", "United States")])
        .with_data("US", records("USA", "US", &[(2020, 1.0)]));
    let settings = settings(10);
    let orchestrator = BatchOrchestrator::new(&cache, &client, &settings);

    let outcome = orchestrator.run(0).unwrap();
    assert!(outcome.datasets.contains_key(&CountryName::from("usa")));
}

#[test]
fn bounded_concurrency_fetches_everything() {
    let cache = CountingCache::new();
    let mut client = StubFootprint::new(directory(7));
    for i in 0..7 {
        let code = i.to_string();
        let name = format!("Country {i}");
        client = client.with_data(&code, records(&name, &code, &[(2000, i as f64 + 1.0)]));
    }
    let settings = PipelineSettings {
        batch_size: 10,
        max_concurrency: 3,
        ..PipelineSettings::default()
    };
    let orchestrator = BatchOrchestrator::new(&cache, &client, &settings);

    let outcome = orchestrator.run(0).unwrap();
    assert_eq!(outcome.fulfilled, 7);
    assert_eq!(outcome.datasets.len(), 7);
    assert_eq!(client.data_calls(), 7);
}

#[test]
fn default_settings_cap_threads_per_wave() {
    let cache = CountingCache::new();
    let mut client = StubFootprint::new(directory(40));
    for i in 0..40 {
        let code = i.to_string();
        let name = format!("Country {i}");
        client = client.with_data(&code, records(&name, &code, &[(2000, 1.0)]));
    }
    let settings = PipelineSettings {
        batch_size: 40,
        ..PipelineSettings::default()
    };
    let orchestrator = BatchOrchestrator::new(&cache, &client, &settings);

    let outcome = orchestrator.run(0).unwrap();
    assert_eq!(outcome.fulfilled, 40);
    assert!(client.peak_in_flight() <= DEFAULT_MAX_CONCURRENCY);
}

#[test]
fn directory_failure_is_fatal() {
    let cache = CountingCache::new();
    let client = StubFootprint::new(Vec::new()).directory_failing(Failure::Status(502));
    let settings = settings(10);
    let orchestrator = BatchOrchestrator::new(&cache, &client, &settings);

    let err = orchestrator.run(0).unwrap_err();
    assert_matches!(err, EmissionsError::DirectoryFetchFailed(_));
    assert_eq!(err.status_code(), 500);
}

#[test]
fn directory_rate_limit_surfaces_as_429() {
    let cache = CountingCache::new();
    let client = StubFootprint::new(Vec::new()).directory_failing(Failure::RateLimited);
    let settings = settings(10);
    let orchestrator = BatchOrchestrator::new(&cache, &client, &settings);

    let err = orchestrator.run(0).unwrap_err();
    assert_matches!(err, EmissionsError::UpstreamRateLimited);
    assert_eq!(err.status_code(), 429);
}
