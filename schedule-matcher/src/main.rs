use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use schedule_matcher::config::EngineConfig;
use schedule_matcher::directory::RouteDirectory;
use schedule_matcher::engine::MatchingEngine;
use schedule_matcher::feed::VehicleFeed;
use schedule_matcher::schedule::ScheduleStore;
use schedule_matcher::sink::{
    ConfirmedStop, ConfirmedStopSink, JsonLinesSink, LogSink, SinkError,
};
use schedule_matcher::transloc::TransLocClient;

/// Where confirmed stops go, chosen at startup.
enum Sink {
    Log(LogSink),
    JsonLines(JsonLinesSink),
}

impl ConfirmedStopSink for Sink {
    async fn record(&self, stop: &ConfirmedStop) -> Result<(), SinkError> {
        match self {
            Sink::Log(sink) => sink.record(stop).await,
            Sink::JsonLines(sink) => sink.record(stop).await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::from_env()?;
    info!(
        agency = config.agency_id,
        schedules = %config.schedules_dir.display(),
        timezone = %config.timezone.name(),
        "starting schedule matcher"
    );

    let client = TransLocClient::new(config.transloc())?;

    // Fail fast if either source is unusable at startup.
    let directory = RouteDirectory::new();
    directory.refresh(&client).await?;

    let schedules = ScheduleStore::new(config.schedule_store());
    schedules.refresh().await?;

    let sink = match &config.confirmed_log {
        Some(path) => {
            info!(path = %path.display(), "writing confirmed stops");
            Sink::JsonLines(JsonLinesSink::open(path).await?)
        }
        None => Sink::Log(LogSink),
    };

    let engine = MatchingEngine::new(
        directory.clone(),
        schedules.clone(),
        config.debouncer(),
        config.detector(),
        sink,
    );

    // Spawn background task to refresh routes and stops
    let topology_client = client.clone();
    let topology_refresh = config.topology_refresh();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(topology_refresh);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            if let Err(e) = directory.refresh(&topology_client).await {
                warn!(error = %e, "route directory refresh failed, keeping previous");
            }
        }
    });

    // Spawn background task to re-read timetables
    let schedule_store = schedules.clone();
    let schedule_refresh = config.schedule_refresh();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(schedule_refresh);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            if let Err(e) = schedule_store.refresh().await {
                error!(error = %e, "schedule refresh failed, keeping previous");
            }
        }
    });

    poll(&client, &engine, &schedules, config.poll_interval()).await;
    Ok(())
}

/// Poll the feed forever, matching each batch of reports.
async fn poll<F, K>(
    feed: &F,
    engine: &MatchingEngine<K>,
    schedules: &ScheduleStore,
    every: Duration,
) where
    F: VehicleFeed,
    K: ConfirmedStopSink + 'static,
{
    let timezone = schedules.config().timezone;
    let mut last_day_change: Option<NaiveDate> = schedules.snapshot().await.date();

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        // Schedules are per service day; rebuild once when the date changes.
        let today = Utc::now().with_timezone(&timezone).date_naive();
        if last_day_change != Some(today) {
            last_day_change = Some(today);
            if let Err(e) = schedules.refresh_for(today).await {
                error!(date = %today, error = %e, "schedule rollover failed, keeping previous");
            }
        }

        let reports = match feed.fetch_vehicles().await {
            Ok(reports) => reports,
            Err(e) => {
                warn!(error = %e, "vehicle feed unavailable, skipping tick");
                continue;
            }
        };

        engine.process_tick(reports).await;
    }
}
