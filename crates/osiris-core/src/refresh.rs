use crate::api::MonitoringApi;
use crate::config::Config;
use crate::correlator::{CorrelationReport, IncidentCorrelator};
use crate::fetcher::fetch_entities;
use crate::logging::LogSink;
use crate::model::EntitySet;
use crate::render::{RenderScheduler, RenderSummary};
use crate::state::SharedState;
use crate::ui::{ListSurface, StatusLine};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Timer,
    Manual,
}

impl RefreshTrigger {
    fn label(self) -> &'static str {
        match self {
            RefreshTrigger::Timer => "timer",
            RefreshTrigger::Manual => "manual",
        }
    }
}

#[derive(Debug)]
pub enum RefreshOutcome {
    /// Another cycle was in flight; this trigger was dropped.
    Skipped,
    Completed {
        generation: u64,
        entity_count: usize,
        error: Option<String>,
        /// Background correlation, present when the fetch returned rows.
        correlation: Option<JoinHandle<CorrelationReport>>,
    },
}

/// Publishes the raw fetch straight away, then correlates a private copy
/// of the entities in the background and republishes only if that fetch
/// is still the one on screen.
pub struct RefreshCoordinator<S> {
    api: Arc<dyn MonitoringApi>,
    config: Config,
    state: SharedState,
    renderer: RenderScheduler<S>,
    correlator: Arc<IncidentCorrelator>,
    log: Arc<dyn LogSink>,
}

impl<S: ListSurface + 'static> RefreshCoordinator<S> {
    pub fn new(
        api: Arc<dyn MonitoringApi>,
        config: Config,
        state: SharedState,
        renderer: RenderScheduler<S>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        let correlator = Arc::new(IncidentCorrelator::new(
            Arc::clone(&api),
            &config,
            Arc::clone(&log),
        ));
        Self {
            api,
            config,
            state,
            renderer,
            correlator,
            log,
        }
    }

    pub fn with_correlator(mut self, correlator: IncidentCorrelator) -> Self {
        self.correlator = Arc::new(correlator);
        self
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn request_render(&self) -> JoinHandle<RenderSummary> {
        self.renderer.render(self.state.snapshot())
    }

    pub async fn refresh(&self, trigger: RefreshTrigger) -> RefreshOutcome {
        let Some(generation) = self.state.begin_refresh() else {
            self.log.log(&format!(
                "refresh ({}) dropped: another refresh is in progress",
                trigger.label()
            ));
            return RefreshOutcome::Skipped;
        };
        self.log
            .log(&format!("refresh #{generation} started ({})", trigger.label()));
        self.renderer.render_status(StatusLine::Fetching);

        let set = self.fetch_isolated().await;
        let entity_count = set.len();
        let error = set.error.clone();
        let entities = set.entities.clone();
        self.state.publish_fetch(generation, set, Utc::now());
        self.log
            .log(&format!("refresh #{generation} published, queuing UI update"));
        self.request_render();

        let correlation = (!entities.is_empty()).then(|| {
            self.log.log(&format!(
                "launching async correlation for {entity_count} entities"
            ));
            let correlator = Arc::clone(&self.correlator);
            let state = self.state.clone();
            let renderer = self.renderer.clone();
            let log = Arc::clone(&self.log);
            tokio::spawn(async move {
                let mut entities = entities;
                let report = correlator.correlate(&mut entities).await;
                if state.publish_correlated(generation, entities) {
                    log.log("correlation completed, queuing UI update");
                    renderer.render(state.snapshot());
                } else {
                    log.log(&format!(
                        "correlation for refresh #{generation} discarded: superseded"
                    ));
                }
                report
            })
        });

        RefreshOutcome::Completed {
            generation,
            entity_count,
            error,
            correlation,
        }
    }

    /// Runs the fetch on its own task so a panic degrades to synthetic data
    /// instead of leaving the cycle marked in progress.
    async fn fetch_isolated(&self) -> EntitySet {
        let api = Arc::clone(&self.api);
        let config = self.config.clone();
        let log = Arc::clone(&self.log);
        let fetch =
            tokio::spawn(async move { fetch_entities(api.as_ref(), &config, log.as_ref()).await });
        match fetch.await {
            Ok(set) => set,
            Err(err) => {
                self.log.log(&format!("fetch task failed: {err}"));
                EntitySet::synthetic(format!("internal fault: {err}"))
            }
        }
    }

    /// Drives `Timer` refreshes. The first tick fires immediately, which
    /// doubles as the initial fetch.
    pub fn spawn_timer(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                self.refresh(RefreshTrigger::Timer).await;
            }
        })
    }
}
