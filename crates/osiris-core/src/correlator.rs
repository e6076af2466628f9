use crate::api::{bounded, MonitoringApi, CORRELATION_REQUEST_TIMEOUT};
use crate::config::Config;
use crate::error::StageError;
use crate::logging::LogSink;
use crate::model::Entity;
use crate::walker::{extract_candidates, IncidentCandidate};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Outer ceiling on a stage dispatched to the background.
pub const STAGE_CEILING: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationStage {
    StructuredProbe,
    HeuristicDiscovery,
    LegacyViolations,
}

impl CorrelationStage {
    pub const ORDER: [CorrelationStage; 3] = [
        CorrelationStage::StructuredProbe,
        CorrelationStage::HeuristicDiscovery,
        CorrelationStage::LegacyViolations,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CorrelationStage::StructuredProbe => "structured-probe",
            CorrelationStage::HeuristicDiscovery => "heuristic-discovery",
            CorrelationStage::LegacyViolations => "legacy-violations",
        }
    }
}

/// Outcome of one stage. A failed stage reports zero of both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    pub stage: CorrelationStage,
    pub candidates: usize,
    pub matches: usize,
}

impl StageReport {
    fn empty(stage: CorrelationStage) -> Self {
        Self {
            stage,
            candidates: 0,
            matches: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationReport {
    pub stages: Vec<StageReport>,
    pub matched_stage: Option<CorrelationStage>,
    pub matches: usize,
}

impl CorrelationReport {
    pub fn attempted(&self) -> Vec<CorrelationStage> {
        self.stages.iter().map(|report| report.stage).collect()
    }
}

/// One open violation from the legacy REST listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violation {
    pub title: String,
    pub details: String,
    pub target_names: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeResponse {
    #[serde(default)]
    data: Option<ProbeData>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeData {
    #[serde(default)]
    actor: Option<ProbeActor>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeActor {
    #[serde(default)]
    entities: Option<Vec<Option<ProbeEntity>>>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeEntity {
    #[serde(default)]
    guid: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    incidents: Option<Vec<ProbeIncident>>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeIncident {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    severity: Option<String>,
}

/// Attaches alert state to freshly fetched entities. Stages run in
/// [`CorrelationStage::ORDER`] and the chain stops at the first one that
/// matches. Timeouts, backend errors and panics count as no matches.
pub struct IncidentCorrelator {
    api: Arc<dyn MonitoringApi>,
    account_id: String,
    log: Arc<dyn LogSink>,
    request_timeout: Duration,
    stage_ceiling: Duration,
}

impl IncidentCorrelator {
    pub fn new(api: Arc<dyn MonitoringApi>, config: &Config, log: Arc<dyn LogSink>) -> Self {
        Self {
            api,
            account_id: config.account_id.clone(),
            log,
            request_timeout: CORRELATION_REQUEST_TIMEOUT,
            stage_ceiling: STAGE_CEILING,
        }
    }

    pub fn with_timeouts(mut self, request_timeout: Duration, stage_ceiling: Duration) -> Self {
        self.request_timeout = request_timeout;
        self.stage_ceiling = stage_ceiling;
        self
    }

    /// Mutates alert fields on `entities` in place. Never fails.
    pub async fn correlate(&self, entities: &mut [Entity]) -> CorrelationReport {
        let mut report = CorrelationReport::default();
        if entities.is_empty() {
            return report;
        }
        for stage in CorrelationStage::ORDER {
            let outcome = match self.run_stage(stage, entities).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.log
                        .log(&format!("correlation {} yielded nothing: {err}", stage.label()));
                    StageReport::empty(stage)
                }
            };
            report.stages.push(outcome);
            let matches = outcome.matches;
            if matches > 0 {
                self.log.log(&format!(
                    "correlation {} matched {matches} entities",
                    stage.label()
                ));
                report.matched_stage = Some(stage);
                report.matches = matches;
                break;
            }
        }
        report
    }

    async fn run_stage(
        &self,
        stage: CorrelationStage,
        entities: &mut [Entity],
    ) -> Result<StageReport, StageError> {
        let api = Arc::clone(&self.api);
        let limit = self.request_timeout;
        match stage {
            CorrelationStage::StructuredProbe => {
                let guids: Vec<String> = entities
                    .iter()
                    .filter(|entity| !entity.guid.is_empty())
                    .map(|entity| entity.guid.clone())
                    .collect();
                if guids.is_empty() {
                    return Ok(StageReport::empty(stage));
                }
                let query = probe_query(&guids);
                let candidates = self
                    .isolated(async move {
                        let value = bounded(limit, api.graphql(&query)).await?;
                        Ok::<_, StageError>(parse_probe(value))
                    })
                    .await?;
                Ok(StageReport {
                    stage,
                    candidates: candidates.len(),
                    matches: apply_candidates(entities, &candidates),
                })
            }
            CorrelationStage::HeuristicDiscovery => {
                let query = discovery_query(&self.account_id);
                let candidates = self
                    .isolated(async move {
                        let value = bounded(limit, api.graphql(&query)).await?;
                        let found = value
                            .get("data")
                            .map(extract_candidates)
                            .unwrap_or_default();
                        Ok::<_, StageError>(found)
                    })
                    .await?;
                Ok(StageReport {
                    stage,
                    candidates: candidates.len(),
                    matches: apply_candidates(entities, &candidates),
                })
            }
            CorrelationStage::LegacyViolations => {
                let violations = self
                    .isolated(async move {
                        let value = bounded(limit, api.open_violations()).await?;
                        Ok::<_, StageError>(parse_violations(&value))
                    })
                    .await?;
                Ok(StageReport {
                    stage,
                    candidates: violations.len(),
                    matches: apply_violations(entities, &violations, self.log.as_ref()),
                })
            }
        }
    }

    /// Runs `work` on its own task and waits at most the stage ceiling.
    /// On timeout the task is left to drain its own request deadline.
    async fn isolated<T, F>(&self, work: F) -> Result<T, StageError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, StageError>> + Send + 'static,
    {
        let handle = tokio::spawn(work);
        match tokio::time::timeout(self.stage_ceiling, handle).await {
            Err(_) => Err(StageError::Timeout(self.stage_ceiling)),
            Ok(Err(join_err)) => Err(StageError::InternalFault(join_err.to_string())),
            Ok(Ok(result)) => result,
        }
    }
}

pub fn probe_query(guids: &[String]) -> String {
    let list = guids
        .iter()
        .map(|guid| format!("\"{}\"", guid.replace('"', "")))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{{ actor {{ entities(guids: [{list}]) {{ guid name entityType incidents {{ title description severity }} }} }} }}"
    )
}

pub fn discovery_query(account_id: &str) -> String {
    let account: String = account_id.chars().filter(char::is_ascii_digit).collect();
    format!(
        "{{ actor {{ account(id: {account}) {{ aiIssues {{ issues(filter: {{states: [ACTIVATED, CREATED]}}) {{ issues {{ issueId title description priority entityGuids entityNames }} }} }} }} }} }}"
    )
}

/// Schemas without incident fields answer with errors and no data; that
/// is an empty probe, not a failure.
fn parse_probe(value: Value) -> Vec<IncidentCandidate> {
    let Ok(response) = serde_json::from_value::<ProbeResponse>(value) else {
        return Vec::new();
    };
    let entities = response
        .data
        .and_then(|data| data.actor)
        .and_then(|actor| actor.entities)
        .unwrap_or_default();
    let mut candidates = Vec::new();
    for entity in entities.into_iter().flatten() {
        let id = entity
            .guid
            .filter(|guid| !guid.is_empty())
            .or(entity.name)
            .unwrap_or_default();
        if id.is_empty() {
            continue;
        }
        for incident in entity.incidents.unwrap_or_default() {
            let title = incident.title.unwrap_or_default();
            let mut description = incident.description.unwrap_or_default();
            if let Some(severity) = incident.severity.filter(|severity| !severity.is_empty()) {
                description = if description.is_empty() {
                    format!("[{severity}]")
                } else {
                    format!("[{severity}] {description}")
                };
            }
            candidates.push(IncidentCandidate {
                title,
                description,
                identifiers: vec![id.clone()],
            });
        }
    }
    candidates
}

/// Exact identifier matching: a candidate id must equal the entity's guid
/// or its name.
pub fn apply_candidates(entities: &mut [Entity], candidates: &[IncidentCandidate]) -> usize {
    let mut matched = 0;
    for candidate in candidates {
        for entity in entities.iter_mut() {
            if candidate.identifies(&entity.guid) || candidate.identifies(&entity.name) {
                entity.apply_alert(&candidate.title, &candidate.description);
                matched += 1;
            }
        }
    }
    matched
}

pub fn parse_violations(value: &Value) -> Vec<Violation> {
    let Some(items) = value.get("violations").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|item| {
            let text = |key: &str| {
                item.get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            let mut target_names = Vec::new();
            if let Some(targets) = item.get("targets").and_then(Value::as_array) {
                target_names.extend(
                    targets
                        .iter()
                        .filter_map(|target| target.get("name").and_then(Value::as_str))
                        .map(str::to_string),
                );
            }
            if let Some(entity) = item.get("links").and_then(|links| links.get("entity")) {
                match entity {
                    Value::String(name) => target_names.push(name.clone()),
                    Value::Number(id) => target_names.push(id.to_string()),
                    _ => {}
                }
            }
            if let Some(name) = item.get("entity_name").and_then(Value::as_str) {
                target_names.push(name.to_string());
            }
            if let Some(name) = item
                .get("entity")
                .and_then(|entity| entity.get("name"))
                .and_then(Value::as_str)
            {
                target_names.push(name.to_string());
            }
            Violation {
                title: text("condition_name"),
                details: text("details"),
                target_names,
            }
        })
        .collect()
}

/// Case-insensitive containment in either direction. Empty names never
/// match, since the empty string is contained in everything.
pub fn names_overlap(left: &str, right: &str) -> bool {
    if left.trim().is_empty() || right.trim().is_empty() {
        return false;
    }
    let left = left.to_lowercase();
    let right = right.to_lowercase();
    left.contains(&right) || right.contains(&left)
}

/// Best-effort name matching. One violation may hit several entities whose
/// names overlap, and every hit is counted.
pub fn apply_violations(entities: &mut [Entity], violations: &[Violation], log: &dyn LogSink) -> usize {
    let mut matched = 0;
    for violation in violations {
        for target in &violation.target_names {
            for entity in entities.iter_mut() {
                if names_overlap(&entity.name, target) {
                    entity.apply_alert(&violation.title, &violation.details);
                    log.log(&format!(
                        "Matched REST violation to {} via name '{target}'",
                        entity.name
                    ));
                    matched += 1;
                }
            }
        }
    }
    matched
}
