use crate::api::{bounded, first_graphql_error, GraphqlError, MonitoringApi, PRIMARY_QUERY_TIMEOUT};
use crate::config::Config;
use crate::error::{ApiError, ConfigError};
use crate::logging::LogSink;
use crate::model::{Entity, EntitySet};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Infrastructure hosts only; alert state is attached later by the
/// correlator.
pub const ENTITY_SEARCH_QUERY: &str = r#"{
  actor {
    entitySearch(query: "domain = 'INFRA' AND type = 'HOST'") {
      results {
        entities {
          guid
          name
          entityType
        }
      }
    }
  }
}"#;

#[derive(Debug, Default, Deserialize)]
struct EntitySearchResponse {
    #[serde(default)]
    data: Option<SearchData>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchData {
    #[serde(default)]
    actor: Option<SearchActor>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchActor {
    #[serde(default, rename = "entitySearch")]
    entity_search: Option<EntitySearch>,
}

#[derive(Debug, Default, Deserialize)]
struct EntitySearch {
    #[serde(default)]
    results: Option<SearchResults>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResults {
    #[serde(default)]
    entities: Option<Vec<EntityOutline>>,
}

#[derive(Debug, Default, Deserialize)]
struct EntityOutline {
    #[serde(default)]
    guid: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "entityType")]
    entity_type: Option<String>,
}

/// Fetches the host list. Never fails: every failure mode degrades to the
/// synthetic dataset with a human-readable error attached.
pub async fn fetch_entities(api: &dyn MonitoringApi, config: &Config, log: &dyn LogSink) -> EntitySet {
    fetch_entities_within(api, config, log, PRIMARY_QUERY_TIMEOUT).await
}

pub async fn fetch_entities_within(
    api: &dyn MonitoringApi,
    config: &Config,
    log: &dyn LogSink,
    limit: Duration,
) -> EntitySet {
    if !config.has_credentials() {
        log.log("fetch skipped: credentials missing");
        return EntitySet::synthetic(ConfigError::MissingCredentials.to_string());
    }

    log.log("Fetching entities from New Relic");
    let value = match bounded(limit, api.graphql(ENTITY_SEARCH_QUERY)).await {
        Ok(value) => value,
        Err(err @ ApiError::Decode(_)) => {
            log.log(&format!("JSON parse failed: {err}"));
            return EntitySet::synthetic(format!("Error parsing response: {err}"));
        }
        Err(err) => {
            log.log(&format!("Fetch failed: {err}"));
            return EntitySet::synthetic(format!("Error fetching from New Relic: {err}"));
        }
    };

    match parse_entity_search(value) {
        Ok(entities) => {
            log.log(&format!("Found {} entities", entities.len()));
            EntitySet::new(entities)
        }
        Err(message) => {
            log.log(&message);
            EntitySet::synthetic(message)
        }
    }
}

/// Pulls `data.actor.entitySearch.results.entities` out of the envelope.
/// A missing path is an empty result, not an error; nameless entities are
/// dropped.
pub fn parse_entity_search(value: Value) -> Result<Vec<Entity>, String> {
    let response: EntitySearchResponse =
        serde_json::from_value(value).map_err(|err| format!("Error parsing response: {err}"))?;
    if let Some(message) = first_graphql_error(response.errors.as_deref().unwrap_or_default()) {
        return Err(format!("New Relic API error: {message}"));
    }
    let outlines = response
        .data
        .and_then(|data| data.actor)
        .and_then(|actor| actor.entity_search)
        .and_then(|search| search.results)
        .and_then(|results| results.entities)
        .unwrap_or_default();
    Ok(outlines
        .into_iter()
        .filter_map(|outline| {
            let name = outline.name.filter(|name| !name.is_empty())?;
            Some(Entity::new(
                name,
                outline.guid.unwrap_or_default(),
                outline.entity_type.unwrap_or_default(),
            ))
        })
        .collect())
}
