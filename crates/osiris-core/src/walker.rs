use serde_json::{Map, Value};

/// Depth cap for the walk. Deeper subtrees are ignored.
pub const MAX_WALK_DEPTH: usize = 32;

const TITLE_KEYS: &[&str] = &["title", "conditionName", "policyName"];
const DESCRIPTION_KEYS: &[&str] = &["description", "details", "message"];
const DIRECT_ID_KEYS: &[&str] = &["entityGuid", "guid", "entityId", "targetGuid", "entityName"];
const ID_LIST_KEYS: &[&str] = &[
    "entityGuids",
    "entityNames",
    "entities",
    "targets",
    "impactedEntities",
];
const NESTED_ID_KEYS: &[&str] = &["guid", "entityGuid", "id", "name"];

/// A mapping that looked like an incident: a title or description plus at
/// least one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentCandidate {
    pub title: String,
    pub description: String,
    pub identifiers: Vec<String>,
}

impl IncidentCandidate {
    pub fn identifies(&self, id: &str) -> bool {
        !id.is_empty() && self.identifiers.iter().any(|candidate| candidate == id)
    }
}

/// Every incident-shaped mapping in `root`, in depth-first document order.
/// Later candidates win when several hit the same entity.
pub fn extract_candidates(root: &Value) -> Vec<IncidentCandidate> {
    let mut found = Vec::new();
    visit(root, 0, &mut found);
    found
}

fn visit(value: &Value, depth: usize, found: &mut Vec<IncidentCandidate>) {
    if depth > MAX_WALK_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            if let Some(candidate) = candidate_from(map) {
                found.push(candidate);
            }
            for child in map.values() {
                visit(child, depth + 1, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                visit(item, depth + 1, found);
            }
        }
        _ => {}
    }
}

fn candidate_from(map: &Map<String, Value>) -> Option<IncidentCandidate> {
    let title = first_text(map, TITLE_KEYS).unwrap_or_default();
    let description = first_text(map, DESCRIPTION_KEYS).unwrap_or_default();
    if title.is_empty() && description.is_empty() {
        return None;
    }

    let mut identifiers: Vec<String> = Vec::new();
    let mut push = |id: String| {
        if !identifiers.contains(&id) {
            identifiers.push(id);
        }
    };
    for key in DIRECT_ID_KEYS {
        if let Some(id) = map.get(*key).and_then(scalar_text) {
            push(id);
        }
    }
    for key in ID_LIST_KEYS {
        let Some(Value::Array(items)) = map.get(*key) else {
            continue;
        };
        for item in items {
            match item {
                Value::Object(nested) => {
                    for nested_key in NESTED_ID_KEYS {
                        if let Some(id) = nested.get(*nested_key).and_then(scalar_text) {
                            push(id);
                        }
                    }
                }
                other => {
                    if let Some(id) = scalar_text(other) {
                        push(id);
                    }
                }
            }
        }
    }

    if identifiers.is_empty() {
        return None;
    }
    Some(IncidentCandidate {
        title,
        description,
        identifiers,
    })
}

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find_map(|value| value.as_str().map(str::trim).filter(|text| !text.is_empty()))
        .map(str::to_string)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
