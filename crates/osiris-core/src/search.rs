use crate::model::Entity;

/// Case-insensitive substring search over entity names, starting just
/// after `from` and wrapping once. `None` for `from` starts at index 0.
/// An empty query means "no search" and never matches.
pub fn find_next(entities: &[Entity], query: &str, from: Option<usize>) -> Option<usize> {
    let needle = query.to_lowercase();
    if needle.is_empty() || entities.is_empty() {
        return None;
    }
    let total = entities.len();
    let start = from.map_or(0, |index| index + 1) % total;
    (0..total)
        .map(|offset| (start + offset) % total)
        .find(|&index| entities[index].name.to_lowercase().contains(&needle))
}

/// Query plus the position of the last hit, so repeated searches cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCursor {
    query: String,
    last_match: Option<usize>,
}

impl SearchCursor {
    /// Entering a query always restarts the scan from the top.
    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.last_match = None;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn last_match(&self) -> Option<usize> {
        self.last_match
    }

    pub fn next(&mut self, entities: &[Entity]) -> Option<usize> {
        let found = find_next(entities, &self.query, self.last_match)?;
        self.last_match = Some(found);
        Some(found)
    }
}
