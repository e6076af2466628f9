use crate::model::{Entity, EntitySet};
use crate::render::{status_for, RenderSnapshot};
use crate::search::SearchCursor;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default)]
pub struct RefreshState {
    pub entities: EntitySet,
    pub last_refresh: Option<DateTime<Utc>>,
    pub in_progress: bool,
    pub last_error: Option<String>,
    /// Bumped when a cycle starts.
    pub generation: u64,
    /// Cycle whose fetch produced `entities`. Lags `generation` while a
    /// newer fetch is still in flight.
    pub published_generation: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    /// `None` exactly when the published set is empty.
    pub selected: Option<usize>,
    pub search: SearchCursor,
}

#[derive(Debug, Default)]
struct Inner {
    refresh: RefreshState,
    selection: SelectionState,
}

/// One lock, held only for copies and assignments, never across a network
/// call or a render batch.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<Inner>>,
}

impl SharedState {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Single-flight guard. Returns the new cycle's generation, or `None`
    /// when a refresh is already in progress.
    pub fn begin_refresh(&self) -> Option<u64> {
        let mut inner = self.lock();
        if inner.refresh.in_progress {
            return None;
        }
        inner.refresh.in_progress = true;
        inner.refresh.generation += 1;
        Some(inner.refresh.generation)
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().refresh.in_progress
    }

    pub fn generation(&self) -> u64 {
        self.lock().refresh.generation
    }

    /// Swaps in the raw fetch result and ends the in-progress span.
    pub fn publish_fetch(&self, generation: u64, set: EntitySet, at: DateTime<Utc>) {
        let mut inner = self.lock();
        if inner.refresh.generation != generation {
            return;
        }
        let len = set.len();
        inner.refresh.last_error = set.error.clone();
        inner.refresh.entities = set;
        inner.refresh.last_refresh = Some(at);
        inner.refresh.in_progress = false;
        inner.refresh.published_generation = generation;
        inner.selection.selected = clamp_selection(inner.selection.selected, len);
    }

    /// Replaces entities with their correlated copies, but only if the
    /// cycle that produced them is still the published one.
    pub fn publish_correlated(&self, generation: u64, entities: Vec<Entity>) -> bool {
        let mut inner = self.lock();
        if inner.refresh.published_generation != generation
            || inner.refresh.entities.len() != entities.len()
        {
            return false;
        }
        inner.refresh.entities.entities = entities;
        true
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.lock().refresh.clone()
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        let inner = self.lock();
        RenderSnapshot {
            entities: inner.refresh.entities.entities.clone(),
            selected: inner.selection.selected,
            status: status_for(&inner.refresh),
        }
    }

    pub fn entity_count(&self) -> usize {
        self.lock().refresh.entities.len()
    }

    pub fn selected(&self) -> Option<usize> {
        self.lock().selection.selected
    }

    pub fn selected_entity(&self) -> Option<Entity> {
        let inner = self.lock();
        let index = inner.selection.selected?;
        inner.refresh.entities.entities.get(index).cloned()
    }

    /// Records an operator selection, clamped into the current set.
    pub fn select(&self, index: usize) -> Option<usize> {
        let mut inner = self.lock();
        let len = inner.refresh.entities.len();
        inner.selection.selected = if len == 0 {
            None
        } else {
            Some(index.min(len - 1))
        };
        inner.selection.selected
    }

    pub fn move_selection(&self, delta: isize) -> Option<usize> {
        let current = self.selected().unwrap_or(0);
        self.select(current.saturating_add_signed(delta))
    }

    pub fn search_query(&self) -> String {
        self.lock().selection.search.query().to_string()
    }

    pub fn set_search_query(&self, query: &str) {
        self.lock().selection.search.set_query(query);
    }

    /// Advances the search cursor and moves the selection onto the hit.
    pub fn search_next(&self) -> Option<usize> {
        let mut inner = self.lock();
        let Inner { refresh, selection } = &mut *inner;
        let found = selection.search.next(&refresh.entities.entities)?;
        selection.selected = Some(found);
        Some(found)
    }
}

/// Keeps a stored index if it still fits, otherwise falls back to the top.
pub fn clamp_selection(selected: Option<usize>, len: usize) -> Option<usize> {
    match selected {
        _ if len == 0 => None,
        Some(index) if index < len => Some(index),
        _ => Some(0),
    }
}
