use crate::model::Entity;
use crate::state::{clamp_selection, RefreshState};
use crate::ui::{ListSurface, RowView, StatusLine, UiSubmitter};
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const RENDER_BATCH_SIZE: usize = 25;
pub const RENDER_BATCH_DELAY: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSnapshot {
    pub entities: Vec<Entity>,
    pub selected: Option<usize>,
    pub status: StatusLine,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub epoch: u64,
    pub rows: usize,
    pub batches: usize,
    pub superseded: bool,
}

/// In-progress wins over an error, which wins over the normal line.
pub fn status_for(refresh: &RefreshState) -> StatusLine {
    if refresh.in_progress {
        StatusLine::Fetching
    } else if let Some(message) = refresh.last_error.as_ref().filter(|msg| !msg.is_empty()) {
        StatusLine::Error(message.clone())
    } else if refresh.entities.is_empty() {
        StatusLine::Empty
    } else if let Some(at) = refresh.last_refresh {
        StatusLine::Updated { at }
    } else {
        StatusLine::Loading
    }
}

pub fn batch_ranges(total: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..total)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(total))
        .collect()
}

/// Paints snapshots in paced batches so the UI loop keeps servicing input.
/// A newer render turns queued batches of an older one into no-ops.
pub struct RenderScheduler<S> {
    submitter: UiSubmitter<S>,
    batch_size: usize,
    batch_delay: Duration,
    epoch: Arc<AtomicU64>,
}

impl<S> Clone for RenderScheduler<S> {
    fn clone(&self) -> Self {
        Self {
            submitter: self.submitter.clone(),
            batch_size: self.batch_size,
            batch_delay: self.batch_delay,
            epoch: Arc::clone(&self.epoch),
        }
    }
}

impl<S: ListSurface + 'static> RenderScheduler<S> {
    pub fn new(submitter: UiSubmitter<S>) -> Self {
        Self::with_pacing(submitter, RENDER_BATCH_SIZE, RENDER_BATCH_DELAY)
    }

    pub fn with_pacing(submitter: UiSubmitter<S>, batch_size: usize, batch_delay: Duration) -> Self {
        Self {
            submitter,
            batch_size: batch_size.max(1),
            batch_delay,
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn submitter(&self) -> &UiSubmitter<S> {
        &self.submitter
    }

    /// Updates only the status line, leaving rows alone.
    pub fn render_status(&self, status: StatusLine) -> bool {
        self.submitter.submit(move |surface| surface.set_status(status))
    }

    /// Clears the surface, then paints `snapshot` batch by batch. The
    /// stored selection is restored after the final batch.
    pub fn render(&self, snapshot: RenderSnapshot) -> JoinHandle<RenderSummary> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.epoch);
        let submitter = self.submitter.clone();
        let batch_size = self.batch_size;
        let batch_delay = self.batch_delay;

        tokio::spawn(async move {
            let RenderSnapshot {
                entities,
                selected,
                status,
            } = snapshot;
            let total = entities.len();
            let mut summary = RenderSummary {
                epoch,
                ..RenderSummary::default()
            };

            let guard = Arc::clone(&current);
            let submitted = submitter.submit(move |surface: &mut S| {
                if guard.load(Ordering::SeqCst) != epoch {
                    return;
                }
                surface.clear();
                surface.set_status(status);
                if total == 0 {
                    surface.set_selection(None);
                }
            });
            if !submitted || total == 0 {
                return summary;
            }

            let mut rows = entities
                .iter()
                .enumerate()
                .map(|(index, entity)| RowView::from_entity(index, entity));
            let ranges = batch_ranges(total, batch_size);
            let last = ranges.len() - 1;
            let restore = clamp_selection(selected, total);

            for (position, range) in ranges.into_iter().enumerate() {
                if current.load(Ordering::SeqCst) != epoch {
                    summary.superseded = true;
                    break;
                }
                let batch: Vec<RowView> = rows.by_ref().take(range.len()).collect();
                let is_last = position == last;
                let guard = Arc::clone(&current);
                let submitted = submitter.submit(move |surface: &mut S| {
                    if guard.load(Ordering::SeqCst) != epoch {
                        return;
                    }
                    for row in batch {
                        surface.append_row(row);
                    }
                    if is_last {
                        surface.set_selection(restore);
                    }
                });
                if !submitted {
                    break;
                }
                summary.batches += 1;
                summary.rows += range.len();
                if !is_last {
                    tokio::time::sleep(batch_delay).await;
                }
            }
            summary
        })
    }
}
