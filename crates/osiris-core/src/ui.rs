use crate::model::Entity;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub index: usize,
    pub name: String,
    pub has_alert: bool,
}

impl RowView {
    pub fn from_entity(index: usize, entity: &Entity) -> Self {
        Self {
            index,
            name: entity.name.clone(),
            has_alert: entity.has_alert,
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.has_alert {
            "ALERT"
        } else {
            "OK"
        }
    }

    pub fn label(&self) -> String {
        format!("{:<15} {}", self.name, self.status_label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine {
    Loading,
    Fetching,
    Error(String),
    Empty,
    Updated { at: DateTime<Utc> },
}

impl StatusLine {
    /// Rendered at draw time so the "seconds ago" figure keeps moving.
    pub fn text(&self, now: DateTime<Utc>) -> String {
        match self {
            StatusLine::Loading => "Loading entities from New Relic...".to_string(),
            StatusLine::Fetching => "Fetching from New Relic...".to_string(),
            StatusLine::Error(message) => format!("Error: {message}"),
            StatusLine::Empty => "No entities found. Check API key and account ID.".to_string(),
            StatusLine::Updated { at } => {
                let secs = (now - *at).num_seconds().max(0);
                format!("Last updated: {secs} seconds ago")
            }
        }
    }
}

/// A list display owned by the UI thread.
pub trait ListSurface {
    fn clear(&mut self);
    fn append_row(&mut self, row: RowView);
    fn set_selection(&mut self, index: Option<usize>);
    fn set_status(&mut self, status: StatusLine);
}

pub type UiTask<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

/// Thread-safe handle for queueing work onto the UI loop.
pub struct UiSubmitter<S> {
    tx: mpsc::UnboundedSender<UiTask<S>>,
}

impl<S> Clone for UiSubmitter<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S> UiSubmitter<S> {
    /// Returns false once the UI loop has gone away.
    pub fn submit<F>(&self, task: F) -> bool
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.tx.send(Box::new(task)).is_ok()
    }
}

/// Receiving end, drained only by the UI owner.
pub struct UiQueue<S> {
    rx: mpsc::UnboundedReceiver<UiTask<S>>,
}

impl<S> UiQueue<S> {
    pub async fn recv(&mut self) -> Option<UiTask<S>> {
        self.rx.recv().await
    }

    /// Runs everything queued right now; returns how many tasks ran.
    pub fn drain(&mut self, surface: &mut S) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task(surface);
            ran += 1;
        }
        ran
    }
}

pub fn ui_channel<S>() -> (UiSubmitter<S>, UiQueue<S>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UiSubmitter { tx }, UiQueue { rx })
}
