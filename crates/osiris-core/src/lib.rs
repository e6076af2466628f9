pub mod api;
pub mod config;
pub mod correlator;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod model;
pub mod refresh;
pub mod render;
pub mod search;
pub mod state;
pub mod ui;
pub mod walker;

pub use api::{HttpMonitoringApi, MonitoringApi};
pub use config::Config;
pub use correlator::{CorrelationReport, CorrelationStage, IncidentCorrelator, StageReport};
pub use error::{ApiError, ConfigError, StageError};
pub use fetcher::fetch_entities;
pub use logging::{LogSink, MemoryLogSink, NullLogSink, TracingLogSink};
pub use model::{Entity, EntitySet};
pub use refresh::{RefreshCoordinator, RefreshOutcome, RefreshTrigger};
pub use render::{RenderScheduler, RenderSnapshot};
pub use state::SharedState;
pub use ui::{ui_channel, ListSurface, RowView, StatusLine, UiQueue, UiSubmitter};
