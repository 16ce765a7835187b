use crate::dashboard::widgets::WidgetKind;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("unknown widget type '{0}'")]
    UnknownWidgetType(String),
    #[error("invalid {kind} widget configuration: {reason}")]
    InvalidConfig { kind: WidgetKind, reason: String },
    #[error("a widget with id '{0}' already exists")]
    DuplicateWidgetId(String),
    #[error("dashboard has been destroyed")]
    Destroyed,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DashboardError {
    pub fn invalid_config(kind: WidgetKind, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            kind,
            reason: reason.into(),
        }
    }
}
