pub mod dashboard;
pub mod dom;
#[cfg(feature = "gui")]
pub mod gui;
pub mod logging;
pub mod net;
pub mod settings;
pub mod storage;
pub mod tasks;
pub mod toast_log;

pub use dashboard::{Dashboard, DashboardError, WidgetKind, WidgetRegistry};
