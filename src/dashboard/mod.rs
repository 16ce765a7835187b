pub mod config;
pub mod dashboard;
pub mod error;
pub mod layout;
pub mod widgets;

pub use config::{DashboardState, SavedWidget, STATE_KEY};
pub use dashboard::{Dashboard, DashboardStats};
pub use error::DashboardError;
pub use widgets::{
    CardOutcome, Widget, WidgetCard, WidgetContext, WidgetDescriptor, WidgetEvent, WidgetFactory,
    WidgetKind, WidgetRegistry,
};
