pub mod config;
pub mod context;
pub mod dispatcher;
pub mod session;
pub mod topics;
pub mod transform;
pub mod types;

pub use config::{BrokerConfig, ConfigError, DashboardConfig, IconConfig, SetpointConfig};
pub use context::DashboardContext;
pub use dispatcher::{
    Dispatch, Dispatcher, FieldBinding, FieldState, FieldUpdate, SetpointChange, BINDINGS,
};
pub use session::Session;
pub use topics::*;
pub use transform::{PayloadError, Transform, Transformed};
pub use types::{
    AdjustDirection, BrokerCommand, ConnectionSnapshot, ConnectionState, DashboardView, FieldId,
    FieldValue, Qos,
};
