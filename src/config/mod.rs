mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    BridgeConfig, ConfigMetadata, HandlerKind, HandlerSettings, InvocationSettings,
    LoggingSettings,
};
