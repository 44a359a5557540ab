pub mod config;
pub mod errors;
pub mod exit_codes;
pub mod models;
pub mod traits;

pub use config::{
    AppConfig, BeatConfig, BrokerConfig, BrokerType, LogConfig, StorageConfig, StoresConfig,
    WatchdogConfig, WorkerConfig,
};
pub use errors::{DawisError, DawisResult};
pub use models::{ScheduleEntry, TaskInvocation, TaskResult};
pub use traits::{Broker, HandlerContext, ScheduleStore, TaskHandler};
