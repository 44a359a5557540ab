pub mod executors;
pub mod service;

pub use executors::{HandlerRegistry, NoopHandler};
pub use service::{WorkerPool, WorkerService, WorkerServiceBuilder};
