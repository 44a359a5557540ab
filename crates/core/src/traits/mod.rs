pub mod broker;
pub mod schedule_store;
pub mod task_handler;

pub use broker::Broker;
pub use schedule_store::ScheduleStore;
pub use task_handler::{HandlerContext, TaskHandler};
