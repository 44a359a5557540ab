pub mod invocation;
pub mod schedule_entry;

pub use invocation::{TaskInvocation, TaskResult};
pub use schedule_entry::ScheduleEntry;
