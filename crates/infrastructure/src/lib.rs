pub mod heartbeat;
pub mod memory;
pub mod rabbitmq;
pub mod schedule_file;
pub mod sentinel;

pub use heartbeat::HeartbeatFile;
pub use memory::InMemoryBroker;
pub use rabbitmq::{mask_amqp_url, RabbitMqBroker};
pub use schedule_file::FileScheduleStore;
pub use sentinel::MaintenanceSentinel;
