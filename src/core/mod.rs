pub mod coordinator;
pub mod scheduler;
pub mod store;
