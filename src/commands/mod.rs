pub mod chat;
pub mod indicator;
