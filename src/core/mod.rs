pub mod clock;
pub mod config;
pub mod lifecycle;
pub mod llm;
pub mod notify;
pub mod scheduler;
pub mod store;
pub mod terminal;
pub mod workflow;
