pub mod config;
pub mod delivery;
pub mod message;
pub mod observability;
pub mod queue;
pub mod worker;
