pub mod catalog;
pub mod config;
pub mod engine;
pub mod envelope;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
