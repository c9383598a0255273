pub mod config;
pub mod gateway;
pub mod jobs;
pub mod lifecycle;
pub mod reconcile;
pub mod status;
pub mod store;
pub mod sync;
pub mod terminal;
