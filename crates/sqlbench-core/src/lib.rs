pub mod cache;
pub mod config;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod model;
pub mod redaction;
pub mod report;
pub mod sql;
pub mod storage;
pub mod verify;
