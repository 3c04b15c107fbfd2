//! External service integrations

pub mod storage;

pub use storage::MediaStorage;
