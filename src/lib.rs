// externally visible interfaces
pub mod cleanup;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod mqtt;
pub mod poll;
pub mod registry;
