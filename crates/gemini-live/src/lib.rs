mod client;
pub mod config;
pub mod consts;
pub mod tools;
pub mod types;

pub use client::{Client, ClientError, DialogueEvent, ServerRx};
