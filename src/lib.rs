pub mod chaser;
pub mod collaborators;
pub mod constants;
pub mod countdown;
pub mod engine;
pub mod error;
pub mod participants;
pub mod server_protocol;
pub mod server_utils;
pub mod session;
pub mod spawner;
pub mod types;
