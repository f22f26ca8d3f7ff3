pub mod chat_core;
pub mod config;
mod frontend;

pub use config::Config;
pub use frontend::start_server;
