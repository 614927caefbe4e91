pub mod config;
pub mod controller;
pub mod stats;

pub use config::SessionConfig;
pub use controller::{SessionController, SessionDeps};
pub use stats::{SessionState, SessionStats};
