pub mod bridge;
pub mod config;
pub mod kernel;
pub mod panel;
pub mod services;
pub mod trigger;

// Re-export the pieces a host embedding needs to wire the loop together
pub use config::WatchConfig;
pub use kernel::reactor::Reactor;
pub use trigger::TriggerSource;
