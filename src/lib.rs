pub mod config;
pub mod kernel;
pub mod services;
pub mod speech;

pub use config::Settings;
pub use kernel::reactor::Reactor;
