pub mod config;
pub mod dialect;
pub mod error;
pub mod flow;
pub mod framer;
pub mod fsm;
mod logging;
pub mod message;
pub mod plan;
pub mod session;
pub mod transport;
pub mod verify;

pub use logging::init as init_logging;
pub use tracing;
