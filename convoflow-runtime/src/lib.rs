//! # Convoflow Runtime
//!
//! The execution driver: turns one inbound message plus the stored session
//! into ordered outputs and an updated session, calling the configured
//! webhook, AI and action integrations along the way.

mod driver;
#[cfg(feature = "http")]
mod http;
mod nodes;
mod simulator;

pub use driver::{DelayPolicy, DriverConfig, FlowDriver};
#[cfg(feature = "http")]
pub use http::ReqwestWebhookAdapter;
pub use simulator::{Simulation, SimulationTurn};
