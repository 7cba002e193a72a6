pub mod protocol;
pub mod server;
pub mod state_machine;

pub use server::Server;
pub use state_machine::{BrokerStateMachine, Command};
