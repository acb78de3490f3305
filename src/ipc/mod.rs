//! IPC module for controller-host UI communication

mod protocol;
mod server;

pub use protocol::{ControllerStatus, Push, Request, Response, MAX_MESSAGE_LEN};
pub use server::Server;
