//! Scanner transport and telegram decoding.

mod client;
mod framer;
mod protocol;

pub use client::TimClient;
pub use framer::{TelegramFramer, ETX, STX};
pub use protocol::decode_scan;
