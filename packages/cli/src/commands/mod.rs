pub mod address;
pub mod replay;

pub use address::{address, AddressArgs};
pub use replay::{replay, ReplayArgs};
