pub mod cascade;
pub mod connection;
pub mod entities;
pub mod migrations;
pub mod test_utils;

pub use connection::*;
