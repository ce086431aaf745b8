//! Josser Protocol — JSON-RPC 1.0/2.0 message types, response validation
//! and the error taxonomy shared by every Josser crate.
//!
//! This crate contains no I/O or async code. Transports live in
//! `josser-client` and hand raw bytes to [`Protocol::decode_response`].

mod error;
mod jsonrpc;
mod protocol;

pub use error::*;
pub use jsonrpc::*;
pub use protocol::*;
