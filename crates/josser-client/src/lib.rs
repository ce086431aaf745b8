//! Josser Client — calls remote JSON-RPC methods over a pluggable transport.
//!
//! Every failure surfaces as a [`josser_protocol::Error`]: undecodable or
//! malformed replies as `InvalidResponse`, server-reported failures as
//! `RpcFault`, delivery problems as `Transport`.

pub mod client;
pub mod config;
pub mod transport;

pub use client::Client;
pub use josser_protocol as protocol;
