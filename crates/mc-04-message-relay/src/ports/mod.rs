//! Ports for the Message Relay subsystem.

pub mod inbound;

pub use inbound::MessageRelayApi;
