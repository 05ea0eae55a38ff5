pub mod client;
pub mod envelope;

pub use client::{InkSoftClient, InkSoftConfig, InkSoftConnector};
pub use envelope::Envelope;
