// battwatch-api: Async client for the Domoticz JSON/HTTP API

pub mod client;
pub mod error;
pub mod models;
pub mod request;
pub mod transport;

pub use client::DomoClient;
pub use error::Error;
pub use models::{ApiEnvelope, DeviceEntry, PlanEntry, PlanMember};
pub use request::{ApiRequest, MoveWay};
pub use transport::TransportConfig;
