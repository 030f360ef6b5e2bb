//! Wire-level types
//!
//! - [`frame`]: chat frames, note events and heartbeats
//! - [`rpc`]: connection-opening requests, responses and status codes
//! - [`constants`]: reference intervals, capacities and the phrase pool

pub mod constants;
pub mod frame;
pub mod rpc;

pub use frame::{
    ClientFrame, EventFrame, HealthCheck, MetricsFrame, MetricsSummary, Note, NoteEvent, ServerFrame,
};
pub use rpc::{Method, Request, Response, Status, StatusCode};
