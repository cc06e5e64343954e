//! Distributed-monitoring poller agent.
//!
//! A poller accepts probe definitions (ICMP ping, traceroute, SNMP, HTTP
//! GET, SSH command) over an HTTP control plane and executes them once or
//! on a recurrence schedule. Results accumulate per task and are readable
//! back through the same API. Optionally the poller registers itself with
//! a central controller and heartbeats so the controller can hand it work.

pub mod api;
pub mod config;
pub mod controller;
pub mod core;
pub mod probes;
pub mod queue;
pub mod scheduler;

pub use api::{build_router, create_api_state, start_server, ApiConfig, ApiState};
pub use config::{Config, ConfigError};
pub use controller::{Announcement, ControllerClient};
pub use crate::core::task::{Task, TaskError};
pub use crate::core::types::TaskId;
pub use probes::{Dispatcher, ProbeRunner, ProbeSpec};
pub use queue::TaskQueue;
pub use scheduler::{Archive, Poller, SchedulerHandle, SchedulerState};
