//! Network topology module.
//!
//! This module contains the in-memory model of the simulated optical
//! network: ports, elements, the shared topology graph and the preset
//! topologies used to seed it.

pub mod types;
pub mod port;
pub mod element;
pub mod graph;
pub mod presets;

// Re-export key types for easier access
pub use element::{ElementNode, LinkPlan};
pub use graph::{ConnectPolicy, GraphSnapshot, Link, Topology, TopologyError};
pub use port::{Port, RemoteEndpoint, NO_SIGNAL_DBM, RETURN_PATH_LOSS_DB};
pub use presets::Preset;
pub use types::{DeviceType, LinkState, PortMedium};
