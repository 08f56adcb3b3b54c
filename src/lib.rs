//! # OptiSim - Optical network element simulator
//!
//! This library models a small optical transport network (transponders,
//! amplifiers, switches and cross-connects patched together by fibre links)
//! and exposes it to management clients over a NETCONF-style session.
//!
//! ## Overview
//!
//! The simulator holds one shared topology graph. Management clients connect
//! over TCP, exchange `<hello>` messages, and then issue `get`, `get-config`
//! and `edit-config` RPCs against individual network elements. A separate
//! management surface lists the topology and patches or unpatches ports.
//!
//! ## Key Features
//!
//! - **Port-level topology**: per-type port templates, bidirectional links,
//!   received power derived from span degradation
//! - **Presets**: point-to-point, long-haul, mesh, ring and complex networks
//! - **Protocol sessions**: `]]>]]>` framing, capability handshake,
//!   structured rpc-errors for anything malformed or unsupported
//! - **Concurrency**: every structural change is atomic with respect to
//!   concurrent readers and writers
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `config`: Type-safe configuration structures and YAML parsing
//! - `config_loader`: Configuration file loading and CLI overrides
//! - `topology`: Ports, elements, the topology graph and presets
//! - `management`: Query and patching surface for management front ends
//! - `netconf`: Framing, RPC decoding, dispatch, sessions and the TCP server
//! - `utils`: Identifier validation
//!
//! ## Example Usage
//!
//! ```rust
//! use optisim::topology::{Preset, NO_SIGNAL_DBM};
//!
//! let topology = Preset::PointToPoint.build()?;
//! assert_eq!(topology.count(), 3);
//! assert_eq!(topology.link_count(), 2);
//!
//! // -8 dBm launched into a 16 dB span
//! let amp = topology.get_element("EDFA-REPEAT-001").unwrap();
//! assert_eq!(amp.port("input-1").unwrap().rx_power_dbm(), -24.0);
//! assert_eq!(amp.port("input-2").unwrap().rx_power_dbm(), NO_SIGNAL_DBM);
//! # Ok::<(), optisim::topology::TopologyError>(())
//! ```
//!
//! ## Configuration Format
//!
//! Every section is optional; missing values take the defaults shown:
//!
//! ```yaml
//! general:
//!   log_level: info
//!
//! topology:
//!   preset: long-haul          # point-to-point/long-haul/mesh/ring/complex
//!   connect_policy: reject     # reject/overwrite
//!
//! netconf:
//!   listen: "0.0.0.0:8830"
//!   hello_timeout: 60s
//!   max_frame_bytes: 1048576
//! ```
//!
//! ## Error Handling
//!
//! Domain operations return typed errors (`TopologyError`, `RpcError`,
//! `SessionError`). The binaries and the configuration loader use
//! `color_eyre` for error reporting with context.

pub mod config;
pub mod config_loader;
pub mod management;
pub mod netconf;
pub mod topology;
pub mod utils;
