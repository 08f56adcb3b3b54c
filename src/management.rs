//! Management query surface.
//!
//! These are the calls an external management front end makes into the
//! simulator, bypassing the protocol session. Every response is a plain
//! serde view type with `camelCase` field names, ready to be written out as
//! JSON by whatever transport carries it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::topology::{ElementNode, LinkState, Port, PortMedium, Topology, TopologyError};

/// Whole-topology summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyView {
    pub element_count: usize,
    pub link_count: usize,
    pub elements: Vec<ElementSummary>,
    pub links: Vec<LinkView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSummary {
    pub id: String,
    pub device_type: String,
    pub location: String,
    pub port_count: usize,
    pub connected_port_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkView {
    /// `element:port`
    pub from: String,
    /// `element:port`
    pub to: String,
    pub degradation_db: f64,
}

/// One element with all of its ports
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDetail {
    pub id: String,
    pub device_type: String,
    pub location: String,
    pub last_activity: DateTime<Utc>,
    pub ports: Vec<PortView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortView {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub medium: PortMedium,
    pub link_state: LinkState,
    pub remote_element_id: Option<String>,
    pub remote_port_id: Option<String>,
    pub tx_power: f64,
    pub rx_power: f64,
    pub wavelength: Option<String>,
}

impl From<&Port> for PortView {
    fn from(port: &Port) -> Self {
        Self {
            id: port.id().to_string(),
            name: port.name().to_string(),
            medium: port.medium(),
            link_state: port.link_state(),
            remote_element_id: port.remote().map(|r| r.element_id.clone()),
            remote_port_id: port.remote().map(|r| r.port_id.clone()),
            tx_power: port.tx_power_dbm(),
            rx_power: port.rx_power_dbm(),
            wavelength: port.wavelength().map(str::to_string),
        }
    }
}

impl From<&ElementNode> for ElementDetail {
    fn from(node: &ElementNode) -> Self {
        Self {
            id: node.id().to_string(),
            device_type: node.device_type().to_string(),
            location: node.location().to_string(),
            last_activity: node.last_activity(),
            ports: node.ports().map(PortView::from).collect(),
        }
    }
}

/// Request to patch two ports together
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    pub from_element_id: String,
    pub from_port_id: String,
    pub to_element_id: String,
    pub to_port_id: String,
    #[serde(default)]
    pub degradation_db: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectRequest {
    pub element_id: String,
    pub port_id: String,
}

/// Outcome of a connect or disconnect request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub element_count: usize,
    pub link_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Management operations over a shared topology
#[derive(Debug, Clone)]
pub struct ManagementApi {
    topology: Arc<Topology>,
}

impl ManagementApi {
    pub fn new(topology: Arc<Topology>) -> Self {
        Self { topology }
    }

    /// Full topology snapshot
    pub fn topology(&self) -> TopologyView {
        let snapshot = self.topology.snapshot();

        TopologyView {
            element_count: snapshot.elements.len(),
            link_count: snapshot.links.len(),
            elements: snapshot
                .elements
                .iter()
                .map(|node| ElementSummary {
                    id: node.id().to_string(),
                    device_type: node.device_type().to_string(),
                    location: node.location().to_string(),
                    port_count: node.port_count(),
                    connected_port_count: node.connected_port_count(),
                })
                .collect(),
            links: snapshot
                .links
                .iter()
                .map(|link| LinkView {
                    from: link.from_endpoint(),
                    to: link.to_endpoint(),
                    degradation_db: link.degradation_db,
                })
                .collect(),
        }
    }

    /// One element; an unknown id is an error rather than an empty view
    pub fn element(&self, element_id: &str) -> Result<ElementDetail, TopologyError> {
        self.topology
            .get_element(element_id)
            .map(|node| ElementDetail::from(&node))
            .ok_or_else(|| TopologyError::ElementNotFound(element_id.to_string()))
    }

    pub fn connect(&self, request: &ConnectRequest) -> OperationResult {
        match self.topology.connect(
            &request.from_element_id,
            &request.from_port_id,
            &request.to_element_id,
            &request.to_port_id,
            request.degradation_db,
        ) {
            Ok(link) => {
                log::info!("Management connect: {}", link);
                OperationResult {
                    success: true,
                    message: "Connection established".to_string(),
                }
            }
            Err(e) => {
                log::warn!("Management connect refused: {}", e);
                OperationResult {
                    success: false,
                    message: format!("Connection failed: {}", e),
                }
            }
        }
    }

    pub fn disconnect(&self, request: &DisconnectRequest) -> OperationResult {
        match self.topology.disconnect(&request.element_id, &request.port_id) {
            Ok(()) => {
                log::info!("Management disconnect: {}:{}", request.element_id, request.port_id);
                OperationResult {
                    success: true,
                    message: "Port disconnected".to_string(),
                }
            }
            Err(e) => {
                log::warn!("Management disconnect refused: {}", e);
                OperationResult {
                    success: false,
                    message: format!("Disconnection failed: {}", e),
                }
            }
        }
    }

    pub fn health(&self) -> HealthReport {
        let snapshot = self.topology.snapshot();
        HealthReport {
            status: "UP".to_string(),
            element_count: snapshot.elements.len(),
            link_count: snapshot.links.len(),
            timestamp: Utc::now(),
        }
    }
}
