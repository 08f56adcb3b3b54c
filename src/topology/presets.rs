//! Canonical preset topologies.
//!
//! Each builder issues plain `add_element` / `connect` calls against a fresh
//! graph. Span losses follow 0.2 dB/km fibre, e.g. an 80 km span is 16 dB.
//!
//! Presets are built under [`ConnectPolicy::Overwrite`]: the mesh preset feeds
//! its alternate path from the same transponder line ports as the primary
//! path. Callers apply their own policy to the returned graph afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::graph::{ConnectPolicy, Topology, TopologyError};

/// Preset topology templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Transponder -> amplifier -> transponder
    PointToPoint,
    /// Two transponders joined by three amplifier stages
    LongHaul,
    /// Primary path through one cross-connect, alternate path through another.
    ///
    /// The alternate path re-patches the transponder line ports, so the first
    /// and last primary-path link records stay in the link list as stale
    /// audit entries whose ports now point elsewhere.
    Mesh,
    /// Four transponders in a cycle, one amplifier per span
    Ring,
    /// Point-to-point plus unwired regional cross-connects and transponders
    Complex,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::PointToPoint,
        Preset::LongHaul,
        Preset::Mesh,
        Preset::Ring,
        Preset::Complex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::PointToPoint => "point-to-point",
            Preset::LongHaul => "long-haul",
            Preset::Mesh => "mesh",
            Preset::Ring => "ring",
            Preset::Complex => "complex",
        }
    }

    /// Build a fresh topology for this preset
    pub fn build(&self) -> Result<Topology, TopologyError> {
        let topo = Topology::with_policy(ConnectPolicy::Overwrite);
        match self {
            Preset::PointToPoint => point_to_point(&topo)?,
            Preset::LongHaul => long_haul(&topo)?,
            Preset::Mesh => mesh(&topo)?,
            Preset::Ring => ring(&topo)?,
            Preset::Complex => complex(&topo)?,
        }
        log::info!(
            "Built {} topology: {} elements, {} links",
            self,
            topo.count(),
            topo.link_count()
        );
        Ok(topo)
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<&str> = Preset::ALL.iter().map(|p| p.as_str()).collect();
                format!("unknown preset '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// 80 km spans at 0.2 dB/km
const LONG_SPAN_DB: f64 = 16.0;
const MESH_PRIMARY_HOP_DB: f64 = 8.0;
const MESH_ALTERNATE_HOP_DB: f64 = 12.0;
const RING_SPAN_DB: f64 = 10.0;

// [OTN-TXP-NYC-001] --16dB-- [EDFA-REPEAT-001] --16dB-- [OTN-TXP-BOS-001]
fn point_to_point(topo: &Topology) -> Result<(), TopologyError> {
    topo.add_element("OTN-TXP-NYC-001", "TRANSPONDER", "New York DataCenter")?;
    topo.add_element("EDFA-REPEAT-001", "AMPLIFIER", "Repeater Station")?;
    topo.add_element("OTN-TXP-BOS-001", "TRANSPONDER", "Boston DataCenter")?;

    topo.connect("OTN-TXP-NYC-001", "optical-tx", "EDFA-REPEAT-001", "input-1", LONG_SPAN_DB)?;
    topo.connect("EDFA-REPEAT-001", "output-1", "OTN-TXP-BOS-001", "optical-rx", LONG_SPAN_DB)?;
    Ok(())
}

fn long_haul(topo: &Topology) -> Result<(), TopologyError> {
    topo.add_element("OTN-TXP-NYC-001", "TRANSPONDER", "New York DataCenter")?;
    topo.add_element("OTN-TXP-BOS-001", "TRANSPONDER", "Boston DataCenter")?;
    topo.add_element("EDFA-NYC-001", "AMPLIFIER", "New York Span 1")?;
    topo.add_element("EDFA-PHILLY-001", "AMPLIFIER", "Philadelphia Span 2")?;
    topo.add_element("EDFA-BOS-001", "AMPLIFIER", "Boston Span 3")?;

    topo.connect("OTN-TXP-NYC-001", "optical-tx", "EDFA-NYC-001", "input-1", LONG_SPAN_DB)?;
    topo.connect("EDFA-NYC-001", "output-1", "EDFA-PHILLY-001", "input-1", LONG_SPAN_DB)?;
    topo.connect("EDFA-PHILLY-001", "output-1", "EDFA-BOS-001", "input-1", LONG_SPAN_DB)?;
    topo.connect("EDFA-BOS-001", "output-1", "OTN-TXP-BOS-001", "optical-rx", LONG_SPAN_DB)?;
    Ok(())
}

fn mesh(topo: &Topology) -> Result<(), TopologyError> {
    topo.add_element("OTN-TXP-NYC-001", "TRANSPONDER", "New York")?;
    topo.add_element("OTN-TXP-BOS-001", "TRANSPONDER", "Boston")?;
    topo.add_element("OXC-PHILLY-001", "CROSS-CONNECT", "Philadelphia")?;
    topo.add_element("OXC-DC-001", "CROSS-CONNECT", "DC")?;
    topo.add_element("EDFA-NYC-001", "AMPLIFIER", "NYC")?;
    topo.add_element("EDFA-BOS-001", "AMPLIFIER", "BOS")?;

    // Primary: NYC -> EDFA -> OXC-PHILLY -> EDFA -> BOS
    topo.connect("OTN-TXP-NYC-001", "optical-tx", "EDFA-NYC-001", "input-1", MESH_PRIMARY_HOP_DB)?;
    topo.connect("EDFA-NYC-001", "output-1", "OXC-PHILLY-001", "wavelength-1", MESH_PRIMARY_HOP_DB)?;
    topo.connect("OXC-PHILLY-001", "wavelength-2", "EDFA-BOS-001", "input-1", MESH_PRIMARY_HOP_DB)?;
    topo.connect("EDFA-BOS-001", "output-1", "OTN-TXP-BOS-001", "optical-rx", MESH_PRIMARY_HOP_DB)?;

    // Alternate: NYC -> OXC-DC -> BOS
    topo.connect("OTN-TXP-NYC-001", "optical-tx", "OXC-DC-001", "wavelength-1", MESH_ALTERNATE_HOP_DB)?;
    topo.connect("OXC-DC-001", "wavelength-2", "OTN-TXP-BOS-001", "optical-rx", MESH_ALTERNATE_HOP_DB)?;
    Ok(())
}

fn ring(topo: &Topology) -> Result<(), TopologyError> {
    let sites = [
        ("OTN-TXP-NYC-001", "New York"),
        ("OTN-TXP-PHILLY-001", "Philadelphia"),
        ("OTN-TXP-DC-001", "Washington DC"),
        ("OTN-TXP-BOS-001", "Boston"),
    ];
    let spans = [
        ("EDFA-SPAN-1", "NYC-PHILLY"),
        ("EDFA-SPAN-2", "PHILLY-DC"),
        ("EDFA-SPAN-3", "DC-BOS"),
        ("EDFA-SPAN-4", "BOS-NYC"),
    ];

    for (id, location) in sites {
        topo.add_element(id, "TRANSPONDER", location)?;
    }
    for (id, location) in spans {
        topo.add_element(id, "AMPLIFIER", location)?;
    }

    // Clockwise; the last span closes the ring back into NYC
    for (i, (amplifier, _)) in spans.iter().enumerate() {
        let (from, _) = sites[i];
        let (to, _) = sites[(i + 1) % sites.len()];
        topo.connect(from, "optical-tx", amplifier, "input-1", RING_SPAN_DB)?;
        topo.connect(amplifier, "output-1", to, "optical-rx", RING_SPAN_DB)?;
    }
    Ok(())
}

fn complex(topo: &Topology) -> Result<(), TopologyError> {
    point_to_point(topo)?;

    topo.add_element("OXC-NYC-001", "CROSS-CONNECT", "New York")?;
    topo.add_element("OXC-BOS-001", "CROSS-CONNECT", "Boston")?;
    topo.add_element("OTN-TXP-NYC-002", "TRANSPONDER", "New York")?;
    topo.add_element("OTN-TXP-NYC-003", "TRANSPONDER", "New York")?;
    Ok(())
}
