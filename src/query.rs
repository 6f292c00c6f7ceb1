//! The `query` command: four fixed SPARQL queries over the ontology merged
//! with a deployment snapshot.

use crate::error::Result;
use crate::ontology::{TopologyGraph, load_merged};
use crate::ontology::vocab::local_name;
use crate::sparql::queries;
use crate::sparql::{AudioConnection, BidirectionalCable, DeviceRow, UptimeCriticalPort};
use crate::validate::rule;
use indexmap::IndexMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct TopologyQueries {
    pub bidirectional_cables: Vec<BidirectionalCable>,
    pub audio_connections: Vec<AudioConnection>,
    pub uptime_critical_hosts: Vec<UptimeCriticalPort>,
    pub devices: Vec<DeviceRow>,
}

impl TopologyQueries {
    pub fn run(graph: &TopologyGraph) -> Result<Self> {
        Ok(Self {
            bidirectional_cables: queries::bidirectional_cables(graph)?,
            audio_connections: queries::audio_connections(graph)?,
            uptime_critical_hosts: queries::uptime_critical_hosts(graph)?,
            devices: queries::all_devices(graph)?,
        })
    }

    /// Devices grouped by type, types and devices in query order.
    pub fn devices_by_type(&self) -> IndexMap<&str, Vec<&str>> {
        let mut grouped: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for row in &self.devices {
            grouped
                .entry(local_name(&row.device_type))
                .or_default()
                .push(local_name(&row.device));
        }
        grouped
    }
}

impl fmt::Display for TopologyQueries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", rule('='))?;
        writeln!(f, "NKLLON Hardware Topology - SPARQL Queries")?;
        writeln!(f, "{}", rule('='))?;

        writeln!(f, "\n📊 Query 1: Bidirectional Cables")?;
        writeln!(f, "{}", rule('-'))?;
        if self.bidirectional_cables.is_empty() {
            writeln!(f, "  No bidirectional cables found")?;
        }
        for row in &self.bidirectional_cables {
            writeln!(
                f,
                "  {}: {} ({}) → {} ({})",
                local_name(&row.cable),
                local_name(&row.src_device),
                row.src_form,
                local_name(&row.dst_device),
                row.dst_form
            )?;
        }

        writeln!(f, "\n🎵 Query 2: Audio Interface Connections")?;
        writeln!(f, "{}", rule('-'))?;
        if self.audio_connections.is_empty() {
            writeln!(f, "  No audio connections found")?;
        }
        for row in &self.audio_connections {
            writeln!(
                f,
                "  {} → {} → {}",
                local_name(&row.audio_device),
                local_name(&row.cable),
                local_name(&row.connected_device)
            )?;
        }

        writeln!(f, "\n⚡ Query 3: Uptime-Critical Hosts")?;
        writeln!(f, "{}", rule('-'))?;
        if self.uptime_critical_hosts.is_empty() {
            writeln!(f, "  No uptime-critical hosts found")?;
        }
        for row in &self.uptime_critical_hosts {
            writeln!(
                f,
                "  {} → {} (Priority: {})",
                local_name(&row.host),
                local_name(&row.kvm_port),
                row.priority
            )?;
        }

        writeln!(f, "\n🖥️  Query 4: All Devices")?;
        writeln!(f, "{}", rule('-'))?;
        if self.devices.is_empty() {
            writeln!(f, "  No devices found")?;
        }
        for (device_type, devices) in self.devices_by_type() {
            writeln!(f, "\n  {device_type}:")?;
            for device in devices {
                writeln!(f, "    - {device}")?;
            }
        }

        writeln!(f, "\n{}", rule('='))
    }
}

/// Load ontology and deployment into one graph and run every query.
pub fn query_topology(ontology_path: &Path, deployment_path: &Path) -> Result<TopologyQueries> {
    let graph = load_merged(&[ontology_path, deployment_path])?;
    TopologyQueries::run(&graph)
}
