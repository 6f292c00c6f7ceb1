// =============================================================================
// Topology Queries
// =============================================================================
// Fixed SPARQL queries over a merged ontology + deployment graph and the row
// types they map to. Row fields keep full IRIs (or `_:label` for blank
// nodes); renderers shorten them.

use super::result_mapper::{FromSparql, MappingError, ResultMapper};
use super::typed_binding::TypedBinding;
use crate::error::Result;
use crate::ontology::TopologyGraph;

pub const BIDIRECTIONAL_CABLES: &str = r#"
PREFIX : <http://nkllon.com/sys#>

SELECT ?cable ?srcDevice ?dstDevice ?srcForm ?dstForm WHERE {
    ?cable a :Cable ;
           :isBidirectional true .
    ?srcPort :connectsVia ?cable .
    ?cable :connectsTo ?dstPort .
    ?srcPort :belongsToDevice ?srcDevice ;
             :physicalForm ?srcForm .
    ?dstPort :belongsToDevice ?dstDevice ;
             :physicalForm ?dstForm .
}
ORDER BY ?cable
"#;

pub const AUDIO_CONNECTIONS: &str = r#"
PREFIX : <http://nkllon.com/sys#>

SELECT ?audioDevice ?cable ?connectedDevice WHERE {
    ?audioDevice a :AudioInterface ;
                 :hasPort ?port .
    ?port :connectsVia ?cable .
    ?cable :connectsTo ?otherPort .
    ?otherPort :belongsToDevice ?connectedDevice .
}
ORDER BY ?audioDevice ?cable
"#;

pub const UPTIME_CRITICAL_HOSTS: &str = r#"
PREFIX : <http://nkllon.com/sys#>

SELECT ?host ?kvmPort ?priority WHERE {
    ?host :isUptimeCritical true ;
          :hasPort ?hostPort .
    ?hostPort :connectsVia ?cable .
    ?cable :connectsTo ?kvmPort .
    ?kvmPort :portPriority ?priority .
}
ORDER BY ?host ?kvmPort
"#;

/// Every instance of a declared `owl:Class` other than `:Device` itself,
/// so ports and cables are listed next to the devices.
pub const ALL_DEVICES: &str = r#"
PREFIX : <http://nkllon.com/sys#>
PREFIX owl: <http://www.w3.org/2002/07/owl#>

SELECT DISTINCT ?device ?type WHERE {
    ?device a ?type .
    ?type a owl:Class .
    FILTER(?type != :Device)
}
ORDER BY ?type ?device
"#;

/// Instances of a proper sub-class of `:Device`.
pub const DEVICE_INSTANCES: &str = r#"
PREFIX : <http://nkllon.com/sys#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>

SELECT DISTINCT ?device ?type WHERE {
    ?device a ?type .
    ?type rdfs:subClassOf+ :Device .
}
ORDER BY ?type ?device
"#;

/// Device-to-device links through a port, a cable and a port.
pub const CONNECTIONS: &str = r#"
PREFIX : <http://nkllon.com/sys#>

SELECT ?src ?dst ?cable WHERE {
    ?srcPort :belongsToDevice ?src ;
             :connectsVia ?cable .
    ?cable :connectsTo ?dstPort .
    ?dstPort :belongsToDevice ?dst .
}
ORDER BY ?cable ?src ?dst
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidirectionalCable {
    pub cable: String,
    pub src_device: String,
    pub dst_device: String,
    pub src_form: String,
    pub dst_form: String,
}

impl FromSparql for BidirectionalCable {
    fn from_binding(binding: &TypedBinding<'_>) -> std::result::Result<Self, MappingError> {
        Ok(Self {
            cable: binding.get_node("cable")?,
            src_device: binding.get_node("srcDevice")?,
            dst_device: binding.get_node("dstDevice")?,
            src_form: binding.get_literal("srcForm")?,
            dst_form: binding.get_literal("dstForm")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioConnection {
    pub audio_device: String,
    pub cable: String,
    pub connected_device: String,
}

impl FromSparql for AudioConnection {
    fn from_binding(binding: &TypedBinding<'_>) -> std::result::Result<Self, MappingError> {
        Ok(Self {
            audio_device: binding.get_node("audioDevice")?,
            cable: binding.get_node("cable")?,
            connected_device: binding.get_node("connectedDevice")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UptimeCriticalPort {
    pub host: String,
    pub kvm_port: String,
    pub priority: String,
}

impl FromSparql for UptimeCriticalPort {
    fn from_binding(binding: &TypedBinding<'_>) -> std::result::Result<Self, MappingError> {
        Ok(Self {
            host: binding.get_node("host")?,
            kvm_port: binding.get_node("kvmPort")?,
            priority: binding.get_literal("priority")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceRow {
    pub device: String,
    pub device_type: String,
}

impl FromSparql for DeviceRow {
    fn from_binding(binding: &TypedBinding<'_>) -> std::result::Result<Self, MappingError> {
        Ok(Self {
            device: binding.get_node("device")?,
            device_type: binding.get_iri("type")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRow {
    pub src: String,
    pub dst: String,
    pub cable: String,
}

impl FromSparql for ConnectionRow {
    fn from_binding(binding: &TypedBinding<'_>) -> std::result::Result<Self, MappingError> {
        Ok(Self {
            src: binding.get_node("src")?,
            dst: binding.get_node("dst")?,
            cable: binding.get_node("cable")?,
        })
    }
}

/// Run `query` and map every row to `T`.
pub fn run<T: FromSparql>(graph: &TopologyGraph, query: &str, context: &str) -> Result<Vec<T>> {
    let solutions = graph.select(query, context)?;
    let rows = ResultMapper::map_many(&solutions)?;
    tracing::debug!(context, rows = solutions.len(), "query finished");
    Ok(rows)
}

pub fn bidirectional_cables(graph: &TopologyGraph) -> Result<Vec<BidirectionalCable>> {
    run(graph, BIDIRECTIONAL_CABLES, "bidirectional cables")
}

pub fn audio_connections(graph: &TopologyGraph) -> Result<Vec<AudioConnection>> {
    run(graph, AUDIO_CONNECTIONS, "audio interface connections")
}

pub fn uptime_critical_hosts(graph: &TopologyGraph) -> Result<Vec<UptimeCriticalPort>> {
    run(graph, UPTIME_CRITICAL_HOSTS, "uptime-critical hosts")
}

pub fn all_devices(graph: &TopologyGraph) -> Result<Vec<DeviceRow>> {
    run(graph, ALL_DEVICES, "all devices")
}

pub fn device_instances(graph: &TopologyGraph) -> Result<Vec<DeviceRow>> {
    run(graph, DEVICE_INSTANCES, "device instances")
}

pub fn connections(graph: &TopologyGraph) -> Result<Vec<ConnectionRow>> {
    run(graph, CONNECTIONS, "device connections")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::vocab::local_name;

    const ANONYMOUS_RUN: &str = r#"
        @prefix : <http://nkllon.com/sys#> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
        @prefix owl: <http://www.w3.org/2002/07/owl#> .

        :Device a owl:Class .
        :Port a owl:Class .
        :Host a owl:Class ; rdfs:subClassOf :Device .
        :AudioInterface a owl:Class ; rdfs:subClassOf :Device .

        :Mac a :Host .
        _:spare a :Host .
        :Mac_USBC a :Port ; :belongsToDevice :Mac ; :connectsVia _:patch .
        _:patch :connectsTo _:spareIn .
        _:spareIn a :Port ; :belongsToDevice _:spare .

        :Motu a :AudioInterface ; :hasPort _:motuOut .
        _:motuOut :connectsVia _:trs .
        _:trs :connectsTo :Mac_USBC .
    "#;

    fn graph() -> anyhow::Result<TopologyGraph> {
        Ok(TopologyGraph::from_turtle(ANONYMOUS_RUN, "anonymous.ttl")?)
    }

    #[test]
    fn blank_nodes_map_to_labels() -> anyhow::Result<()> {
        let graph = graph()?;

        let links = connections(&graph)?;
        assert_eq!(links.len(), 1);
        assert_eq!(local_name(&links[0].src), "Mac");
        assert!(links[0].cable.starts_with("_:"));
        assert!(links[0].dst.starts_with("_:"));

        let audio = audio_connections(&graph)?;
        assert_eq!(audio.len(), 1);
        assert!(audio[0].cable.starts_with("_:"));
        assert_eq!(local_name(&audio[0].connected_device), "Mac");
        Ok(())
    }

    #[test]
    fn all_devices_lists_every_declared_class() -> anyhow::Result<()> {
        let graph = graph()?;
        let types: Vec<String> = all_devices(&graph)?
            .iter()
            .map(|row| local_name(&row.device_type).to_string())
            .collect();
        assert_eq!(types.iter().filter(|t| *t == "Port").count(), 2);
        assert_eq!(types.iter().filter(|t| *t == "Host").count(), 2);
        assert!(types.contains(&"AudioInterface".to_string()));
        assert!(!types.contains(&"Device".to_string()));
        Ok(())
    }

    #[test]
    fn device_instances_skip_ports_and_cables() -> anyhow::Result<()> {
        let graph = graph()?;
        let rows = device_instances(&graph)?;
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| local_name(&row.device_type) != "Port"));
        assert!(rows.iter().any(|row| row.device.starts_with("_:")));
        Ok(())
    }
}
