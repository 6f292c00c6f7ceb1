//! Interactive D3 force-graph of the device topology.

use crate::error::Result;
use crate::ontology::vocab::local_name;
use crate::ontology::{TopologyGraph, load_merged};
use crate::sparql::queries;
use crate::templates;
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT: &str = "topology_visualization.html";

/// Legend entries and node colours by device type.
pub const DEVICE_COLORS: [(&str, &str); 5] = [
    ("Host", "#4CAF50"),
    ("KVM", "#2196F3"),
    ("AudioInterface", "#FF9800"),
    ("SmartDisplay", "#9C27B0"),
    ("PreAmp", "#F44336"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VizNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VizEdge {
    pub source: String,
    pub target: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualizationSummary {
    pub output: PathBuf,
    pub nodes: usize,
    pub edges: usize,
}

/// Device nodes and cable edges of `graph`. A device typed with several
/// sub-classes of `:Device` appears once; edges touching anything that is not
/// a device node are dropped.
pub fn extract_topology(graph: &TopologyGraph) -> Result<(Vec<VizNode>, Vec<VizEdge>)> {
    let mut nodes: IndexMap<String, VizNode> = IndexMap::new();
    for row in queries::device_instances(graph)? {
        let id = local_name(&row.device).to_string();
        nodes.entry(id.clone()).or_insert_with(|| VizNode {
            label: id.clone(),
            node_type: local_name(&row.device_type).to_string(),
            id,
        });
    }

    let mut edges = Vec::new();
    for row in queries::connections(graph)? {
        let source = local_name(&row.src).to_string();
        let target = local_name(&row.dst).to_string();
        if !nodes.contains_key(&source) || !nodes.contains_key(&target) {
            tracing::debug!(%source, %target, "skipping edge to non-device node");
            continue;
        }
        edges.push(VizEdge {
            source,
            target,
            label: local_name(&row.cable).to_string(),
        });
    }

    Ok((nodes.into_values().collect(), edges))
}

#[derive(Serialize)]
struct LegendEntry {
    label: &'static str,
    color: &'static str,
}

/// JSON safe to embed inside a `<script>` element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

pub fn render_html(nodes: &[VizNode], edges: &[VizEdge]) -> Result<String> {
    let colors: IndexMap<&str, &str> = DEVICE_COLORS.iter().copied().collect();
    let legend: Vec<LegendEntry> = DEVICE_COLORS
        .iter()
        .map(|&(label, color)| LegendEntry { label, color })
        .collect();

    let mut context = tera::Context::new();
    context.insert("title", "NKLLON Topology Visualization");
    context.insert("legend", &legend);
    context.insert("nodes_json", &script_json(nodes)?);
    context.insert("edges_json", &script_json(edges)?);
    context.insert("colors_json", &script_json(&colors)?);
    templates::render(templates::VISUALIZATION_HTML, &context)
}

/// Render the topology of ontology + deployment to an HTML file.
pub fn generate_visualization(
    ontology_path: &Path,
    data_path: &Path,
    output: &Path,
) -> Result<VisualizationSummary> {
    let graph = load_merged(&[ontology_path, data_path])?;
    let (nodes, edges) = extract_topology(&graph)?;
    let html = render_html(&nodes, &edges)?;
    fs::write(output, html)?;

    tracing::info!(
        output = %output.display(),
        nodes = nodes.len(),
        edges = edges.len(),
        "visualization written"
    );
    Ok(VisualizationSummary {
        output: output.to_path_buf(),
        nodes: nodes.len(),
        edges: edges.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPOLOGY: &str = r#"
        @prefix : <http://nkllon.com/sys#> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
        :Host rdfs:subClassOf :Device .
        :KVM rdfs:subClassOf :Device .
        :Mac a :Host ; :hasPort :Mac_USBC .
        :Kvm a :KVM .
        :Mac_USBC :belongsToDevice :Mac ; :connectsVia :Cable_USBC_DP .
        :Cable_USBC_DP :connectsTo :Kvm_DP1 .
        :Kvm_DP1 :belongsToDevice :Kvm .
        :Kvm_Out :belongsToDevice :Kvm ; :connectsVia :Cable_Loose .
        :Cable_Loose :connectsTo :Wall_Port .
        :Wall_Port :belongsToDevice :WallPlate .
    "#;

    #[test]
    fn extracts_device_nodes_and_edges() -> anyhow::Result<()> {
        let graph = TopologyGraph::from_turtle(TOPOLOGY, "viz.ttl")?;
        let (nodes, edges) = extract_topology(&graph)?;

        let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"Mac") && ids.contains(&"Kvm"));
        assert_eq!(
            edges,
            vec![VizEdge {
                source: "Mac".into(),
                target: "Kvm".into(),
                label: "Cable_USBC_DP".into(),
            }]
        );
        Ok(())
    }

    #[test]
    fn html_embeds_graph_data() -> anyhow::Result<()> {
        let nodes = vec![VizNode {
            id: "Mac".into(),
            node_type: "Host".into(),
            label: "</script>Mac".into(),
        }];
        let html = render_html(&nodes, &[])?;
        assert!(html.contains("d3.v7.min.js"));
        assert!(html.contains(r#""type":"Host""#));
        assert!(html.contains(r#"<\/script>Mac"#));
        assert!(html.contains(
            r##"const colors = {"Host":"#4CAF50","KVM":"#2196F3","AudioInterface":"#FF9800","SmartDisplay":"#9C27B0","PreAmp":"#F44336"};"##
        ));
        assert!(html.contains("<span>SmartDisplay</span>"));
        assert!(html.contains("const links = [];"));
        Ok(())
    }

    #[test]
    fn writes_output_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let data = dir.path().join("topology.ttl");
        let ontology = dir.path().join("ontology.ttl");
        fs::write(&data, TOPOLOGY)?;
        fs::write(&ontology, "")?;
        let output = dir.path().join("viz.html");

        let summary = generate_visualization(&ontology, &data, &output)?;
        assert_eq!(summary.nodes, 2);
        assert_eq!(summary.edges, 1);
        assert!(fs::read_to_string(&output)?.contains("Cable_USBC_DP"));
        Ok(())
    }
}
