//! Topology comparison: triple-level differences between two snapshots and
//! device-level changes.

pub mod canonical;

pub use canonical::{CanonicalTriple, canonicalize};

use crate::error::Result;
use crate::ontology::vocab::local_name;
use crate::ontology::{TopologyGraph, load_graph};
use crate::sparql::{DeviceRow, queries};
use crate::validate::{file_name, rule};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Number of removed / added triples listed before eliding the rest.
pub const DIFF_DISPLAY_LIMIT: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyDiff {
    pub in_both: BTreeSet<CanonicalTriple>,
    pub only_in_first: BTreeSet<CanonicalTriple>,
    pub only_in_second: BTreeSet<CanonicalTriple>,
}

impl TopologyDiff {
    pub fn between(first: &TopologyGraph, second: &TopologyGraph) -> Result<Self> {
        let first = canonicalize(&first.triples()?);
        let second = canonicalize(&second.triples()?);
        Ok(Self {
            in_both: first.intersection(&second).cloned().collect(),
            only_in_first: first.difference(&second).cloned().collect(),
            only_in_second: second.difference(&first).cloned().collect(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.only_in_first.is_empty() && self.only_in_second.is_empty()
    }

    /// Printable comparison of this diff, naming the two files.
    pub fn report<'a>(&'a self, first: &'a Path, second: &'a Path) -> DiffReport<'a> {
        DiffReport {
            diff: self,
            first,
            second,
        }
    }
}

pub struct DiffReport<'a> {
    diff: &'a TopologyDiff,
    first: &'a Path,
    second: &'a Path,
}

impl fmt::Display for DiffReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first_name = file_name(self.first);
        let second_name = file_name(self.second);
        let diff = self.diff;

        writeln!(f, "{}", rule('='))?;
        writeln!(f, "Topology Comparison")?;
        writeln!(f, "{}", rule('='))?;
        writeln!(f, "\nFile 1: {first_name}")?;
        writeln!(f, "File 2: {second_name}")?;

        writeln!(f, "\n📊 Statistics:")?;
        writeln!(f, "  Common triples:     {}", diff.in_both.len())?;
        writeln!(f, "  Only in {first_name:20}: {}", diff.only_in_first.len())?;
        writeln!(f, "  Only in {second_name:20}: {}", diff.only_in_second.len())?;

        if !diff.only_in_first.is_empty() {
            writeln!(f, "\n➖ Removed in {second_name}:")?;
            write_triples(f, &diff.only_in_first, '-')?;
        }
        if !diff.only_in_second.is_empty() {
            writeln!(f, "\n➕ Added in {second_name}:")?;
            write_triples(f, &diff.only_in_second, '+')?;
        }

        writeln!(f, "\n{}", rule('='))
    }
}

fn write_triples(
    f: &mut fmt::Formatter<'_>,
    triples: &BTreeSet<CanonicalTriple>,
    marker: char,
) -> fmt::Result {
    for triple in triples.iter().take(DIFF_DISPLAY_LIMIT) {
        writeln!(f, "  {marker} {}", triple.display())?;
    }
    if triples.len() > DIFF_DISPLAY_LIMIT {
        writeln!(f, "  ... and {} more", triples.len() - DIFF_DISPLAY_LIMIT)?;
    }
    Ok(())
}

/// Compare two topology files triple by triple. Blank node labels are
/// ignored.
pub fn compare_topologies(first: &Path, second: &Path) -> Result<TopologyDiff> {
    let diff = TopologyDiff::between(&load_graph(first)?, &load_graph(second)?)?;
    tracing::debug!(
        common = diff.in_both.len(),
        removed = diff.only_in_first.len(),
        added = diff.only_in_second.len(),
        "compared topologies"
    );
    Ok(diff)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceChange {
    pub device: String,
    #[serde(rename = "type")]
    pub device_type: String,
}

impl From<&DeviceRow> for DeviceChange {
    fn from(row: &DeviceRow) -> Self {
        Self {
            device: local_name(&row.device).to_string(),
            device_type: local_name(&row.device_type).to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceChanges {
    pub added: Vec<DeviceChange>,
    pub removed: Vec<DeviceChange>,
    pub common: Vec<DeviceChange>,
}

impl fmt::Display for DeviceChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", rule('='))?;
        writeln!(f, "Device Changes")?;
        writeln!(f, "{}", rule('='))?;

        if !self.added.is_empty() {
            writeln!(f, "\n➕ Added Devices:")?;
            for change in &self.added {
                writeln!(f, "  + {} ({})", change.device, change.device_type)?;
            }
        }
        if !self.removed.is_empty() {
            writeln!(f, "\n➖ Removed Devices:")?;
            for change in &self.removed {
                writeln!(f, "  - {} ({})", change.device, change.device_type)?;
            }
        }
        if !self.common.is_empty() {
            writeln!(f, "\n✓ Unchanged Devices: {}", self.common.len())?;
        }

        writeln!(f, "\n{}", rule('='))
    }
}

fn devices_of(path: &Path, ontology: Option<&TopologyGraph>) -> Result<BTreeSet<DeviceRow>> {
    let graph = load_graph(path)?;
    if let Some(ontology) = ontology {
        graph.merge(ontology)?;
    }
    Ok(queries::device_instances(&graph)?.into_iter().collect())
}

/// Device-level changes between two snapshots. The ontology, when given, is
/// merged into both snapshots so devices typed by sub-class are found.
pub fn device_changes(
    first: &Path,
    second: &Path,
    ontology: Option<&Path>,
) -> Result<DeviceChanges> {
    let ontology = match ontology {
        Some(path) if path.exists() => Some(load_graph(path)?),
        Some(path) => {
            tracing::debug!(path = %path.display(), "ontology not found, comparing snapshots alone");
            None
        }
        None => None,
    };

    let before = devices_of(first, ontology.as_ref())?;
    let after = devices_of(second, ontology.as_ref())?;

    Ok(DeviceChanges {
        added: after.difference(&before).map(DeviceChange::from).collect(),
        removed: before.difference(&after).map(DeviceChange::from).collect(),
        common: before.intersection(&after).map(DeviceChange::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const BEFORE: &str = r#"
        @prefix : <http://nkllon.com/sys#> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
        :Host rdfs:subClassOf :Device .
        :KVM rdfs:subClassOf :Device .
        :Mac a :Host ; :hasPort :Mac_USBC .
        :Kvm a :KVM .
        :Mac_USBC :physicalForm "USB-C" .
    "#;

    const AFTER: &str = r#"
        @prefix : <http://nkllon.com/sys#> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
        :Host rdfs:subClassOf :Device .
        :KVM rdfs:subClassOf :Device .
        :Mac a :Host ; :hasPort :Mac_USBC .
        :Ubuntu a :Host .
        :Mac_USBC :physicalForm "Thunderbolt" .
    "#;

    fn write(dir: &Path, name: &str, turtle: &str) -> anyhow::Result<std::path::PathBuf> {
        let path = dir.join(name);
        fs::write(&path, turtle)?;
        Ok(path)
    }

    #[test]
    fn triple_level_changes() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let first = write(dir.path(), "before.ttl", BEFORE)?;
        let second = write(dir.path(), "after.ttl", AFTER)?;

        let diff = compare_topologies(&first, &second)?;
        let removed: Vec<String> = diff.only_in_first.iter().map(|t| t.display()).collect();
        let added: Vec<String> = diff.only_in_second.iter().map(|t| t.display()).collect();
        assert!(removed.contains(&"Kvm → type → KVM".to_string()));
        assert!(removed.contains(&"Mac_USBC → physicalForm → USB-C".to_string()));
        assert!(added.contains(&"Ubuntu → type → Host".to_string()));
        assert!(added.contains(&"Mac_USBC → physicalForm → Thunderbolt".to_string()));
        assert_eq!(diff.in_both.len(), 4);

        let text = diff.report(&first, &second).to_string();
        assert!(text.contains("File 1: before.ttl"));
        assert!(text.contains("  Common triples:     4"));
        assert!(text.contains("➖ Removed in after.ttl:"));
        assert!(text.contains("  + Ubuntu → type → Host"));
        Ok(())
    }

    #[test]
    fn identical_files_have_no_changes() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let first = write(dir.path(), "a.ttl", BEFORE)?;
        let diff = compare_topologies(&first, &first)?;
        assert!(diff.is_empty());
        assert!(!diff.report(&first, &first).to_string().contains("Removed in"));
        Ok(())
    }

    #[test]
    fn long_listings_are_elided() -> anyhow::Result<()> {
        let mut big = String::from("@prefix : <http://nkllon.com/sys#> .\n");
        for i in 0..25 {
            big.push_str(&format!(":Port{i} :belongsToDevice :Kvm .\n"));
        }
        let first = TopologyGraph::from_turtle("", "empty.ttl")?;
        let second = TopologyGraph::from_turtle(&big, "big.ttl")?;
        let diff = TopologyDiff::between(&first, &second)?;
        let text = diff
            .report(Path::new("empty.ttl"), Path::new("big.ttl"))
            .to_string();
        assert_eq!(text.matches("\n  + ").count(), DIFF_DISPLAY_LIMIT);
        assert!(text.contains("  ... and 5 more"));
        Ok(())
    }

    #[test]
    fn device_level_changes() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let first = write(dir.path(), "before.ttl", BEFORE)?;
        let second = write(dir.path(), "after.ttl", AFTER)?;

        let changes = device_changes(&first, &second, None)?;
        assert_eq!(
            changes.added,
            vec![DeviceChange { device: "Ubuntu".into(), device_type: "Host".into() }]
        );
        assert_eq!(
            changes.removed,
            vec![DeviceChange { device: "Kvm".into(), device_type: "KVM".into() }]
        );
        assert_eq!(changes.common.len(), 1);

        let text = changes.to_string();
        assert!(text.contains("  + Ubuntu (Host)"));
        assert!(text.contains("  - Kvm (KVM)"));
        assert!(text.contains("✓ Unchanged Devices: 1"));
        Ok(())
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let err = compare_topologies(Path::new("/nope/a.ttl"), Path::new("/nope/b.ttl"))
            .err()
            .expect("missing");
        assert_eq!(err.code(), crate::error::ErrorCode::FileNotFound);
    }
}
