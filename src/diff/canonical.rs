//! Blank-node canonicalization for graph comparison.
//!
//! Each blank node starts from the same hash. Every round rehashes a node
//! from the sorted signatures of the triples it occurs in, where other blank
//! nodes contribute their current hash. Rounds stop once the number of
//! distinct hashes stops growing.
//!
//! Nodes still sharing a hash are split by individualization: each member of
//! the first tied class (in hash order) is marked in turn, refinement and
//! splitting recurse, and the labelling whose rendered triple set is smallest
//! wins. The result depends only on graph structure, so isomorphic graphs
//! receive identical labels whatever order their triples were parsed in.

use oxigraph::model::{NamedOrBlankNode, Term, Triple};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

type Hash = [u8; 32];

/// A triple in N-Triples syntax with canonical blank node labels.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalTriple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl CanonicalTriple {
    /// `s → p → o` with IRIs shortened to their local names and literals
    /// shown by lexical form.
    pub fn display(&self) -> String {
        format!(
            "{} → {} → {}",
            display_node(&self.subject),
            display_node(&self.predicate),
            display_node(&self.object)
        )
    }
}

impl fmt::Display for CanonicalTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

fn display_node(node: &str) -> String {
    if let Some(iri) = node.strip_prefix('<').and_then(|n| n.strip_suffix('>')) {
        return crate::ontology::vocab::local_name(iri).to_string();
    }
    if let Some(rest) = node.strip_prefix('"')
        && let Some(end) = rest.rfind('"')
    {
        return rest[..end].replace("\\\"", "\"");
    }
    node.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Ground(String),
    Blank(usize),
}

/// Canonicalize `triples` into a set keyed by canonical N-Triples terms.
pub fn canonicalize(triples: &[Triple]) -> BTreeSet<CanonicalTriple> {
    let mut blank_ids: HashMap<String, usize> = HashMap::new();
    let mut encoded: Vec<[Slot; 3]> = Vec::with_capacity(triples.len());
    for triple in triples {
        let subject = match &triple.subject {
            NamedOrBlankNode::BlankNode(node) => blank_slot(node.as_str(), &mut blank_ids),
            other => Slot::Ground(other.to_string()),
        };
        let object = match &triple.object {
            Term::BlankNode(node) => blank_slot(node.as_str(), &mut blank_ids),
            other => Slot::Ground(other.to_string()),
        };
        encoded.push([subject, Slot::Ground(triple.predicate.to_string()), object]);
    }

    let labels = label_blank_nodes(&encoded, blank_ids.len());
    render(&encoded, &labels)
}

fn render(encoded: &[[Slot; 3]], labels: &[String]) -> BTreeSet<CanonicalTriple> {
    let text = |slot: &Slot| match slot {
        Slot::Ground(text) => text.clone(),
        Slot::Blank(index) => labels[*index].clone(),
    };

    encoded
        .iter()
        .map(|[s, p, o]| CanonicalTriple {
            subject: text(s),
            predicate: text(p),
            object: text(o),
        })
        .collect()
}

fn blank_slot(id: &str, ids: &mut HashMap<String, usize>) -> Slot {
    let next = ids.len();
    Slot::Blank(*ids.entry(id.to_string()).or_insert(next))
}

fn label_blank_nodes(encoded: &[[Slot; 3]], count: usize) -> Vec<String> {
    if count == 0 {
        return Vec::new();
    }

    let mut occurrences: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (index, triple) in encoded.iter().enumerate() {
        for slot in triple {
            if let Slot::Blank(node) = slot
                && occurrences[*node].last() != Some(&index)
            {
                occurrences[*node].push(index);
            }
        }
    }

    let initial: Vec<Hash> = vec![Sha256::digest(b"blank").into(); count];
    let (_, labels) = individualize(encoded, &occurrences, initial);
    labels
}

fn labels_of(hashes: &[Hash]) -> Vec<String> {
    hashes
        .iter()
        .map(|hash| format!("_:c14n{}", hex(&hash[..8])))
        .collect()
}

/// Refine `hashes`, then split the first tied class by trying every member.
/// Returns the smallest rendering with its labels.
fn individualize(
    encoded: &[[Slot; 3]],
    occurrences: &[Vec<usize>],
    hashes: Vec<Hash>,
) -> (BTreeSet<CanonicalTriple>, Vec<String>) {
    let hashes = refine(encoded, occurrences, hashes);

    let mut classes: BTreeMap<Hash, Vec<usize>> = BTreeMap::new();
    for (node, hash) in hashes.iter().enumerate() {
        classes.entry(*hash).or_default().push(node);
    }
    let Some(tied) = classes.values().find(|members| members.len() > 1) else {
        let labels = labels_of(&hashes);
        return (render(encoded, &labels), labels);
    };

    let mut best: Option<(BTreeSet<CanonicalTriple>, Vec<String>)> = None;
    for &chosen in tied {
        let mut marked = hashes.clone();
        let mut hasher = Sha256::new();
        hasher.update(marked[chosen]);
        hasher.update(b"individuated");
        marked[chosen] = hasher.finalize().into();

        let candidate = individualize(encoded, occurrences, marked);
        if best.as_ref().is_none_or(|(rendered, _)| candidate.0 < *rendered) {
            best = Some(candidate);
        }
    }
    best.unwrap_or_else(|| {
        let labels = labels_of(&hashes);
        (render(encoded, &labels), labels)
    })
}

fn refine(encoded: &[[Slot; 3]], occurrences: &[Vec<usize>], mut hashes: Vec<Hash>) -> Vec<Hash> {
    let mut distinct = distinct_count(&hashes);

    for _ in 0..=hashes.len() {
        let next: Vec<Hash> = (0..hashes.len())
            .map(|node| {
                let mut signatures: Vec<String> = occurrences[node]
                    .iter()
                    .map(|&index| signature(&encoded[index], node, &hashes))
                    .collect();
                signatures.sort();

                let mut hasher = Sha256::new();
                hasher.update(hashes[node]);
                for signature in &signatures {
                    hasher.update(signature.as_bytes());
                    hasher.update(b"\n");
                }
                hasher.finalize().into()
            })
            .collect();

        let next_distinct = distinct_count(&next);
        hashes = next;
        if next_distinct <= distinct {
            break;
        }
        distinct = next_distinct;
    }
    hashes
}

fn signature(triple: &[Slot; 3], node: usize, hashes: &[Hash]) -> String {
    triple
        .iter()
        .map(|slot| match slot {
            Slot::Ground(text) => text.clone(),
            Slot::Blank(other) if *other == node => "@self".to_string(),
            Slot::Blank(other) => hex(&hashes[*other]),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn distinct_count(hashes: &[Hash]) -> usize {
    hashes.iter().collect::<BTreeSet<_>>().len()
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::TopologyGraph;

    fn canonical(turtle: &str) -> anyhow::Result<BTreeSet<CanonicalTriple>> {
        let graph = TopologyGraph::from_turtle(turtle, "c14n.ttl")?;
        Ok(canonicalize(&graph.triples()?))
    }

    #[test]
    fn blank_node_labels_do_not_matter() -> anyhow::Result<()> {
        let left = canonical(
            r#"@prefix : <http://nkllon.com/sys#> .
            :Kvm :hasPort _:a , _:b .
            _:a :portPriority "High-Priority" .
            _:b :portPriority "Standard" ."#,
        )?;
        let right = canonical(
            r#"@prefix : <http://nkllon.com/sys#> .
            :Kvm :hasPort _:x , _:y .
            _:y :portPriority "High-Priority" .
            _:x :portPriority "Standard" ."#,
        )?;
        assert_eq!(left, right);
        assert_eq!(left.len(), 4);
        Ok(())
    }

    #[test]
    fn symmetric_blank_nodes_stay_distinct() -> anyhow::Result<()> {
        let triples = canonical(
            r#"@prefix : <http://nkllon.com/sys#> .
            :Kvm :hasPort [ :physicalForm "HDMI" ] , [ :physicalForm "HDMI" ] ."#,
        )?;
        assert_eq!(triples.len(), 4);
        Ok(())
    }

    /// Frucht graph: 3-regular on 12 vertices, so refinement alone never
    /// splits its nodes.
    fn frucht_edges() -> Vec<(usize, usize)> {
        const LCF: [i64; 12] = [-5, -2, -4, 2, 5, -2, 2, 5, -2, -5, 4, 2];
        let mut edges = BTreeSet::new();
        for (i, jump) in LCF.iter().enumerate() {
            let next = (i + 1) % 12;
            let chord = (i as i64 + jump).rem_euclid(12) as usize;
            for other in [next, chord] {
                edges.insert((i.min(other), i.max(other)));
            }
        }
        edges.into_iter().collect()
    }

    fn link_turtle(edges: &[(usize, usize)], relabel: impl Fn(usize) -> usize) -> String {
        let mut turtle = String::from("@prefix : <http://nkllon.com/sys#> .\n");
        for &(a, b) in edges {
            let (a, b) = (relabel(a), relabel(b));
            turtle.push_str(&format!("_:n{a} :link _:n{b} .\n_:n{b} :link _:n{a} .\n"));
        }
        turtle
    }

    #[test]
    fn regular_graph_is_order_independent() -> anyhow::Result<()> {
        let edges = frucht_edges();
        assert_eq!(edges.len(), 18);

        let forward = canonical(&link_turtle(&edges, |n| n))?;
        let reversed: Vec<_> = edges.iter().rev().copied().collect();
        let shuffled = canonical(&link_turtle(&reversed, |n| (n * 5) % 12))?;

        assert_eq!(forward.len(), 36);
        assert_eq!(forward, shuffled);
        Ok(())
    }

    #[test]
    fn different_structure_differs() -> anyhow::Result<()> {
        let left = canonical(
            r#"@prefix : <http://nkllon.com/sys#> .
            :Mac :hasPort [ :connectsVia [ :connectsTo :Kvm_In1 ] ] ."#,
        )?;
        let right = canonical(
            r#"@prefix : <http://nkllon.com/sys#> .
            :Mac :hasPort [ :connectsVia [ :connectsTo :Kvm_In2 ] ] ."#,
        )?;
        assert_ne!(left, right);
        Ok(())
    }

    #[test]
    fn display_uses_local_names() {
        let triple = CanonicalTriple {
            subject: "<http://nkllon.com/sys#Mac_USBC>".to_string(),
            predicate: "<http://nkllon.com/sys#physicalForm>".to_string(),
            object: "\"USB-C\"".to_string(),
        };
        assert_eq!(triple.display(), "Mac_USBC → physicalForm → USB-C");
    }
}
