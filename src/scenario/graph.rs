use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::scenario::node::{NodeType, ScenarioNode};
use crate::scenario::validate::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// The full story: a map of node-id -> ScenarioNode.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawGraph")]
pub struct ScenarioGraph {
    pub(crate) entry_node_id: String,
    pub(crate) nodes: HashMap<String, ScenarioNode>,
    /// Ids that were supplied more than once; only the last one is kept.
    pub(crate) duplicates: Vec<String>,
}

impl ScenarioGraph {
    /// Build a graph keyed by each node's own id. No checks are made here;
    /// call [`ScenarioGraph::validate`] before handing it to a player.
    pub fn new(entry_node_id: impl Into<String>, nodes: Vec<ScenarioNode>) -> Self {
        Self::from_entries(
            entry_node_id.into(),
            nodes.into_iter().map(|node| (node.id.clone(), node)).collect(),
        )
    }

    fn from_entries(entry_node_id: String, entries: Vec<(String, ScenarioNode)>) -> Self {
        let mut map = HashMap::new();
        let mut duplicates = Vec::new();
        for (key, node) in entries {
            if map.insert(key.clone(), node).is_some() && !duplicates.contains(&key) {
                duplicates.push(key);
            }
        }

        Self {
            entry_node_id,
            nodes: map,
            duplicates,
        }
    }

    /// Parse the JSON authoring format and reject graphs with defects.
    pub fn from_json(text: &str) -> Result<Self, ScenarioError> {
        let graph: ScenarioGraph = serde_json::from_str(text)?;
        graph.validate()?;
        Ok(graph)
    }

    pub fn get(&self, id: &str) -> Option<&ScenarioNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn entry_node_id(&self) -> &str {
        &self.entry_node_id
    }

    pub fn entry_node(&self) -> Option<&ScenarioNode> {
        self.nodes.get(&self.entry_node_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes sorted by id, so reports come out in a stable order.
    pub fn nodes(&self) -> Vec<&ScenarioNode> {
        let mut nodes: Vec<&ScenarioNode> = self.nodes.values().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// Maximum number of decisions a player can make in one playthrough.
    /// A node already on the current path is not entered again, so authored
    /// loops do not make this diverge.
    pub fn longest_path(&self) -> usize {
        let mut on_path = HashSet::new();
        self.longest_from(&self.entry_node_id, &mut on_path)
    }

    fn longest_from<'a>(&'a self, node_id: &'a str, on_path: &mut HashSet<&'a str>) -> usize {
        let node = match self.nodes.get(node_id) {
            Some(n) => n,
            None => return 0,
        };
        if !on_path.insert(node_id) {
            return 0;
        }

        let own = usize::from(matches!(node.node_type, NodeType::Decision(_)));
        let max_child = node
            .successors()
            .into_iter()
            .map(|next| self.longest_from(next, on_path))
            .max()
            .unwrap_or(0);

        on_path.remove(node_id);
        own + max_child
    }
}

// ---------------------------------------------------------------------------
// Authoring format
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGraph {
    entry_node_id: String,
    #[serde(deserialize_with = "node_entries")]
    nodes: Vec<(String, ScenarioNode)>,
}

impl From<RawGraph> for ScenarioGraph {
    fn from(raw: RawGraph) -> Self {
        Self::from_entries(raw.entry_node_id, raw.nodes)
    }
}

/// Reads the `nodes` object as a list of entries so repeated keys survive
/// long enough to be reported by `validate`.
fn node_entries<'de, D>(deserializer: D) -> Result<Vec<(String, ScenarioNode)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, ScenarioNode)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of node id to node")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, ScenarioNode>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::node::{Media, MediaKind, ScenarioOption};
    use crate::scenario::validate::GraphIssue;

    fn node(id: &str, node_type: NodeType) -> ScenarioNode {
        ScenarioNode {
            id: id.into(),
            media: Media {
                kind: MediaKind::Video,
                source: format!("/videos/{id}.mp4"),
            },
            caption: None,
            node_type,
        }
    }

    fn choice(id: &str, next: &str) -> ScenarioOption {
        ScenarioOption {
            id: id.into(),
            text: id.into(),
            next_node_id: next.into(),
        }
    }

    #[test]
    fn test_lookup() {
        let graph = ScenarioGraph::new(
            "A",
            vec![node("A", NodeType::Linear("B".into())), node("B", NodeType::Terminal)],
        );
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.entry_node().unwrap().id, "A");
        assert!(graph.contains("B"));
        assert!(graph.get("C").is_none());
    }

    #[test]
    fn test_longest_path_counts_decisions() {
        let graph = ScenarioGraph::new(
            "A",
            vec![
                node("A", NodeType::Decision(vec![choice("x", "B"), choice("y", "END")])),
                node("B", NodeType::Linear("C".into())),
                node("C", NodeType::Decision(vec![choice("z", "END")])),
                node("END", NodeType::Terminal),
            ],
        );
        assert_eq!(graph.longest_path(), 2);
    }

    #[test]
    fn test_longest_path_survives_cycles() {
        let graph = ScenarioGraph::new(
            "A",
            vec![
                node("A", NodeType::Decision(vec![choice("again", "B"), choice("stop", "END")])),
                node("B", NodeType::Linear("A".into())),
                node("END", NodeType::Terminal),
            ],
        );
        assert_eq!(graph.longest_path(), 1);
    }

    #[test]
    fn test_from_json_validates() {
        let json = r#"{
            "entryNodeId": "A001",
            "nodes": {
                "A001": {"id": "A001", "mediaKind": "video", "mediaSource": "/v/1.mp4", "nextNodeId": "A404"}
            }
        }"#;
        match ScenarioGraph::from_json(json) {
            Err(ScenarioError::Invalid(err)) => assert_eq!(err.issues.len(), 1),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_sample_scenario_file() {
        let graph = ScenarioGraph::from_json(include_str!("../../scenarios/first-post.json")).unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.entry_node().unwrap().media.kind, MediaKind::Image);
        assert_eq!(graph.get("B002").unwrap().options().len(), 2);
        assert!(graph.get("B003").unwrap().is_terminal());
        assert!(graph.get("B004").unwrap().is_terminal());
        assert!(graph.lint().is_empty());
        assert_eq!(graph.longest_path(), 1);
    }

    #[test]
    fn test_from_json_keeps_repeated_keys_for_validation() {
        let json = r#"{
            "entryNodeId": "A001",
            "nodes": {
                "A001": {"id": "A001", "mediaKind": "video", "mediaSource": "/v/first.mp4"},
                "A001": {"id": "A001", "mediaKind": "video", "mediaSource": "/v/second.mp4"}
            }
        }"#;
        match ScenarioGraph::from_json(json) {
            Err(ScenarioError::Invalid(err)) => {
                assert_eq!(err.issues, vec![GraphIssue::DuplicateNode("A001".into())])
            }
            other => panic!("expected duplicate node error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(matches!(
            ScenarioGraph::from_json("{ not json"),
            Err(ScenarioError::Json(_))
        ));
    }
}
