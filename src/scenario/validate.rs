//! Authoring checks for scenario graphs.
//!
//! [`ScenarioGraph::validate`] reports defects that would stall a
//! playthrough. [`ScenarioGraph::lint`] reports shapes that are legal but
//! worth a second look from whoever wrote the story.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::scenario::graph::ScenarioGraph;
use crate::scenario::node::NodeType;

/// A defect that makes a graph unplayable in places.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphIssue {
    #[error("entry node '{0}' is not in the graph")]
    MissingEntry(String),

    #[error("more than one node has id '{0}'")]
    DuplicateNode(String),

    #[error("node stored under '{key}' has id '{id}'")]
    KeyMismatch { key: String, id: String },

    #[error("node '{from}' continues to unknown node '{to}'")]
    DanglingNext { from: String, to: String },

    #[error("option '{option}' on node '{from}' leads to unknown node '{to}'")]
    DanglingOption {
        from: String,
        option: String,
        to: String,
    },

    #[error("node '{node}' has more than one option with id '{option}'")]
    DuplicateOption { node: String, option: String },

    #[error("decision node '{0}' has no options")]
    EmptyDecision(String),
}

#[derive(Debug, thiserror::Error)]
#[error("scenario graph has {} defect(s): {}", .issues.len(), summarize(.issues))]
pub struct ValidationError {
    pub issues: Vec<GraphIssue>,
}

fn summarize(issues: &[GraphIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Legal but suspicious graph shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphWarning {
    /// No path from the entry node reaches this node.
    Unreachable(String),
    /// Following successors from the first node eventually returns to it.
    Cycle(Vec<String>),
}

impl std::fmt::Display for GraphWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphWarning::Unreachable(id) => write!(f, "node '{id}' is unreachable from the entry node"),
            GraphWarning::Cycle(path) => write!(f, "cycle: {}", path.join(" -> ")),
        }
    }
}

impl ScenarioGraph {
    /// Check referential integrity. Every defect found is returned, not just
    /// the first one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if !self.nodes.contains_key(&self.entry_node_id) {
            issues.push(GraphIssue::MissingEntry(self.entry_node_id.clone()));
        }

        let mut duplicates = self.duplicates.clone();
        duplicates.sort();
        issues.extend(duplicates.into_iter().map(GraphIssue::DuplicateNode));

        let mut keys: Vec<&String> = self.nodes.keys().collect();
        keys.sort();

        for key in keys {
            let node = &self.nodes[key];
            if node.id != *key {
                issues.push(GraphIssue::KeyMismatch {
                    key: key.clone(),
                    id: node.id.clone(),
                });
            }

            match &node.node_type {
                NodeType::Linear(next) => {
                    if !self.nodes.contains_key(next) {
                        issues.push(GraphIssue::DanglingNext {
                            from: key.clone(),
                            to: next.clone(),
                        });
                    }
                }
                NodeType::Decision(options) => {
                    if options.is_empty() {
                        issues.push(GraphIssue::EmptyDecision(key.clone()));
                    }
                    let mut seen = HashSet::new();
                    for option in options {
                        if !seen.insert(option.id.as_str()) {
                            issues.push(GraphIssue::DuplicateOption {
                                node: key.clone(),
                                option: option.id.clone(),
                            });
                        }
                        if !self.nodes.contains_key(&option.next_node_id) {
                            issues.push(GraphIssue::DanglingOption {
                                from: key.clone(),
                                option: option.id.clone(),
                                to: option.next_node_id.clone(),
                            });
                        }
                    }
                }
                NodeType::Terminal => {}
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Unreachable nodes first, then cycles. Cycles are allowed; they are
    /// reported so authors can confirm the loop is deliberate.
    pub fn lint(&self) -> Vec<GraphWarning> {
        let reachable = self.reachable_from_entry();
        let mut warnings: Vec<GraphWarning> = self
            .nodes()
            .into_iter()
            .filter(|n| !reachable.contains(n.id.as_str()))
            .map(|n| GraphWarning::Unreachable(n.id.clone()))
            .collect();

        warnings.extend(self.find_cycles().into_iter().map(GraphWarning::Cycle));
        warnings
    }

    fn reachable_from_entry(&self) -> HashSet<&str> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        if let Some(entry) = self.nodes.get_key_value(&self.entry_node_id) {
            queue.push_back(entry.0.as_str());
        }

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get(id) {
                queue.extend(node.successors().into_iter().filter(|n| self.nodes.contains_key(*n)));
            }
        }

        seen
    }

    fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut state: HashMap<&str, Visit> = HashMap::new();
        let mut stack = Vec::new();
        let mut cycles = Vec::new();

        for node in self.nodes() {
            if !state.contains_key(node.id.as_str()) {
                self.visit(node.id.as_str(), &mut state, &mut stack, &mut cycles);
            }
        }

        cycles
    }

    fn visit<'a>(
        &'a self,
        id: &'a str,
        state: &mut HashMap<&'a str, Visit>,
        stack: &mut Vec<&'a str>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };

        state.insert(id, Visit::OnStack);
        stack.push(id);

        for next in node.successors() {
            match state.get(next) {
                Some(Visit::OnStack) => {
                    if let Some(start) = stack.iter().position(|s| *s == next) {
                        let mut path: Vec<String> = stack[start..].iter().map(|s| s.to_string()).collect();
                        path.push(next.to_string());
                        cycles.push(path);
                    }
                }
                Some(Visit::Done) => {}
                None => self.visit(next, state, stack, cycles),
            }
        }

        stack.pop();
        state.insert(id, Visit::Done);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    OnStack,
    Done,
}
