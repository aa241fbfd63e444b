use crate::scenario::graph::ScenarioGraph;
use crate::scenario::node::{Media, MediaKind, NodeType, ScenarioNode, ScenarioOption};

fn video(id: &str) -> Media {
    Media {
        kind: MediaKind::Video,
        source: format!("/videos/{id}.mp4"),
    }
}

fn image(id: &str) -> Media {
    Media {
        kind: MediaKind::Image,
        source: format!("/images/{id}.png"),
    }
}

fn option(id: &str, text: &str, next: &str) -> ScenarioOption {
    ScenarioOption {
        id: id.into(),
        text: text.into(),
        next_node_id: next.into(),
    }
}

// ---------------------------------------------------------------------------
// Group chat scenario
// ---------------------------------------------------------------------------

/// The built-in story: an edited photo of a classmate lands in the group
/// chat and the player decides how to respond.
pub fn cyberbullying_scenario() -> ScenarioGraph {
    let nodes = vec![
        ScenarioNode {
            id: "A001".into(),
            media: video("A001"),
            caption: Some("Your phone buzzes. The class group chat is blowing up.".into()),
            node_type: NodeType::Linear("A002".into()),
        },
        ScenarioNode {
            id: "A002".into(),
            media: video("A002"),
            caption: Some(
                "Someone posted an edited photo of Sam. Everyone is piling on. Jay DMs you: \"lol reply something\""
                    .into(),
            ),
            node_type: NodeType::Decision(vec![
                option("option_A", "He deserves it bro", "A004"),
                option("option_B", "Nah", "A005"),
            ]),
        },
        // --- Standing up ---
        ScenarioNode {
            id: "A005".into(),
            media: video("A005"),
            caption: Some("You post \"Nah, not cool.\" The chat goes quiet for a moment.".into()),
            node_type: NodeType::Linear("A003".into()),
        },
        ScenarioNode {
            id: "A003".into(),
            media: image("A003"),
            caption: Some("Sam messages you privately: \"thanks. it's been bad all week.\"".into()),
            node_type: NodeType::Decision(vec![
                option("option_A", "Tell a trusted adult", "A011"),
                option("option_B", "Report the post", "A012"),
            ]),
        },
        // --- Joining in ---
        ScenarioNode {
            id: "A004".into(),
            media: video("A004"),
            caption: Some("You send it. The photo gets shared to three more chats.".into()),
            node_type: NodeType::Linear("A006".into()),
        },
        ScenarioNode {
            id: "A006".into(),
            media: image("A006"),
            caption: Some("Sam hasn't been at school for two days.".into()),
            node_type: NodeType::Linear("A007".into()),
        },
        ScenarioNode {
            id: "A007".into(),
            media: video("A007"),
            caption: Some("Something doesn't feel right. What now?".into()),
            node_type: NodeType::Decision(vec![
                option("option_A", "Apologise to Sam", "A008"),
                option("option_B", "Keep scrolling", "A009"),
            ]),
        },
        ScenarioNode {
            id: "A008".into(),
            media: video("A008"),
            caption: Some("Sam reads your message: \"thanks. that actually means a lot.\"".into()),
            node_type: NodeType::Linear("A010".into()),
        },
        ScenarioNode {
            id: "A010".into(),
            media: image("A010"),
            caption: Some("Together you report the photo to the platform.".into()),
            node_type: NodeType::Linear("A012".into()),
        },
        // --- Endings ---
        ScenarioNode {
            id: "A009".into(),
            media: image("A009"),
            caption: Some("The jokes never stopped for Sam. Staying silent lets bullying grow.".into()),
            node_type: NodeType::Terminal,
        },
        ScenarioNode {
            id: "A011".into(),
            media: video("A011"),
            caption: Some("A teacher helps get the photo taken down. You stood up for Sam.".into()),
            node_type: NodeType::Terminal,
        },
        ScenarioNode {
            id: "A012".into(),
            media: video("A012"),
            caption: Some("The post is removed. Reporting works, and Sam knows someone cared.".into()),
            node_type: NodeType::Terminal,
        },
    ];

    ScenarioGraph::new("A001", nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_well_formed() {
        let graph = cyberbullying_scenario();
        assert!(graph.validate().is_ok());
        assert!(graph.lint().is_empty());
        assert_eq!(graph.entry_node_id(), "A001");
    }

    #[test]
    fn test_builtin_references_resolve() {
        let graph = cyberbullying_scenario();
        for node in graph.nodes() {
            if let Some(next) = node.next_node_id() {
                assert!(graph.contains(next), "{} -> {next}", node.id);
                assert!(node.options().is_empty());
            }
            for option in node.options() {
                assert!(graph.contains(&option.next_node_id), "{} -> {}", node.id, option.next_node_id);
            }
        }
    }

    #[test]
    fn test_first_decision() {
        let graph = cyberbullying_scenario();
        let a002 = graph.get("A002").unwrap();
        assert_eq!(a002.option("option_A").unwrap().text, "He deserves it bro");
        assert_eq!(a002.option("option_A").unwrap().next_node_id, "A004");
        assert_eq!(a002.option("option_B").unwrap().next_node_id, "A005");
        assert_eq!(graph.longest_path(), 2);
    }
}
