use serde::Deserialize;

/// What kind of asset a node shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "VIDEO"),
            MediaKind::Image => write!(f, "IMAGE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub kind: MediaKind,
    /// Path or URL of the asset. Never opened by the player.
    pub source: String,
}

/// A choice offered on a decision node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOption {
    /// Unique within the parent node's options.
    pub id: String,
    /// Label shown to the user.
    pub text: String,
    /// Node this choice leads to.
    pub next_node_id: String,
}

/// How a node continues once its media is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeType {
    /// Auto-advance to the given node.
    Linear(String),
    /// Ask the user to pick one of these.
    Decision(Vec<ScenarioOption>),
    /// An ending.
    Terminal,
}

/// One narrative beat of the story.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct ScenarioNode {
    /// Unique identifier for this node (e.g. "A001").
    pub id: String,
    pub media: Media,
    /// Text shown alongside the media.
    pub caption: Option<String>,
    pub node_type: NodeType,
}

impl ScenarioNode {
    pub fn is_decision(&self) -> bool {
        matches!(self.node_type, NodeType::Decision(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.node_type, NodeType::Terminal)
    }

    /// Options in authoring order; empty unless this is a decision node.
    pub fn options(&self) -> &[ScenarioOption] {
        match &self.node_type {
            NodeType::Decision(options) => options,
            _ => &[],
        }
    }

    pub fn option(&self, option_id: &str) -> Option<&ScenarioOption> {
        self.options().iter().find(|o| o.id == option_id)
    }

    pub fn next_node_id(&self) -> Option<&str> {
        match &self.node_type {
            NodeType::Linear(next) => Some(next),
            _ => None,
        }
    }

    /// Every node id this node can lead to.
    pub fn successors(&self) -> Vec<&str> {
        match &self.node_type {
            NodeType::Linear(next) => vec![next.as_str()],
            NodeType::Decision(options) => options.iter().map(|o| o.next_node_id.as_str()).collect(),
            NodeType::Terminal => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Authoring format
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NodeShapeError {
    #[error("node '{0}' has both options and a nextNodeId")]
    BothSuccessors(String),
}

/// Flat record as content authors write it. Options and `nextNodeId` are
/// both optional here; the conversion below decides which variant it is.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    id: String,
    media_kind: MediaKind,
    media_source: String,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    options: Option<Vec<ScenarioOption>>,
    #[serde(default)]
    next_node_id: Option<String>,
}

impl TryFrom<RawNode> for ScenarioNode {
    type Error = NodeShapeError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let options = raw.options.unwrap_or_default();
        let node_type = match (options.is_empty(), raw.next_node_id) {
            (false, Some(_)) => return Err(NodeShapeError::BothSuccessors(raw.id)),
            (false, None) => NodeType::Decision(options),
            (true, Some(next)) => NodeType::Linear(next),
            (true, None) => NodeType::Terminal,
        };

        Ok(Self {
            id: raw.id,
            media: Media {
                kind: raw.media_kind,
                source: raw.media_source,
            },
            caption: raw.caption,
            node_type,
        })
    }
}
