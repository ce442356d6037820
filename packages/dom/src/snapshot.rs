use serde::{Deserialize, Serialize};

/// Owned, arena-independent copy of a subtree.
///
/// Snapshots travel inside operations: one is taken from the live surface
/// and imported into the mirror document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeSnapshot {
    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attributes: Vec<(String, String)>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<NodeSnapshot>,
    },

    Text {
        content: String,
    },

    Comment {
        content: String,
    },
}

impl NodeSnapshot {
    pub fn element(tag: impl Into<String>) -> Self {
        NodeSnapshot::Element {
            tag: tag.into().to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        NodeSnapshot::Text {
            content: content.into(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let NodeSnapshot::Element {
            ref mut attributes, ..
        } = self
        {
            attributes.push((key.into().to_ascii_lowercase(), value.into()));
        }
        self
    }

    pub fn with_child(mut self, child: NodeSnapshot) -> Self {
        if let NodeSnapshot::Element {
            ref mut children, ..
        } = self
        {
            children.push(child);
        }
        self
    }

    pub fn with_text(self, content: impl Into<String>) -> Self {
        self.with_child(NodeSnapshot::text(content))
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            NodeSnapshot::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Concatenated text of the snapshot
    pub fn text_content(&self) -> String {
        match self {
            NodeSnapshot::Text { content } => content.clone(),
            NodeSnapshot::Comment { .. } => String::new(),
            NodeSnapshot::Element { children, .. } => {
                children.iter().map(NodeSnapshot::text_content).collect()
            }
        }
    }
}
