use crate::NodeId;
use thiserror::Error;

pub type DomResult<T> = Result<T, DomError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {0} cannot have children")]
    NotAContainer(NodeId),

    #[error("Node {0} is not a character data node")]
    NotCharacterData(NodeId),

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Inserting {child} under {parent} would create a cycle")]
    CycleDetected { parent: NodeId, child: NodeId },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Lexer error at {pos}")]
    LexerError { pos: usize },

    #[error("Malformed tag at {pos}: {message}")]
    MalformedTag { pos: usize, message: String },
}

impl ParseError {
    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }

    pub fn malformed_tag(pos: usize, message: impl Into<String>) -> Self {
        Self::MalformedTag {
            pos,
            message: message.into(),
        }
    }
}
