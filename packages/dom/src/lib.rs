//! # Markweave DOM
//!
//! Document model shared by the live editing surface and the mirror
//! document.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ lexer/parser: canonical HTML → arena nodes   │
//! └──────────────────────────────────────────────┘
//!                      ↓
//! ┌──────────────────────────────────────────────┐
//! │ Dom: arena tree + mutation records           │
//! │  - insert / detach / set text                │
//! │  - observe(root) → MutationRecord buffer     │
//! │  - snapshot / import for cross-tree copies   │
//! └──────────────────────────────────────────────┘
//!                      ↓
//! ┌──────────────────────────────────────────────┐
//! │ serializer: arena nodes → canonical HTML     │
//! └──────────────────────────────────────────────┘
//! ```

mod dom;
mod entities;
mod error;
mod node;
mod record;
mod snapshot;

pub mod lexer;
pub mod parser;
pub mod patch;
pub mod serializer;

pub use dom::{byte_offset, Ancestors, Dom};
pub use entities::decode_entities;
pub use error::{DomError, DomResult, ParseError};
pub use node::{is_void_element, NodeId, NodeKind};
pub use parser::{parse_document, parse_fragment, parse_into};
pub use patch::patch_children;
pub use record::{MutationRecord, RecordKind};
pub use serializer::{serialize_children, serialize_node, serialize_snapshot};
pub use snapshot::NodeSnapshot;
