use crate::shadow::ShadowKind;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Which input socket family an edge occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSlot {
    Statement,
    Value,
}

/// A directed edge from a block to one of its children, stored in the
/// connections map under the *source* block id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Edge {
    #[serde(rename = "next")]
    Next,
    #[serde(rename = "input")]
    Input {
        input_type: InputSlot,
        input_name: String,
    },
}

impl Edge {
    pub fn statement(name: impl Into<String>) -> Self {
        Self::Input {
            input_type: InputSlot::Statement,
            input_name: name.into(),
        }
    }

    pub fn value(name: impl Into<String>) -> Self {
        Self::Input {
            input_type: InputSlot::Value,
            input_name: name.into(),
        }
    }
}

/// One reconstructed block, serialized in the exact key order the editor's
/// project format uses.
#[derive(Debug, Clone, Serialize)]
pub struct ReconstructedBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    pub location: (i64, i64),
    pub is_shadow: bool,
    pub collapsed: bool,
    pub disabled: bool,
    pub deletable: bool,
    pub movable: bool,
    pub editable: bool,
    pub visible: &'static str,
    pub shadows: IndexMap<String, String>,
    pub fields: IndexMap<String, Value>,
    pub field_constraints: IndexMap<String, Value>,
    pub field_extra_attr: IndexMap<String, Value>,
    pub comment: Option<String>,
    pub mutation: String,
    pub is_output: bool,
    pub parent_id: Option<String>,
}

impl ReconstructedBlock {
    pub fn new(id: &str, block_type: &str) -> Self {
        let is_shadow = ShadowKind::from_type(block_type).is_some();
        let is_output = is_shadow
            || matches!(
                block_type,
                "logic_boolean" | "procedures_2_stable_parameter"
            );
        Self {
            id: id.to_string(),
            block_type: block_type.to_string(),
            location: (0, 0),
            is_shadow,
            collapsed: false,
            disabled: false,
            deletable: true,
            movable: true,
            editable: true,
            visible: "visible",
            shadows: IndexMap::new(),
            fields: IndexMap::new(),
            field_constraints: IndexMap::new(),
            field_extra_attr: IndexMap::new(),
            comment: None,
            mutation: String::new(),
            is_output,
            parent_id: None,
        }
    }

    /// Minimal stand-in for a record whose reconstruction failed.
    pub fn placeholder(id: &str, block_type: &str) -> Self {
        let mut block = Self::new(id, block_type);
        block.disabled = true;
        block
    }
}

/// One actor's reconstructed block graph.
///
/// Both maps are insertion-ordered and keyed by block id; the graph is
/// exclusively owned by a single reconstruction pass and handed over whole
/// once that pass completes.
#[derive(Debug, Default, Serialize)]
pub struct ActorGraph {
    pub blocks: IndexMap<String, ReconstructedBlock>,
    pub connections: IndexMap<String, IndexMap<String, Edge>>,
    pub comments: IndexMap<String, Value>,
}

impl ActorGraph {
    pub fn new() -> Self {
        Self::default()
    }
}
