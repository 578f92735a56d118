//! Common test utilities: canned fetchers, compiled-record builders, and
//! graph invariant checks.
use fukugen::error::NetworkError;
use fukugen::fetch::Fetch;
use fukugen::graph::{ActorGraph, FunctionTable};
use fukugen::strategy::kitten::{CompiledActor, reconstruct_actor};
use serde_json::{Map, Value, json};
use std::collections::HashMap;

/// A canned response the fake fetcher serves for one URL.
#[allow(dead_code)]
pub enum Canned {
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

/// In-memory [`Fetch`] implementation serving canned responses.
pub struct FakeFetcher {
    responses: HashMap<String, Canned>,
}

#[allow(dead_code)]
impl FakeFetcher {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
        }
    }

    pub fn with_json(mut self, url: &str, value: Value) -> Self {
        self.responses.insert(url.to_string(), Canned::Json(value));
        self
    }

    pub fn with_text(mut self, url: &str, text: &str) -> Self {
        self.responses
            .insert(url.to_string(), Canned::Text(text.to_string()));
        self
    }

    pub fn with_bytes(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.responses.insert(url.to_string(), Canned::Bytes(bytes));
        self
    }

    fn missing(&self, url: &str) -> NetworkError {
        NetworkError::Unavailable {
            url: url.to_string(),
            reason: "no canned response".to_string(),
        }
    }
}

impl Fetch for FakeFetcher {
    fn fetch_json(&self, url: &str) -> Result<Value, NetworkError> {
        match self.responses.get(url) {
            Some(Canned::Json(value)) => Ok(value.clone()),
            _ => Err(self.missing(url)),
        }
    }

    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        match self.responses.get(url) {
            Some(Canned::Bytes(bytes)) => Ok(bytes.clone()),
            _ => Err(self.missing(url)),
        }
    }

    fn fetch_text(&self, url: &str) -> Result<String, NetworkError> {
        match self.responses.get(url) {
            Some(Canned::Text(text)) => Ok(text.clone()),
            _ => Err(self.missing(url)),
        }
    }
}

/// Builds a minimal compiled record with empty params.
#[allow(dead_code)]
pub fn record(id: &str, block_type: &str) -> Value {
    json!({ "id": id, "type": block_type, "params": {} })
}

/// Runs one actor's reconstruction over the given top-level records.
#[allow(dead_code)]
pub fn reconstruct_records(records: &[Value]) -> ActorGraph {
    let mut compiled_block_map = Map::new();
    for raw in records {
        let id = raw["id"].as_str().expect("test record needs an id");
        compiled_block_map.insert(id.to_string(), raw.clone());
    }
    let actor = CompiledActor {
        id: "actor_under_test".to_string(),
        procedures: Map::new(),
        compiled_block_map,
    };
    let mut functions = FunctionTable::new();
    reconstruct_actor(&actor, &mut functions).expect("reconstruction should not abort")
}

/// Asserts the parent/inbound-connection bijection: every block with a
/// parent has exactly one inbound edge, held under that parent, and every
/// recorded edge targets a block pointing back at its source.
#[allow(dead_code)]
pub fn assert_parent_connection_bijection(graph: &ActorGraph) {
    let mut inbound: HashMap<&str, Vec<&str>> = HashMap::new();
    for (source, edges) in &graph.connections {
        for target in edges.keys() {
            inbound.entry(target.as_str()).or_default().push(source.as_str());
        }
    }

    for (id, block) in &graph.blocks {
        match &block.parent_id {
            Some(parent) => {
                let sources = inbound
                    .get(id.as_str())
                    .unwrap_or_else(|| panic!("block '{id}' has a parent but no inbound edge"));
                assert_eq!(
                    sources,
                    &vec![parent.as_str()],
                    "block '{id}' parent/edge mismatch"
                );
            }
            None => {
                assert!(
                    !inbound.contains_key(id.as_str()),
                    "root block '{id}' has an inbound edge"
                );
            }
        }
    }

    for target in inbound.keys() {
        assert!(
            graph.blocks.contains_key(*target),
            "edge targets unknown block '{target}'"
        );
    }
}

/// Scrubs the random identifiers out of shadow/mutation markup so two runs
/// over the same input can be compared structurally.
#[allow(dead_code)]
pub fn scrub_random_ids(value: &Value) -> Value {
    match value {
        Value::String(text) => Value::String(scrub_markup_ids(text)),
        Value::Array(items) => Value::Array(items.iter().map(scrub_random_ids).collect()),
        Value::Object(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, entry)| (key.clone(), scrub_random_ids(entry)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn scrub_markup_ids(text: &str) -> String {
    let mut scrubbed = String::new();
    let mut rest = text;
    while let Some(start) = rest.find("id=\"") {
        let after = &rest[start + 4..];
        let Some(end) = after.find('"') else {
            break;
        };
        scrubbed.push_str(&rest[..start + 4]);
        scrubbed.push('X');
        rest = &after[end..];
    }
    scrubbed.push_str(rest);
    scrubbed
}
