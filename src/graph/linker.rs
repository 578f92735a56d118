use ahash::AHashMap;
use tracing::debug;

/// Resolves procedure call sites to their definition blocks.
///
/// Linking is single-pass: a call reconstructed before its definition gets a
/// synthetic id and a disabled marker, and is never revisited once the pass
/// completes. The table is shared across all actors of one work, since a
/// call may reference a procedure defined on another actor.
#[derive(Debug, Default)]
pub struct FunctionTable {
    definitions: AHashMap<String, String>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a reconstructed definition. A redefinition wins; the editor
    /// keeps only one procedure per name anyway.
    pub fn define(&mut self, name: &str, definition_block_id: &str) {
        debug!(procedure = name, block = definition_block_id, "registered procedure definition");
        self.definitions
            .insert(name.to_string(), definition_block_id.to_string());
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.definitions.get(name).map(String::as_str)
    }
}
