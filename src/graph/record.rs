use crate::error::RecordError;
use indexmap::IndexMap;
use serde_json::Value;

/// A parameter socket's compiled occupant: either a literal that becomes a
/// field, or a nested record that becomes a connected child block.
#[derive(Debug, Clone)]
pub enum ParamValue {
    Literal(Value),
    Record(Box<CompiledBlockRecord>),
}

/// One flattened unit of the compiled payload, decoded and validated once.
///
/// Everything except `id` and `type` is optional in the wire format; the
/// decode boundary normalizes absent keys to empty collections so the
/// reconstruction pass never touches raw JSON again.
#[derive(Debug, Clone)]
pub struct CompiledBlockRecord {
    pub id: String,
    pub block_type: String,
    pub next_block: Option<Box<CompiledBlockRecord>>,
    /// Ordered statement slots; `None` marks a hole the editor still
    /// renders as an empty slot.
    pub child_block: Vec<Option<CompiledBlockRecord>>,
    pub conditions: Vec<CompiledBlockRecord>,
    pub params: IndexMap<String, ParamValue>,
    pub procedure_name: Option<String>,
}

impl CompiledBlockRecord {
    /// Decodes a raw compiled record, nested records included.
    ///
    /// A record without id/type yields [`RecordError::MissingIdentity`].
    /// Any failure below an identified record is reported as
    /// [`RecordError::Invalid`] carrying that record's identity, so callers
    /// can degrade it to a placeholder instead of dropping the actor.
    pub fn from_value(value: &Value) -> Result<Self, RecordError> {
        let obj = value
            .as_object()
            .ok_or_else(|| RecordError::MissingIdentity {
                detail: format!("expected an object, found {}", json_kind(value)),
            })?;

        let id = obj
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| RecordError::MissingIdentity {
                detail: "no string 'id'".to_string(),
            })?
            .to_string();
        let block_type = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| RecordError::MissingIdentity {
                detail: format!("record '{id}' has no string 'type'"),
            })?
            .to_string();

        let wrap = |detail: String| RecordError::invalid(&id, &block_type, detail);

        let next_block = match obj.get("next_block") {
            None | Some(Value::Null) => None,
            Some(nested) => Some(Box::new(
                Self::from_value(nested).map_err(|e| wrap(e.to_string()))?,
            )),
        };

        let mut child_block = Vec::new();
        if let Some(children) = obj.get("child_block") {
            let slots = children
                .as_array()
                .ok_or_else(|| wrap("'child_block' is not an array".to_string()))?;
            for slot in slots {
                match slot {
                    Value::Null => child_block.push(None),
                    nested => child_block.push(Some(
                        Self::from_value(nested).map_err(|e| wrap(e.to_string()))?,
                    )),
                }
            }
        }

        let mut conditions = Vec::new();
        if let Some(raw) = obj.get("conditions") {
            let entries = raw
                .as_array()
                .ok_or_else(|| wrap("'conditions' is not an array".to_string()))?;
            for entry in entries {
                conditions.push(Self::from_value(entry).map_err(|e| wrap(e.to_string()))?);
            }
        }

        let mut params = IndexMap::new();
        if let Some(raw) = obj.get("params") {
            let entries = raw
                .as_object()
                .ok_or_else(|| wrap("'params' is not an object".to_string()))?;
            for (name, entry) in entries {
                let value = if entry.is_object() {
                    ParamValue::Record(Box::new(
                        Self::from_value(entry).map_err(|e| wrap(e.to_string()))?,
                    ))
                } else {
                    ParamValue::Literal(entry.clone())
                };
                params.insert(name.clone(), value);
            }
        }

        let procedure_name = obj
            .get("procedure_name")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            id,
            block_type,
            next_block,
            child_block,
            conditions,
            params,
            procedure_name,
        })
    }

    /// Extracts just the identity pair from a raw record, for building a
    /// placeholder when full decoding failed.
    pub fn identity_of(value: &Value) -> Option<(String, String)> {
        let obj = value.as_object()?;
        let id = obj.get("id")?.as_str()?.to_string();
        let block_type = obj.get("type")?.as_str()?.to_string();
        Some((id, block_type))
    }

    /// Builds the synthetic record backing one declared procedure parameter.
    /// These are freshly constructed, never aliased into the compiled input.
    pub fn stable_parameter(id: String, param_name: &str) -> Self {
        let mut params = IndexMap::new();
        params.insert(
            "param_name".to_string(),
            ParamValue::Literal(Value::String(param_name.to_string())),
        );
        params.insert(
            "param_default_value".to_string(),
            ParamValue::Literal(Value::String(String::new())),
        );
        Self {
            id,
            block_type: "procedures_2_stable_parameter".to_string(),
            next_block: None,
            child_block: Vec::new(),
            conditions: Vec::new(),
            params,
            procedure_name: None,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
