use crate::error::RecordError;
use crate::graph::block::{ActorGraph, Edge, ReconstructedBlock};
use crate::graph::linker::FunctionTable;
use crate::graph::record::{CompiledBlockRecord, ParamValue};
use crate::shadow::{self, ShadowKind};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

/// Structural rule layered on top of the generic reconstruction pipeline.
///
/// Selected once per record from its type tag; each rule overrides exactly
/// one concern (statement-socket naming, mutation content, or both).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRule {
    Conditional,
    TextJoin,
    AskAndChoose,
    TextSelect,
    ProcedureDefinition,
    ProcedureCall,
    Plain,
}

impl BlockRule {
    pub fn of(block_type: &str) -> Self {
        if block_type.starts_with("procedures_2_def") {
            Self::ProcedureDefinition
        } else if block_type.starts_with("procedures_2_call") {
            Self::ProcedureCall
        } else {
            match block_type {
                "controls_if" => Self::Conditional,
                "text_join" => Self::TextJoin,
                "ask_and_choose" => Self::AskAndChoose,
                "text_select" => Self::TextSelect,
                _ => Self::Plain,
            }
        }
    }
}

/// Rebuilds one actor's connected block graph from flattened compiled
/// records.
///
/// The reconstruction is a memoized recursive descent: every record is
/// registered in the graph *before* its children are visited, so repeated
/// or cyclic references resolve to the already-built block instead of
/// recursing forever. The graph and function table are borrowed exclusively
/// for the duration of the actor's pass.
pub struct Reconstructor<'a> {
    graph: &'a mut ActorGraph,
    functions: &'a mut FunctionTable,
}

impl<'a> Reconstructor<'a> {
    pub fn new(graph: &'a mut ActorGraph, functions: &'a mut FunctionTable) -> Self {
        Self { graph, functions }
    }

    /// Reconstructs one compiled record (and, transitively, everything it
    /// references), returning the block id. Re-encountering an id returns
    /// the existing block.
    pub fn reconstruct(&mut self, record: &CompiledBlockRecord) -> Result<String, RecordError> {
        self.run(record, BlockRule::of(&record.block_type))
    }

    /// Reconstructs a record from the compiled `procedures` table, which is
    /// always treated as a definition regardless of its type tag.
    pub fn reconstruct_definition(
        &mut self,
        record: &CompiledBlockRecord,
    ) -> Result<String, RecordError> {
        self.run(record, BlockRule::ProcedureDefinition)
    }

    /// Replaces a failed record with a minimally valid disabled block and
    /// detaches anything the aborted reconstruction already wired up, so
    /// the parent/connection pairing stays consistent.
    pub fn install_placeholder(&mut self, id: &str, block_type: &str) {
        if let Some(edges) = self.graph.connections.get(id) {
            let orphaned: Vec<String> = edges.keys().cloned().collect();
            for target in orphaned {
                if let Some(block) = self.graph.blocks.get_mut(&target) {
                    block.parent_id = None;
                }
            }
        }
        self.graph.connections.insert(id.to_string(), IndexMap::new());
        self.graph
            .blocks
            .insert(id.to_string(), ReconstructedBlock::placeholder(id, block_type));
    }

    fn run(&mut self, record: &CompiledBlockRecord, rule: BlockRule) -> Result<String, RecordError> {
        if self.graph.blocks.contains_key(&record.id) {
            return Ok(record.id.clone());
        }
        self.register(record);

        match rule {
            BlockRule::Plain => {
                self.walk_next(record)?;
                self.walk_children(record, rule)?;
                self.walk_conditions(record)?;
                self.walk_params(record)?;
            }
            BlockRule::Conditional => {
                self.walk_next(record)?;
                self.walk_children(record, rule)?;
                self.walk_conditions(record)?;
                self.walk_params(record)?;
                self.finish_conditional(record);
            }
            BlockRule::TextJoin | BlockRule::TextSelect => {
                self.walk_next(record)?;
                self.walk_children(record, rule)?;
                self.walk_conditions(record)?;
                self.walk_params(record)?;
                self.set_items_mutation(&record.id, record.params.len());
            }
            BlockRule::AskAndChoose => {
                self.walk_next(record)?;
                self.walk_children(record, rule)?;
                self.walk_conditions(record)?;
                self.walk_params(record)?;
                // The first parameter is the prompt, not a choice.
                self.set_items_mutation(&record.id, record.params.len().saturating_sub(1));
            }
            BlockRule::ProcedureDefinition => {
                self.walk_children(record, rule)?;
                self.finish_definition(record)?;
            }
            BlockRule::ProcedureCall => {
                self.walk_next(record)?;
                self.finish_call(record)?;
            }
        }

        Ok(record.id.clone())
    }

    fn register(&mut self, record: &CompiledBlockRecord) {
        self.graph.blocks.insert(
            record.id.clone(),
            ReconstructedBlock::new(&record.id, &record.block_type),
        );
        self.graph.connections.entry(record.id.clone()).or_default();
    }

    fn block_mut(&mut self, id: &str) -> &mut ReconstructedBlock {
        self.graph
            .blocks
            .get_mut(id)
            .expect("block is registered before any rule touches it")
    }

    /// Creates the single inbound edge of `child_id` and sets its parent in
    /// the same step. On a re-encounter the first edge wins; a block never
    /// gains a second inbound connection.
    fn attach(&mut self, parent_id: &str, child_id: &str, edge: Edge) {
        let Some(child) = self.graph.blocks.get_mut(child_id) else {
            return;
        };
        if child.parent_id.is_some() {
            return;
        }
        child.parent_id = Some(parent_id.to_string());
        self.graph
            .connections
            .entry(parent_id.to_string())
            .or_default()
            .insert(child_id.to_string(), edge);
    }

    fn walk_next(&mut self, record: &CompiledBlockRecord) -> Result<(), RecordError> {
        if let Some(next) = &record.next_block {
            let next_id = self.reconstruct(next)?;
            self.attach(&record.id, &next_id, Edge::Next);
        }
        Ok(())
    }

    fn walk_children(
        &mut self,
        record: &CompiledBlockRecord,
        rule: BlockRule,
    ) -> Result<(), RecordError> {
        let condition_count = record.conditions.len();
        for (index, slot) in record.child_block.iter().enumerate() {
            let socket = statement_socket(rule, index, condition_count);
            if let Some(child) = slot {
                let child_id = self.reconstruct(child)?;
                self.attach(&record.id, &child_id, Edge::statement(socket.clone()));
            }
            // Holes still reserve the socket so the editor renders an empty
            // slot.
            self.block_mut(&record.id).shadows.insert(socket, String::new());
        }
        Ok(())
    }

    fn walk_conditions(&mut self, record: &CompiledBlockRecord) -> Result<(), RecordError> {
        for (index, condition) in record.conditions.iter().enumerate() {
            let child_id = self.reconstruct(condition)?;
            let socket = format!("IF{index}");
            let is_empty = self.graph.blocks[&child_id].block_type == "logic_empty";
            if !is_empty {
                self.attach(&record.id, &child_id, Edge::value(socket.clone()));
            }
            let markup = shadow::markup(ShadowKind::LogicEmpty, Some(&child_id), None);
            self.block_mut(&record.id).shadows.insert(socket, markup);
        }
        Ok(())
    }

    fn walk_params(&mut self, record: &CompiledBlockRecord) -> Result<(), RecordError> {
        for (name, value) in &record.params {
            match value {
                ParamValue::Literal(literal) => {
                    self.block_mut(&record.id)
                        .fields
                        .insert(name.clone(), literal.clone());
                }
                ParamValue::Record(child) => {
                    let child_id = self.reconstruct(child)?;
                    let markup = self.value_socket_shadow(name, &child_id);
                    self.block_mut(&record.id).shadows.insert(name.clone(), markup);
                    self.attach(&record.id, &child_id, Edge::value(name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Shadow markup for a value socket occupied by a real block.
    ///
    /// A shadow-eligible occupant gets a same-type shadow pre-filled with
    /// its first field value, so deleting the block leaves the old value
    /// behind as the default. Anything else gets a generic placeholder:
    /// `logic_empty` for boolean-named sockets, a numeric shadow otherwise.
    fn value_socket_shadow(&mut self, socket_name: &str, child_id: &str) -> String {
        let child = &self.graph.blocks[child_id];
        match ShadowKind::from_type(&child.block_type) {
            Some(kind) => {
                let text = child
                    .fields
                    .values()
                    .next()
                    .map(literal_text)
                    .unwrap_or_default();
                shadow::markup(kind, Some(child_id), Some(&text))
            }
            None => {
                let kind = if socket_name == "condition" || socket_name == "BOOL" {
                    ShadowKind::LogicEmpty
                } else {
                    ShadowKind::MathNumber
                };
                shadow::markup(kind, None, None)
            }
        }
    }

    fn set_items_mutation(&mut self, id: &str, items: usize) {
        self.block_mut(id).mutation = format!(r#"<mutation items="{items}"></mutation>"#);
    }

    fn finish_conditional(&mut self, record: &CompiledBlockRecord) {
        let add_else_affordance =
            record.child_block.len() == 2 && record.child_block[1].is_none();
        let elseif = record.conditions.len().saturating_sub(1);
        let block = self.block_mut(&record.id);
        if add_else_affordance {
            block.shadows.insert("EXTRA_ADD_ELSE".to_string(), String::new());
        } else {
            block.mutation = format!(r#"<mutation elseif="{elseif}" else="1"></mutation>"#);
            block.shadows.insert("ELSE_TEXT".to_string(), String::new());
        }
    }

    fn finish_definition(&mut self, record: &CompiledBlockRecord) -> Result<(), RecordError> {
        let name = record.procedure_name.clone().ok_or_else(|| {
            RecordError::invalid(
                &record.id,
                &record.block_type,
                "procedure definition without 'procedure_name'",
            )
        })?;

        {
            let block = self.block_mut(&record.id);
            block
                .shadows
                .insert("PROCEDURES_2_DEFNORETURN_DEFINE".to_string(), String::new());
            block
                .shadows
                .insert("PROCEDURES_2_DEFNORETURN_MUTATOR".to_string(), String::new());
            block
                .fields
                .insert("NAME".to_string(), Value::String(name.clone()));
        }

        let mut args = String::new();
        let param_names: Vec<String> = record.params.keys().cloned().collect();
        for (index, param_name) in param_names.iter().enumerate() {
            let socket = format!("PARAMS{index}");
            args.push_str(&format!(r#"<arg name="{socket}" />"#));
            let placeholder = shadow::markup(ShadowKind::MathNumber, None, None);
            self.block_mut(&record.id)
                .shadows
                .insert(socket.clone(), placeholder);

            let synthetic =
                CompiledBlockRecord::stable_parameter(shadow::random_id(), param_name);
            let child_id = self.reconstruct(&synthetic)?;
            self.attach(&record.id, &child_id, Edge::value(socket));
        }

        self.block_mut(&record.id).mutation = if args.is_empty() {
            "<mutation />".to_string()
        } else {
            format!("<mutation>{args}</mutation>")
        };

        self.functions.define(&name, &record.id);
        Ok(())
    }

    fn finish_call(&mut self, record: &CompiledBlockRecord) -> Result<(), RecordError> {
        let name = record.procedure_name.clone().ok_or_else(|| {
            RecordError::invalid(
                &record.id,
                &record.block_type,
                "procedure call without 'procedure_name'",
            )
        })?;

        // Single-pass linking: a call reconstructed ahead of its definition
        // keeps a synthetic id and stays disabled for good.
        let definition_id = match self.functions.resolve(&name) {
            Some(id) => id.to_string(),
            None => {
                debug!(procedure = %name, "call site precedes its definition; disabling");
                self.block_mut(&record.id).disabled = true;
                shadow::random_id()
            }
        };

        {
            let block = self.block_mut(&record.id);
            block.shadows.insert("NAME".to_string(), String::new());
            block
                .fields
                .insert("NAME".to_string(), Value::String(name.clone()));
        }

        let mut elements = String::new();
        for (index, (param_name, value)) in record.params.iter().enumerate() {
            let ParamValue::Record(child) = value else {
                return Err(RecordError::invalid(
                    &record.id,
                    &record.block_type,
                    format!("call parameter '{param_name}' is not a block"),
                ));
            };
            let socket = format!("ARG{index}");
            let child_id = self.reconstruct(child)?;
            let markup = shadow::markup(ShadowKind::DefaultValue, Some(&child_id), None);
            self.block_mut(&record.id).shadows.insert(socket.clone(), markup);
            elements.push_str(&format!(
                r#"<procedures_2_parameter_shadow name="{}" value="0" />"#,
                shadow::escape_xml(param_name)
            ));
            self.attach(&record.id, &child_id, Edge::value(socket));
        }

        let header = format!(
            r#"<mutation name="{}" def_id="{}""#,
            shadow::escape_xml(&name),
            shadow::escape_xml(&definition_id)
        );
        self.block_mut(&record.id).mutation = if elements.is_empty() {
            format!("{header} />")
        } else {
            format!("{header}>{elements}</mutation>")
        };
        Ok(())
    }
}

/// Statement-socket naming. Conditionals name one socket per condition
/// branch plus a trailing `ELSE`; procedure bodies hang off `STACK`;
/// everything else uses the editor default `DO`.
fn statement_socket(rule: BlockRule, index: usize, condition_count: usize) -> String {
    match rule {
        BlockRule::Conditional => {
            if index < condition_count {
                format!("DO{index}")
            } else {
                "ELSE".to_string()
            }
        }
        BlockRule::ProcedureDefinition => "STACK".to_string(),
        _ => "DO".to_string(),
    }
}

fn literal_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
