use crate::error::{DecompileError, RecordError};
use crate::fetch::Fetch;
use crate::graph::{ActorGraph, CompiledBlockRecord, FunctionTable, Reconstructor};
use crate::work::{WorkDescriptor, WorkKind};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

/// One actor's slice of the compiled payload.
#[derive(Debug, Deserialize)]
pub struct CompiledActor {
    pub id: String,
    #[serde(default)]
    pub procedures: Map<String, Value>,
    #[serde(default)]
    pub compiled_block_map: Map<String, Value>,
}

/// Decompiles a Kitten-family work into an editable project document.
///
/// The compiled document is fetched, every actor in `compile_result` is
/// reconstructed into a block graph installed under its theatre entry, the
/// editor metadata the player strips is put back, and finally the compiled
/// payload keys are removed.
pub fn decompile(work: &WorkDescriptor, fetch: &dyn Fetch) -> Result<Value, DecompileError> {
    let payload_url = resolve_payload_url(work, fetch)?;
    let mut doc = fetch.fetch_json(&payload_url)?;

    let actors: Vec<CompiledActor> = doc
        .get("compile_result")
        .cloned()
        .ok_or(DecompileError::PayloadShape {
            field: "compile_result",
        })
        .and_then(|raw| {
            serde_json::from_value(raw).map_err(|_| DecompileError::PayloadShape {
                field: "compile_result",
            })
        })?;

    info!(actors = actors.len(), "reconstructing block graphs");

    let mut functions = FunctionTable::new();
    for actor in &actors {
        let graph = reconstruct_actor(actor, &mut functions)?;
        install_graph(&mut doc, &actor.id, graph)?;
    }

    apply_editor_metadata(&mut doc, work);
    strip_compiled_payload(&mut doc);
    Ok(doc)
}

/// Kitten works need one extra round trip to the player endpoint to learn
/// where the compiled payload actually lives.
fn resolve_payload_url(
    work: &WorkDescriptor,
    fetch: &dyn Fetch,
) -> Result<String, DecompileError> {
    if matches!(
        work.kind,
        WorkKind::Kitten2 | WorkKind::Kitten3 | WorkKind::Kitten4
    ) {
        let player_url = format!(
            "https://api-creation.codemao.cn/kitten/r2/work/player/load/{}",
            work.id
        );
        let player_meta = fetch.fetch_json(&player_url)?;
        return player_meta
            .get("source_urls")
            .and_then(Value::as_array)
            .and_then(|urls| urls.first())
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(DecompileError::PayloadShape {
                field: "source_urls",
            });
    }

    work.resource_urls
        .first()
        .cloned()
        .ok_or(DecompileError::PayloadShape {
            field: "source_urls",
        })
}

/// Rebuilds one actor's graph: procedure definitions first, then every
/// record of the compiled block map in its original encounter order.
///
/// Records that fail to decode or reconstruct degrade to disabled
/// placeholder blocks; only a record with no identity at all aborts the
/// work.
pub fn reconstruct_actor(
    actor: &CompiledActor,
    functions: &mut FunctionTable,
) -> Result<ActorGraph, DecompileError> {
    let mut graph = ActorGraph::new();
    let mut reconstructor = Reconstructor::new(&mut graph, functions);

    for raw in actor.procedures.values() {
        drive_record(&mut reconstructor, &actor.id, raw, true)?;
    }
    for raw in actor.compiled_block_map.values() {
        drive_record(&mut reconstructor, &actor.id, raw, false)?;
    }

    Ok(graph)
}

fn drive_record(
    reconstructor: &mut Reconstructor<'_>,
    actor_id: &str,
    raw: &Value,
    as_definition: bool,
) -> Result<(), DecompileError> {
    let record = match CompiledBlockRecord::from_value(raw) {
        Ok(record) => record,
        Err(err) if err.is_identity_failure() => {
            return Err(DecompileError::MalformedRecord {
                actor_id: actor_id.to_string(),
                detail: err.to_string(),
            });
        }
        Err(err) => {
            warn!(actor = actor_id, %err, "degrading malformed record to a placeholder");
            // from_value only reports Invalid once the identity is known.
            if let Some((id, block_type)) = CompiledBlockRecord::identity_of(raw) {
                reconstructor.install_placeholder(&id, &block_type);
            }
            return Ok(());
        }
    };

    let outcome = if as_definition {
        reconstructor.reconstruct_definition(&record)
    } else {
        reconstructor.reconstruct(&record)
    };

    if let Err(err) = outcome {
        match err {
            RecordError::MissingIdentity { detail } => {
                return Err(DecompileError::MalformedRecord {
                    actor_id: actor_id.to_string(),
                    detail,
                });
            }
            RecordError::Invalid { id, block_type, detail } => {
                warn!(actor = actor_id, block = %id, %detail, "degrading malformed record to a placeholder");
                reconstructor.install_placeholder(&id, &block_type);
            }
        }
    }
    Ok(())
}

/// Installs a reconstructed graph under the actor's theatre entry as
/// `block_data_json`. An actor the theatre has forgotten gets a stub entry
/// so its blocks still load.
fn install_graph(
    doc: &mut Value,
    actor_id: &str,
    graph: ActorGraph,
) -> Result<(), DecompileError> {
    let block_data = serde_json::to_value(&graph).map_err(|_| DecompileError::PayloadShape {
        field: "block_data_json",
    })?;

    let theatre = doc
        .get_mut("theatre")
        .and_then(Value::as_object_mut)
        .ok_or(DecompileError::PayloadShape { field: "theatre" })?;

    let section = ["actors", "scenes"].into_iter().find(|section| {
        theatre
            .get(*section)
            .and_then(Value::as_object)
            .is_some_and(|entries| entries.contains_key(actor_id))
    });

    match section {
        Some(section) => {
            let entry = theatre
                .get_mut(section)
                .and_then(Value::as_object_mut)
                .and_then(|entries| entries.get_mut(actor_id))
                .and_then(Value::as_object_mut)
                .ok_or(DecompileError::PayloadShape { field: "theatre" })?;
            entry.insert("block_data_json".to_string(), block_data);
            Ok(())
        }
        None => {
            warn!(actor = actor_id, "actor missing from theatre; synthesizing a stub entry");
            let mut stub = stub_actor(actor_id);
            stub.insert("block_data_json".to_string(), block_data);
            theatre
                .entry("actors")
                .or_insert_with(|| json!({}))
                .as_object_mut()
                .ok_or(DecompileError::PayloadShape { field: "actors" })?
                .insert(actor_id.to_string(), Value::Object(stub));
            Ok(())
        }
    }
}

fn stub_actor(actor_id: &str) -> Map<String, Value> {
    let short_id: String = actor_id.chars().take(8).collect();
    let stub = json!({
        "id": actor_id,
        "name": format!("未知角色_{short_id}"),
        "type": "sprite",
        "visible": true,
        "x": 0,
        "y": 0,
        "size": 100,
        "direction": 90,
        "draggable": false,
        "rotation_style": "all around",
    });
    match stub {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// Categories shown in the editor's toolbox, in display order. The compiled
/// player drops this ordering, so it is restored wholesale.
const TOOLBOX_CATEGORIES: &[&str] = &[
    "action",
    "advanced",
    "ai",
    "ai_game",
    "ai_lab",
    "appearance",
    "arduino",
    "audio",
    "camera",
    "cloud_list",
    "cloud_variable",
    "cognitive",
    "control",
    "data",
    "event",
    "micro_bit",
    "midi_music",
    "mobile_control",
    "operator",
    "pen",
    "physic",
    "physics2",
    "procedure",
    "sensing",
    "video",
    "wee_make",
    "wood",
];

fn apply_editor_metadata(doc: &mut Value, work: &WorkDescriptor) {
    let Some(root) = doc.as_object_mut() else {
        return;
    };
    root.insert(
        "hidden_toolbox".to_string(),
        json!({"toolbox": [], "blocks": []}),
    );
    root.insert("work_source_label".to_string(), json!(0));
    root.insert("sample_id".to_string(), json!(""));
    root.insert("project_name".to_string(), json!(work.name));
    root.insert("toolbox_order".to_string(), json!(TOOLBOX_CATEGORIES));
    root.insert("last_toolbox_order".to_string(), json!(TOOLBOX_CATEGORIES));
}

fn strip_compiled_payload(doc: &mut Value) {
    if let Some(root) = doc.as_object_mut() {
        for key in ["compile_result", "preview", "author_nickname"] {
            root.remove(key);
        }
    }
}
