use crate::error::DecompileError;
use crate::fetch::Fetch;
use crate::work::WorkDescriptor;
use serde_json::{Map, Value, json};
use tracing::info;

/// Decompiles a Coco (screen/widget) work.
///
/// No block graph is involved: the compiled document already contains the
/// full structure and only needs its keys regrouped the way the editor
/// loads them — screens keyed by id, widgets folded into their screens,
/// resource maps flattened to lists, and variables classified back into the
/// three global pools.
pub fn decompile(work: &WorkDescriptor, fetch: &dyn Fetch) -> Result<Value, DecompileError> {
    let load_url = format!(
        "https://api-creation.codemao.cn/coconut/web/work/{}/load",
        work.id
    );
    let load_meta = fetch.fetch_json(&load_url)?;
    let payload_url = load_meta
        .get("data")
        .and_then(|data| data.get("bcmc_url"))
        .and_then(Value::as_str)
        .ok_or(DecompileError::PayloadShape { field: "bcmc_url" })?;

    let mut doc = fetch.fetch_json(payload_url)?;
    reorganize(&mut doc, work)?;
    clean(&mut doc);
    Ok(doc)
}

fn reorganize(doc: &mut Value, work: &WorkDescriptor) -> Result<(), DecompileError> {
    let root = doc
        .as_object_mut()
        .ok_or(DecompileError::PayloadShape { field: "document" })?;

    root.insert("authorId".to_string(), json!(work.user_id));
    root.insert("title".to_string(), json!(work.name));

    regroup_screens(root)?;
    rebuild_workspaces(root)?;
    flatten_resource_maps(root);
    classify_variables(root)?;

    // Whatever the screens did not claim stays global.
    let global_widgets = root
        .remove("widgetMap")
        .unwrap_or_else(|| json!({}));
    let global_ids: Vec<String> = global_widgets
        .as_object()
        .map(|widgets| widgets.keys().cloned().collect())
        .unwrap_or_default();
    root.insert("globalWidgets".to_string(), global_widgets);
    root.insert("globalWidgetIds".to_string(), json!(global_ids));
    root.insert("sourceTag".to_string(), json!(1));
    root.insert("sourceId".to_string(), json!(""));
    Ok(())
}

/// Moves `screenList` into an id-keyed `screens` map, claiming each
/// screen's widgets out of the shared widget map.
fn regroup_screens(root: &mut Map<String, Value>) -> Result<(), DecompileError> {
    let screen_list = root
        .get("screenList")
        .and_then(Value::as_array)
        .cloned()
        .ok_or(DecompileError::PayloadShape { field: "screenList" })?;

    let mut screens = Map::new();
    let mut screen_ids = Vec::new();

    for mut screen in screen_list {
        let Some(screen_obj) = screen.as_object_mut() else {
            continue;
        };
        let Some(screen_id) = screen_obj.get("id").and_then(Value::as_str).map(str::to_string)
        else {
            continue;
        };

        screen_obj.insert("snapshot".to_string(), json!(""));
        screen_obj.insert("primitiveVariables".to_string(), json!([]));
        screen_obj.insert("arrayVariables".to_string(), json!([]));
        screen_obj.insert("objectVariables".to_string(), json!([]));
        screen_obj.insert("broadcasts".to_string(), json!(["Hi"]));

        let mut widget_ids: Vec<String> = Vec::new();
        for key in ["widgetIds", "invisibleWidgetIds"] {
            if let Some(ids) = screen_obj.get(key).and_then(Value::as_array) {
                widget_ids.extend(ids.iter().filter_map(Value::as_str).map(str::to_string));
            }
        }

        let mut widgets = Map::new();
        if let Some(widget_map) = root.get_mut("widgetMap").and_then(Value::as_object_mut) {
            for widget_id in &widget_ids {
                if let Some(widget) = widget_map.remove(widget_id) {
                    widgets.insert(widget_id.clone(), widget);
                }
            }
        }
        screen_obj.insert("widgets".to_string(), Value::Object(widgets));

        screen_ids.push(screen_id.clone());
        screens.insert(screen_id, screen);
    }

    info!(screens = screen_ids.len(), "regrouped screens");
    root.insert("screens".to_string(), Value::Object(screens));
    root.insert("screenIds".to_string(), json!(screen_ids));
    Ok(())
}

/// Wraps each screen's compiled block JSON into a workspace container.
fn rebuild_workspaces(root: &mut Map<String, Value>) -> Result<(), DecompileError> {
    let block_map = root
        .get("blockJsonMap")
        .and_then(Value::as_object)
        .cloned()
        .ok_or(DecompileError::PayloadShape {
            field: "blockJsonMap",
        })?;

    let mut blockly = Map::new();
    for (screen_id, blocks) in block_map {
        blockly.insert(
            screen_id.clone(),
            json!({
                "screenId": screen_id,
                "workspaceJson": blocks,
                "workspaceOffset": {"x": 0, "y": 0},
            }),
        );
    }
    root.insert("blockly".to_string(), Value::Object(blockly));
    Ok(())
}

fn flatten_resource_maps(root: &mut Map<String, Value>) {
    for map_name in ["imageFileMap", "soundFileMap", "iconFileMap", "fontFileMap"] {
        let Some(entries) = root.get(map_name).and_then(Value::as_object) else {
            continue;
        };
        let list: Vec<Value> = entries.values().cloned().collect();
        let list_name = map_name.replace("Map", "List");
        root.insert(list_name, json!(list));
    }
}

/// Splits the flat variable map back into the editor's three global pools,
/// assigning counter-based display names since the compiled form dropped
/// the originals.
fn classify_variables(root: &mut Map<String, Value>) -> Result<(), DecompileError> {
    let variable_map = root
        .get("variableMap")
        .and_then(Value::as_object)
        .cloned()
        .ok_or(DecompileError::PayloadShape {
            field: "variableMap",
        })?;

    let mut variables = Vec::new();
    let mut arrays = Vec::new();
    let mut objects = Vec::new();

    for (var_id, value) in variable_map {
        match value {
            Value::Array(_) => {
                let name = format!("列表{}", arrays.len() + 1);
                arrays.push(entry(&var_id, &name, value));
            }
            Value::Object(_) => {
                let name = format!("字典{}", objects.len() + 1);
                objects.push(entry(&var_id, &name, value));
            }
            other => {
                let name = format!("变量{}", variables.len() + 1);
                variables.push(entry(&var_id, &name, other));
            }
        }
    }

    root.insert("globalVariableList".to_string(), json!(variables));
    root.insert("globalArrayList".to_string(), json!(arrays));
    root.insert("globalObjectList".to_string(), json!(objects));
    Ok(())
}

fn entry(var_id: &str, name: &str, value: Value) -> Value {
    json!({
        "id": var_id,
        "name": name,
        "defaultValue": value.clone(),
        "value": value,
    })
}

fn clean(doc: &mut Value) {
    let Some(root) = doc.as_object_mut() else {
        return;
    };
    for key in [
        "apiToken",
        "blockCode",
        "blockJsonMap",
        "fontFileMap",
        "gridMap",
        "iconFileMap",
        "id",
        "imageFileMap",
        "initialScreenId",
        "screenList",
        "soundFileMap",
        "variableMap",
        "widgetMap",
    ] {
        root.remove(key);
    }
}
