use crate::error::DecompileError;
use crate::fetch::Fetch;
use crate::output;
use crate::work::WorkDescriptor;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Decompiles a Nemo work into the editor's on-disk directory layout.
///
/// Unlike every other variant this produces a directory tree rather than a
/// single document: `user_material/` for downloaded style images and
/// `user_works/<id>/` holding the `.bcm`, `.userimg`, `.meta` and `.cover`
/// siblings. Referenced media downloads are best-effort; a missing image
/// never fails the work.
pub fn decompile(
    work: &WorkDescriptor,
    fetch: &dyn Fetch,
    output_dir: &Path,
) -> Result<PathBuf, DecompileError> {
    let source_url = format!(
        "https://api.codemao.cn/creation-tools/v1/works/{}/source/public",
        work.id
    );
    let source_info = fetch.fetch_json(&source_url)?;
    let bcm_url = source_info
        .get("work_urls")
        .and_then(Value::as_array)
        .and_then(|urls| urls.first())
        .and_then(Value::as_str)
        .ok_or(DecompileError::PayloadShape { field: "work_urls" })?
        .to_string();
    let bcm_data = fetch.fetch_json(&bcm_url)?;

    let base_dir = output_dir.join(format!("nemo_work_{}", work.id));
    let material_dir = base_dir.join("user_material");
    let works_dir = base_dir.join("user_works").join(work.id.to_string());
    let record_dir = works_dir.join("record");
    for dir in [&material_dir, &works_dir, &record_dir] {
        output::ensure_dir(dir)?;
    }

    output::write_json(&works_dir.join(format!("{}.bcm", work.id)), &bcm_data)?;
    output::write_json(
        &works_dir.join(format!("{}.userimg", work.id)),
        &build_user_images(&bcm_data),
    )?;
    output::write_json(
        &works_dir.join(format!("{}.meta", work.id)),
        &build_metadata(work, &source_info, &bcm_url),
    )?;

    if let Some(preview) = source_info.get("preview").and_then(Value::as_str)
        && !preview.is_empty()
    {
        match fetch.fetch_bytes(preview) {
            Ok(cover) => {
                output::write_bytes(&works_dir.join(format!("{}.cover", work.id)), &cover)?;
            }
            Err(err) => warn!(%err, "cover download failed"),
        }
    }

    download_styles(&bcm_data, fetch, &material_dir)?;

    info!(dir = %base_dir.display(), "unpacked work directory");
    Ok(base_dir)
}

fn style_urls(bcm_data: &Value) -> Vec<(String, String)> {
    bcm_data
        .get("styles")
        .and_then(|styles| styles.get("styles_dict"))
        .and_then(Value::as_object)
        .map(|styles| {
            styles
                .iter()
                .filter_map(|(style_id, style)| {
                    style
                        .get("url")
                        .and_then(Value::as_str)
                        .map(|url| (style_id.clone(), url.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Maps every style id onto the local image path its download will use.
fn build_user_images(bcm_data: &Value) -> Value {
    let mut user_img_dict = serde_json::Map::new();
    for (style_id, url) in style_urls(bcm_data) {
        user_img_dict.insert(
            style_id.clone(),
            json!({
                "id": style_id,
                "path": format!("user_material/{}.webp", sha256_hex(&url)),
            }),
        );
    }
    json!({ "user_img_dict": user_img_dict })
}

fn build_metadata(work: &WorkDescriptor, source_info: &Value, bcm_url: &str) -> Value {
    json!({
        "bcm_count": {
            "block_cnt_without_invisible": 0.0,
            "block_cnt": 0.0,
            "entity_cnt": 1.0,
        },
        "bcm_name": source_info.get("name").and_then(Value::as_str).unwrap_or(&work.name),
        "bcm_url": bcm_url,
        "bcm_version": source_info
            .get("bcm_version")
            .and_then(Value::as_str)
            .unwrap_or(&work.version),
        "download_fail": false,
        "extra_data": {},
        "have_published_status": false,
        "have_remote_resources": false,
        "is_landscape": false,
        "is_micro_bit": false,
        "is_valid": false,
        "mcloud_variable": [],
        "publish_preview": source_info.get("preview").and_then(Value::as_str).unwrap_or(""),
        "publish_status": 0,
        "review_state": 0,
        "template_id": 0,
        "term_id": 0,
        "type": 0,
        "upload_status": {
            "work_id": work.id,
            "have_uploaded": 2,
        },
    })
}

fn download_styles(
    bcm_data: &Value,
    fetch: &dyn Fetch,
    material_dir: &Path,
) -> Result<(), DecompileError> {
    for (_, url) in style_urls(bcm_data) {
        match fetch.fetch_bytes(&url) {
            Ok(image) => {
                let file_name = format!("{}.webp", sha256_hex(&url));
                output::write_bytes(&material_dir.join(file_name), &image)?;
            }
            Err(err) => warn!(url, %err, "style download failed"),
        }
    }
    Ok(())
}

fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}
