use crate::codec;
use crate::error::DecompileError;
use crate::fetch::Fetch;
use crate::work::WorkDescriptor;
use serde_json::Value;
use tracing::info;

/// Decompiles an encrypted Neko work.
///
/// The published-work detail endpoint names the encrypted export; the
/// envelope is unpacked by the codec layer and the recovered bytes go
/// through the resilient parser, since these exports are the ones the
/// platform most often truncates in transit.
pub fn decompile(work: &WorkDescriptor, fetch: &dyn Fetch) -> Result<Value, DecompileError> {
    let detail_url = format!(
        "https://api-creation.codemao.cn/neko/community/player/published-work-detail/{}",
        work.id
    );
    let detail = fetch.fetch_json(&detail_url)?;
    let encrypted_url = detail
        .get("source_urls")
        .and_then(Value::as_array)
        .and_then(|urls| urls.first())
        .and_then(Value::as_str)
        .ok_or(DecompileError::PayloadShape {
            field: "source_urls",
        })?;

    let envelope = fetch.fetch_text(encrypted_url)?;
    info!(chars = envelope.len(), "downloaded encrypted export");

    let plaintext = codec::decrypt(&envelope)?;
    let doc = codec::parse_resilient(&plaintext)?;
    Ok(doc)
}
