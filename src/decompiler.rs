use crate::error::DecompileError;
use crate::fetch::{Fetch, HttpFetcher};
use crate::output;
use crate::strategy::{coco, kitten, neko, nemo};
use crate::work::{WorkDescriptor, WorkKind};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

/// The decompiler entry point.
///
/// One instance can decompile any number of works, sequentially; no state
/// carries over between runs. The fetcher is injectable so tests (or
/// callers with their own transport) can supply canned responses.
pub struct Decompiler {
    fetch: Box<dyn Fetch>,
}

impl Decompiler {
    pub fn new() -> Self {
        Self {
            fetch: Box::new(HttpFetcher::new()),
        }
    }

    pub fn with_fetcher(fetch: Box<dyn Fetch>) -> Self {
        Self { fetch }
    }

    /// Decompiles one work into `output_dir` and returns the absolute path
    /// written: a project document for most variants, the unpacked
    /// directory for Nemo.
    ///
    /// Failures are fatal per work and name the failing stage; nothing is
    /// written unless the full result was assembled first.
    pub fn decompile(&self, work_id: i64, output_dir: &Path) -> Result<PathBuf, DecompileError> {
        info!(work_id, "decompiling work");
        let meta_url = format!("https://api.codemao.cn/creation-tools/v1/works/{work_id}");
        let meta = self.fetch.fetch_json(&meta_url)?;
        let work = WorkDescriptor::from_metadata(&meta)?;
        info!(name = %work.name, kind = work.kind.type_name(), "resolved work metadata");

        output::ensure_dir(output_dir)?;

        let written = match work.kind {
            WorkKind::Nemo => nemo::decompile(&work, self.fetch.as_ref(), output_dir)?,
            WorkKind::Kitten2 | WorkKind::Kitten3 | WorkKind::Kitten4 => {
                let doc = kitten::decompile(&work, self.fetch.as_ref())?;
                self.save_document(&work, &doc, output_dir)?
            }
            WorkKind::Coco => {
                let doc = coco::decompile(&work, self.fetch.as_ref())?;
                self.save_document(&work, &doc, output_dir)?
            }
            WorkKind::Neko => {
                let doc = neko::decompile(&work, self.fetch.as_ref())?;
                self.save_document(&work, &doc, output_dir)?
            }
        };

        let absolute = std::path::absolute(&written).unwrap_or(written);
        info!(path = %absolute.display(), "decompilation finished");
        Ok(absolute)
    }

    fn save_document(
        &self,
        work: &WorkDescriptor,
        doc: &Value,
        output_dir: &Path,
    ) -> Result<PathBuf, DecompileError> {
        let path = output_dir.join(work.save_filename());
        output::write_json(&path, doc)?;
        Ok(path)
    }
}

impl Default for Decompiler {
    fn default() -> Self {
        Self::new()
    }
}
