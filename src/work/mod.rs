use crate::error::DecompileError;
use serde_json::Value;

/// The closed set of work formats the platform serves.
///
/// The three Kitten generations share the block-graph reconstruction path;
/// Neko is the encrypted JSON family, Coco the screen/widget family, and
/// Nemo unpacks into a directory tree instead of a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkKind {
    Nemo,
    Kitten2,
    Kitten3,
    Kitten4,
    Coco,
    Neko,
}

impl WorkKind {
    /// Maps the platform-reported type string onto the closed enum.
    pub fn parse(type_name: &str) -> Option<Self> {
        match type_name {
            "NEMO" => Some(Self::Nemo),
            "KITTEN2" => Some(Self::Kitten2),
            "KITTEN3" => Some(Self::Kitten3),
            "KITTEN4" => Some(Self::Kitten4),
            "COCO" => Some(Self::Coco),
            "NEKO" => Some(Self::Neko),
            _ => None,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            Self::Nemo => "NEMO",
            Self::Kitten2 => "KITTEN2",
            Self::Kitten3 => "KITTEN3",
            Self::Kitten4 => "KITTEN4",
            Self::Coco => "COCO",
            Self::Neko => "NEKO",
        }
    }

    /// Extension of the saved project document. Nemo works unpack into a
    /// directory and carry no extension at all.
    pub fn file_extension(self) -> &'static str {
        match self {
            Self::Kitten2 | Self::Kitten3 => ".bcm",
            Self::Kitten4 => ".bcm4",
            Self::Coco | Self::Neko => ".json",
            Self::Nemo => "",
        }
    }
}

/// Normalized metadata for one saved work.
///
/// Built once per decompilation run from the platform's work endpoint and
/// never mutated; everything downstream (strategy choice, payload URLs,
/// output naming) derives from it.
#[derive(Debug, Clone)]
pub struct WorkDescriptor {
    pub id: i64,
    pub name: String,
    pub kind: WorkKind,
    pub version: String,
    pub user_id: i64,
    pub preview_url: String,
    pub resource_urls: Vec<String>,
}

impl WorkDescriptor {
    /// Normalizes raw platform metadata into a descriptor.
    ///
    /// Only the numeric `id` is strictly required; missing names and
    /// versions get the platform defaults, and the type string defaults to
    /// `NEMO` the way the player itself does.
    pub fn from_metadata(meta: &Value) -> Result<Self, DecompileError> {
        let id = meta
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| DecompileError::Metadata {
                detail: "missing numeric 'id'".to_string(),
            })?;

        let name = meta
            .get("work_name")
            .or_else(|| meta.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("未知作品")
            .to_string();

        let type_name = meta.get("type").and_then(Value::as_str).unwrap_or("NEMO");
        let kind =
            WorkKind::parse(type_name).ok_or_else(|| DecompileError::UnsupportedFormat {
                type_name: type_name.to_string(),
            })?;

        let version = meta
            .get("bcm_version")
            .and_then(Value::as_str)
            .unwrap_or("0.16.2")
            .to_string();

        let user_id = meta.get("user_id").and_then(Value::as_i64).unwrap_or(0);
        let preview_url = meta
            .get("preview")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let resource_urls = meta
            .get("source_urls")
            .or_else(|| meta.get("work_urls"))
            .and_then(Value::as_array)
            .map(|urls| {
                urls.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            id,
            name,
            kind,
            version,
            user_id,
            preview_url,
            resource_urls,
        })
    }

    /// File name the reconstructed document is saved under.
    pub fn save_filename(&self) -> String {
        safe_filename(&self.name, self.id, self.kind.file_extension())
    }
}

/// Builds a filesystem-safe file name from a user-chosen work name.
///
/// Keeps Unicode alphanumerics, spaces, dashes and underscores. Names
/// containing path separators or parent-directory references poison the
/// whole name rather than being stripped down to a residue. A name that ends
/// up empty falls back to `work_<id>`.
pub fn safe_filename(name: &str, work_id: i64, extension: &str) -> String {
    let stem: String = if name.contains(['/', '\\']) || name.contains("..") {
        String::new()
    } else {
        name.chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .trim()
            .to_string()
    };

    if stem.is_empty() {
        format!("work_{work_id}{extension}")
    } else {
        format!("{stem}_{work_id}{extension}")
    }
}
