//! Placeholder ("shadow") markup for empty input sockets.
//!
//! The editor refuses to render a block whose value socket has no occupant,
//! so reconstruction fills every socket with a shadow: a leaf fragment
//! carrying a sensible default the user can type over. The set of shadow
//! kinds is closed and mirrors the editor's own palette.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Shadow identifiers are 20 characters drawn from `[0-9a-zA-Z]`.
///
/// Ids are scoped to a single actor's reconstruction pass, so the id space
/// alone keeps collisions out of reach; there is no registry.
const ID_LEN: usize = 20;

/// One of the editor's placeholder palettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowKind {
    BroadcastInput,
    ControllerShadow,
    DefaultValue,
    GetAudios,
    GetCurrentCostume,
    GetCurrentScene,
    GetSensingCurrentScene,
    GetWholeAudios,
    ListsGet,
    LogicEmpty,
    MathNumber,
    Text,
}

/// Default field layout for a shadow kind: field name, default text, and
/// any extra attributes the editor expects on the `<field>` element.
struct FieldSpec {
    name: &'static str,
    text: &'static str,
    extra: &'static [(&'static str, &'static str)],
}

impl ShadowKind {
    /// Maps a block type string onto a shadow kind, if it is one.
    pub fn from_type(block_type: &str) -> Option<Self> {
        match block_type {
            "broadcast_input" => Some(Self::BroadcastInput),
            "controller_shadow" => Some(Self::ControllerShadow),
            "default_value" => Some(Self::DefaultValue),
            "get_audios" => Some(Self::GetAudios),
            "get_current_costume" => Some(Self::GetCurrentCostume),
            "get_current_scene" => Some(Self::GetCurrentScene),
            "get_sensing_current_scene" => Some(Self::GetSensingCurrentScene),
            "get_whole_audios" => Some(Self::GetWholeAudios),
            "lists_get" => Some(Self::ListsGet),
            "logic_empty" => Some(Self::LogicEmpty),
            "math_number" => Some(Self::MathNumber),
            "text" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            Self::BroadcastInput => "broadcast_input",
            Self::ControllerShadow => "controller_shadow",
            Self::DefaultValue => "default_value",
            Self::GetAudios => "get_audios",
            Self::GetCurrentCostume => "get_current_costume",
            Self::GetCurrentScene => "get_current_scene",
            Self::GetSensingCurrentScene => "get_sensing_current_scene",
            Self::GetWholeAudios => "get_whole_audios",
            Self::ListsGet => "lists_get",
            Self::LogicEmpty => "logic_empty",
            Self::MathNumber => "math_number",
            Self::Text => "text",
        }
    }

    /// `logic_empty` is markup-only and carries no field at all.
    fn field(self) -> Option<FieldSpec> {
        match self {
            Self::BroadcastInput => Some(FieldSpec {
                name: "MESSAGE",
                text: "Hi",
                extra: &[],
            }),
            Self::ControllerShadow => Some(FieldSpec {
                name: "NUM",
                text: "0",
                extra: &[("constraints", "-Infinity,Infinity,0,false")],
            }),
            Self::DefaultValue => Some(FieldSpec {
                name: "TEXT",
                text: "0",
                extra: &[("has_been_edited", "false")],
            }),
            Self::GetAudios => Some(FieldSpec {
                name: "sound_id",
                text: "?",
                extra: &[],
            }),
            Self::GetCurrentCostume => Some(FieldSpec {
                name: "style_id",
                text: "",
                extra: &[],
            }),
            Self::GetCurrentScene | Self::GetSensingCurrentScene => Some(FieldSpec {
                name: "scene",
                text: "",
                extra: &[],
            }),
            Self::GetWholeAudios => Some(FieldSpec {
                name: "sound_id",
                text: "all",
                extra: &[],
            }),
            Self::ListsGet => Some(FieldSpec {
                name: "VAR",
                text: "?",
                extra: &[],
            }),
            Self::LogicEmpty => None,
            Self::MathNumber => Some(FieldSpec {
                name: "NUM",
                text: "0",
                extra: &[("constraints", "-Infinity,Infinity,0,"), ("allow_text", "true")],
            }),
            Self::Text => Some(FieldSpec {
                name: "TEXT",
                text: "",
                extra: &[],
            }),
        }
    }
}

/// Generates a fresh random shadow/block identifier.
pub fn random_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

/// Renders the markup for one shadow.
///
/// When `id` is absent a fresh random one is generated; when `text` is
/// absent the kind's default field text applies.
pub fn markup(kind: ShadowKind, id: Option<&str>, text: Option<&str>) -> String {
    let id = id.map(str::to_string).unwrap_or_else(random_id);

    let Some(spec) = kind.field() else {
        return format!(
            r#"<empty type="logic_empty" id="{}" visible="visible" editable="false"></empty>"#,
            escape_xml(&id)
        );
    };

    let mut attrs = String::new();
    for (key, value) in spec.extra {
        attrs.push_str(&format!(r#" {key}="{value}""#));
    }

    format!(
        r#"<shadow type="{}" id="{}" visible="visible" editable="true"><field name="{}"{}>{}</field></shadow>"#,
        kind.type_name(),
        escape_xml(&id),
        spec.name,
        attrs,
        escape_xml(text.unwrap_or(spec.text)),
    )
}

/// Minimal XML escaping for attribute values and field text.
pub(crate) fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}
