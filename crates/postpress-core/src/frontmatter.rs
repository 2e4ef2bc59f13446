//! Frontmatter parsing for post content.
//!
//! A post may start with a metadata block in YAML (`---`) or TOML (`+++`).
//! The block's top-level value must be a mapping; it becomes the post's
//! attributes verbatim, in authored order.

use serde_json::{Map, Value};

use crate::{
    error::{CoreError, Result},
    pipeline::{AttributeExtractor, BoxError, ExtractedAttributes},
};

/// Delimiter types for frontmatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontmatterFormat {
    /// YAML frontmatter delimited by `---`.
    Yaml,
    /// TOML frontmatter delimited by `+++`.
    Toml,
}

impl FrontmatterFormat {
    /// Get the delimiter string for this format.
    pub fn delimiter(&self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }
}

/// Split content into frontmatter and body.
///
/// The opening delimiter must be the first line (a UTF-8 BOM is ignored) and
/// the closing delimiter must sit on a line of its own. Returns `None` when
/// there is no complete block.
pub fn split_frontmatter(content: &str) -> Option<(FrontmatterFormat, &str, &str)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let format = if content.starts_with("---") {
        FrontmatterFormat::Yaml
    } else if content.starts_with("+++") {
        FrontmatterFormat::Toml
    } else {
        return None;
    };

    let delimiter = format.delimiter();
    let rest = &content[delimiter.len()..];
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == delimiter {
            let frontmatter = rest[..offset].trim();
            let body = rest[offset + line.len()..].trim_start_matches(['\r', '\n']);
            return Some((format, frontmatter, body));
        }
        offset += line.len();
    }

    None
}

/// Parse the attributes of `content`.
///
/// Content without a metadata block yields empty attributes and the whole
/// content as body.
pub fn parse_attributes(content: &str) -> Result<ExtractedAttributes> {
    let Some((format, fm_str, body)) = split_frontmatter(content) else {
        return Ok(ExtractedAttributes {
            attributes: Map::new(),
            body: content.to_string(),
        });
    };

    if fm_str.is_empty() {
        return Ok(ExtractedAttributes {
            attributes: Map::new(),
            body: body.to_string(),
        });
    }

    let value = match format {
        FrontmatterFormat::Yaml => serde_yaml::from_str::<Value>(fm_str)?,
        FrontmatterFormat::Toml => toml_to_json(toml::from_str::<toml::Value>(fm_str)?),
    };

    let attributes = match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(CoreError::frontmatter(format!(
                "expected a key/value mapping, found {}",
                json_kind(&other)
            )));
        }
    };

    Ok(ExtractedAttributes {
        attributes,
        body: body.to_string(),
    })
}

/// Convert a TOML value to JSON, rendering datetimes as their TOML text.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Attribute extractor reading YAML or TOML frontmatter.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrontmatterExtractor;

impl AttributeExtractor for FrontmatterExtractor {
    fn extract(&self, content: &str) -> std::result::Result<ExtractedAttributes, BoxError> {
        Ok(parse_attributes(content)?)
    }
}
