//! Coercion of raw completion text into the payload the caller asked for.
//!
//! Completion services often wrap their answer in a markdown code fence
//! (three backticks plus a language tag). [`strip_fence`] removes at most one
//! opening and one closing marker; [`parse_field_schema`] then turns the
//! remaining text into a validated [`FieldSchema`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{Result, WizardError};
use crate::schemas::{FieldSchema, FieldSpec};

/// Payload the completion was asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceKind {
    Json,
    Html,
}

impl FenceKind {
    pub fn tag(self) -> &'static str {
        match self {
            FenceKind::Json => "json",
            FenceKind::Html => "html",
        }
    }
}

/// Opening marker: backticks, then a language tag that must end its line.
static OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*```(?:([\w+.#-]+)[ \t]*(?:\r?\n|$))?\s*").unwrap());
static CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```\s*$").unwrap());

/// Remove one leading fence marker and one trailing marker, if present.
///
/// The whole opening marker goes, whatever its tag; a tag other than
/// `kind`'s is only logged. Purely textual: the remainder is not checked
/// for well-formedness.
pub fn strip_fence(raw: &str, kind: FenceKind) -> String {
    let body = match OPEN.captures(raw) {
        Some(caps) => {
            if let Some(tag) = caps.get(1)
                && !tag.as_str().eq_ignore_ascii_case(kind.tag())
            {
                tracing::debug!(expected = kind.tag(), found = tag.as_str(), "unexpected fence tag");
            }
            &raw[caps.get(0).map_or(0, |m| m.end())..]
        }
        None => raw,
    };
    CLOSE.replace(body, "").into_owned()
}

/// Parse normalized completion text as a field list.
///
/// The top-level value must be an array whose elements are objects carrying
/// a non-empty string `name`; a string `type` is kept as an open tag and any
/// other `type` reads as undefined.
pub fn parse_field_schema(text: &str) -> Result<FieldSchema> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        WizardError::format(format!("field list is not valid JSON: {}", e))
    })?;

    let Value::Array(items) = value else {
        return Err(WizardError::format("field list is not an array"));
    };

    let mut fields = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let spec: FieldSpec = serde_json::from_value(item).map_err(|e| {
            WizardError::format(format!("field {} is malformed: {}", index, e))
        })?;
        if spec.name.trim().is_empty() {
            return Err(WizardError::format(format!("field {} has an empty name", index)));
        }
        fields.push(spec);
    }

    Ok(FieldSchema::new(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::FieldKind;

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n[{\"name\":\"Client\",\"type\":\"text\"}]\n```";
        assert_eq!(
            strip_fence(raw, FenceKind::Json),
            "[{\"name\":\"Client\",\"type\":\"text\"}]"
        );
    }

    #[test]
    fn strips_bare_fence_and_surrounding_whitespace() {
        let raw = "\n```\n<h1>Invoice</h1>\n```  \n";
        assert_eq!(strip_fence(raw, FenceKind::Html), "<h1>Invoice</h1>");
    }

    #[test]
    fn tag_match_is_case_insensitive() {
        assert_eq!(strip_fence("```HTML\n<p>x</p>\n```", FenceKind::Html), "<p>x</p>");
    }

    #[test]
    fn other_tags_are_removed_whole() {
        assert_eq!(strip_fence("```html\n<p>x</p>\n```", FenceKind::Json), "<p>x</p>");
        for tag in ["javascript", "jsonc", "JSON5"] {
            let raw = format!("```{}\n[{{\"name\":\"A\"}}]\n```", tag);
            let schema = parse_field_schema(&strip_fence(&raw, FenceKind::Json)).unwrap();
            assert_eq!(schema.fields()[0].name, "A", "{tag}");
        }
    }

    #[test]
    fn untagged_fence_keeps_payload_on_same_line() {
        assert_eq!(strip_fence("```[]```", FenceKind::Json), "[]");
        assert_eq!(strip_fence("```<h1>Invoice</h1>\n```", FenceKind::Html), "<h1>Invoice</h1>");
    }

    #[test]
    fn unfenced_text_is_unchanged() {
        let raw = "  <h1>Invoice</h1>\n<p>Total</p>\n";
        assert_eq!(strip_fence(raw, FenceKind::Html), raw);
        assert_eq!(strip_fence("[]", FenceKind::Json), "[]");
    }

    #[test]
    fn removes_only_one_marker_each_side() {
        let raw = "```json\n```json\n[]\n```\n```";
        assert_eq!(strip_fence(raw, FenceKind::Json), "```json\n[]\n```");
    }

    #[test]
    fn inner_fences_survive() {
        let raw = "```html\n<pre>```code```</pre>\n```";
        assert_eq!(strip_fence(raw, FenceKind::Html), "<pre>```code```</pre>");
    }

    #[test]
    fn parses_fenced_field_list() {
        let raw = "```json\n[{\"name\":\"Client\",\"type\":\"text\"},{\"name\":\"Date\",\"type\":\"date\"}]\n```";
        let schema = parse_field_schema(&strip_fence(raw, FenceKind::Json)).unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.fields()[0].name, "Client");
        assert_eq!(schema.fields()[1].kind, Some(FieldKind::Date));
    }

    #[test]
    fn missing_type_is_kept_undefined() {
        let schema = parse_field_schema(r#"[{"name":"Notes"}]"#).unwrap();
        assert_eq!(schema.fields()[0].kind, None);
    }

    #[test]
    fn non_string_type_is_kept_undefined() {
        let schema = parse_field_schema(
            r#"[{"name":"Amount","type":5},{"name":"Paid","type":true},{"name":"Ref","type":{"k":1}},{"name":"Due","type":null}]"#,
        )
        .unwrap();
        assert_eq!(schema.len(), 4);
        assert!(schema.fields().iter().all(|f| f.kind.is_none()));
    }

    #[test]
    fn malformed_json_is_format_error() {
        let err = parse_field_schema("[{\"name\":").unwrap_err();
        assert!(matches!(err, WizardError::Format { .. }));
    }

    #[test]
    fn non_array_is_format_error() {
        for text in [r#"{"name":"Client"}"#, "42", "\"fields\"", "null"] {
            let err = parse_field_schema(text).unwrap_err();
            assert!(matches!(err, WizardError::Format { .. }), "{text}");
        }
    }

    #[test]
    fn element_without_name_is_format_error() {
        for text in [r#"[{"type":"text"}]"#, r#"["Client"]"#, r#"[{"name":"  "}]"#] {
            let err = parse_field_schema(text).unwrap_err();
            assert!(matches!(err, WizardError::Format { .. }), "{text}");
        }
    }

    #[test]
    fn empty_array_is_an_empty_schema() {
        assert!(parse_field_schema("[]").unwrap().is_empty());
    }
}
