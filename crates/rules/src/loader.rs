//! Rule document loader: bytes in, validated [`RuleChain`] out.
//!
//! Two-pass deserialization: first the whole document into generic JSON
//! data (YAML documents go through `serde_yaml`), then each entry into a
//! [`RuleSpec`] so failures carry the offending entry index. Loading is
//! all-or-nothing; no partial chain is ever returned.

use tracing::{debug, info};

use crate::chain::{Rule, RuleChain};
use crate::error::RuleSyntaxError;
use crate::schema::{RuleFormat, RuleSpec};

/// Parses and validates a rule document into a chain.
pub struct RuleLoader<'a> {
    bytes: &'a [u8],
    format: RuleFormat,
}

impl<'a> RuleLoader<'a> {
    pub fn new(bytes: &'a [u8], format: RuleFormat) -> Self {
        Self { bytes, format }
    }

    /// Load the chain, preserving document order.
    pub fn load(&self) -> Result<RuleChain, RuleSyntaxError> {
        // First pass: the whole document as generic data.
        let document: serde_json::Value = match self.format {
            RuleFormat::Yaml => {
                serde_yaml::from_slice(self.bytes).map_err(|e| RuleSyntaxError::Parse {
                    format: self.format,
                    detail: e.to_string(),
                })?
            }
            RuleFormat::Json => {
                serde_json::from_slice(self.bytes).map_err(|e| RuleSyntaxError::Parse {
                    format: self.format,
                    detail: e.to_string(),
                })?
            }
        };

        let entries = document
            .as_array()
            .ok_or_else(|| RuleSyntaxError::NotAList(json_type_name(&document)))?;

        // Second pass: entry by entry, so errors name the entry.
        let mut rules = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let spec: RuleSpec = serde_json::from_value(entry.clone())
                .map_err(|e| RuleSyntaxError::Entry {
                    index,
                    detail: e.to_string(),
                })?;
            let rule = Rule::compile(index, &spec)?;
            debug!(index, kind = %rule.kind, "compiled rule");
            rules.push(rule);
        }

        info!(rules = rules.len(), format = %self.format, "loaded rule chain");
        Ok(RuleChain::new(rules))
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "record",
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RuleKind;

    const GOOD_YAML: &str = r#"
- type: note
  match: metadata_schema_id == null
  value: "{'not_dcwg': true, 'is_dcwg': false}"
  rule_description: Preamble rule identifying non-DCWG
- type: match
  match: not_dcwg and assay_type == 'CODEX'
  value: "{'assaytype': 'CODEX', 'primary': true}"
"#;

    #[test]
    fn loads_yaml_preserving_order() {
        let chain = RuleLoader::new(GOOD_YAML.as_bytes(), RuleFormat::Yaml)
            .load()
            .unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.rules()[0].kind, RuleKind::Note);
        assert_eq!(chain.rules()[1].kind, RuleKind::Match);
        assert_eq!(
            chain.rules()[0].label(),
            "Preamble rule identifying non-DCWG"
        );
    }

    #[test]
    fn loads_json_document() {
        let json = r#"[
            {"type": "MATCH", "match": "true", "value": "{'assaytype': 'X'}"}
        ]"#;
        let chain = RuleLoader::new(json.as_bytes(), RuleFormat::Json)
            .load()
            .unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.rules()[0].kind, RuleKind::Match);
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = RuleLoader::new(b"{ not yaml: [", RuleFormat::Yaml)
            .load()
            .unwrap_err();
        assert!(matches!(err, RuleSyntaxError::Parse { .. }));

        let err = RuleLoader::new(b"not json", RuleFormat::Json)
            .load()
            .unwrap_err();
        assert!(matches!(err, RuleSyntaxError::Parse { .. }));
    }

    #[test]
    fn non_list_document_is_rejected() {
        let err = RuleLoader::new(b"type: match", RuleFormat::Yaml)
            .load()
            .unwrap_err();
        assert!(matches!(err, RuleSyntaxError::NotAList("record")));
    }

    #[test]
    fn schema_violation_names_the_entry() {
        // Second entry is missing its `value` field.
        let yaml = r#"
- type: match
  match: "true"
  value: "{}"
- type: match
  match: "true"
"#;
        let err = RuleLoader::new(yaml.as_bytes(), RuleFormat::Yaml)
            .load()
            .unwrap_err();
        match err {
            RuleSyntaxError::Entry { index, .. } => assert_eq!(index, 1),
            other => panic!("expected entry error, got {}", other),
        }
    }

    #[test]
    fn unknown_rule_type_fails_loading() {
        let yaml = r#"
- type: bogus
  match: "true"
  value: "{}"
"#;
        let err = RuleLoader::new(yaml.as_bytes(), RuleFormat::Yaml)
            .load()
            .unwrap_err();
        match err {
            RuleSyntaxError::UnknownKind { index, kind } => {
                assert_eq!(index, 0);
                assert_eq!(kind, "bogus");
            }
            other => panic!("expected unknown-kind error, got {}", other),
        }
    }

    #[test]
    fn unparsable_expression_fails_loading_with_field() {
        let yaml = r#"
- type: match
  match: "assay_type == "
  value: "{}"
"#;
        let err = RuleLoader::new(yaml.as_bytes(), RuleFormat::Yaml)
            .load()
            .unwrap_err();
        match err {
            RuleSyntaxError::Expression { index, field, .. } => {
                assert_eq!(index, 0);
                assert_eq!(field, "match");
            }
            other => panic!("expected expression error, got {}", other),
        }
    }

    #[test]
    fn loading_is_all_or_nothing() {
        // First entry is fine; the bad second entry still fails the load.
        let yaml = r#"
- type: match
  match: "true"
  value: "{'assaytype': 'X'}"
- type: note
  match: "true"
  value: "][ not an expression"
"#;
        assert!(RuleLoader::new(yaml.as_bytes(), RuleFormat::Yaml)
            .load()
            .is_err());
    }
}
