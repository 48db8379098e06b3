//! Upstream entity description and the metadata builder.
//!
//! The entity-lookup service hands us a raw dataset description; the
//! metadata builder flattens it into the [`Record`] the rule chain
//! classifies. Missing fields are simply absent from the record (the chain
//! resolves them to null), so nothing here validates the entity beyond
//! shape.

use serde::Deserialize;

use crate::value::{Record, Value};

/// Raw dataset/publication description from the entity service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub creation_action: Option<String>,
    /// Legacy convention for derived datasets.
    #[serde(default)]
    pub data_types: Option<Vec<String>>,
    /// Current convention: `__`-delimited dataset info string.
    #[serde(default)]
    pub dataset_info: Option<String>,
    #[serde(default)]
    pub ingest_metadata: Option<IngestMetadata>,
}

/// Metadata ingested during dataset reorganization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestMetadata {
    #[serde(default)]
    pub metadata: Option<Record>,
    #[serde(default)]
    pub dag_provenance_list: Vec<DagProvenance>,
}

/// One pipeline provenance entry; flattened to `origin:name` for the rules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DagProvenance {
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Entity {
    /// Deserialize an entity from arbitrary JSON data.
    pub fn from_json(json: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(json)
    }
}

/// Compute the `data_types` list a derived dataset is matched on.
///
/// Two legacy conventions, in order of precedence: an explicit `data_types`
/// list that is non-empty and not all blank, then the first `__`-delimited
/// segment of `dataset_info`. Falls back to a single empty string.
pub fn calculate_data_types(entity: &Entity) -> Vec<String> {
    if let Some(data_types) = &entity.data_types {
        if !data_types.is_empty() && data_types.iter().any(|s| !s.is_empty()) {
            return data_types.clone();
        }
    }
    if let Some(info) = &entity.dataset_info {
        if !info.is_empty() {
            let first = info.split("__").next().unwrap_or_default();
            return vec![first.to_string()];
        }
    }
    vec![String::new()]
}

/// Build the metadata record the rule chain classifies.
///
/// Primary datasets carry their ingested metadata verbatim; derived datasets
/// (no ingested metadata) get a computed `data_types` list instead.
/// Publications always get computed `data_types`, even when ingested
/// metadata is present. `entity_type`, `dag_provenance_list`, and
/// `creation_action` are always set.
pub fn build_entity_metadata(entity: &Entity) -> Record {
    let mut metadata = Record::new();
    let mut dag_provenance = Vec::new();

    if let Some(ingest) = &entity.ingest_metadata {
        if let Some(ingested) = &ingest.metadata {
            metadata = ingested.clone();
        } else {
            metadata.insert("data_types".to_string(), data_types_value(entity));
        }

        dag_provenance = ingest
            .dag_provenance_list
            .iter()
            .filter_map(|entry| match (&entry.origin, &entry.name) {
                (Some(origin), Some(name)) => Some(Value::Str(format!("{}:{}", origin, name))),
                _ => None,
            })
            .collect();

        // Primary publications have ingested metadata, so the data_types
        // association has to happen here as well.
        if entity.entity_type.as_deref() == Some("Publication") {
            metadata.insert("data_types".to_string(), data_types_value(entity));
        }
    } else {
        metadata.insert("data_types".to_string(), data_types_value(entity));
    }

    metadata.insert(
        "entity_type".to_string(),
        option_str(entity.entity_type.as_deref()),
    );
    metadata.insert(
        "dag_provenance_list".to_string(),
        Value::List(dag_provenance),
    );
    metadata.insert(
        "creation_action".to_string(),
        option_str(entity.creation_action.as_deref()),
    );

    metadata
}

fn data_types_value(entity: &Entity) -> Value {
    Value::List(
        calculate_data_types(entity)
            .into_iter()
            .map(Value::Str)
            .collect(),
    )
}

fn option_str(s: Option<&str>) -> Value {
    match s {
        Some(s) => Value::from(s),
        None => Value::Null,
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(json: serde_json::Value) -> Entity {
        Entity::from_json(json).unwrap()
    }

    #[test]
    fn data_types_field_wins_when_populated() {
        let e = entity(json!({
            "entity_type": "Dataset",
            "data_types": ["codex_cytokit"],
            "dataset_info": "salmon_rnaseq__extra"
        }));
        assert_eq!(calculate_data_types(&e), vec!["codex_cytokit"]);
    }

    #[test]
    fn all_blank_data_types_fall_through_to_dataset_info() {
        let e = entity(json!({
            "data_types": [""],
            "dataset_info": "salmon_rnaseq__v2__details"
        }));
        assert_eq!(calculate_data_types(&e), vec!["salmon_rnaseq"]);
    }

    #[test]
    fn no_convention_yields_single_blank() {
        let e = entity(json!({"entity_type": "Dataset"}));
        assert_eq!(calculate_data_types(&e), vec![""]);
    }

    #[test]
    fn primary_dataset_uses_ingested_metadata() {
        let e = entity(json!({
            "entity_type": "Dataset",
            "creation_action": "Create Dataset Activity",
            "ingest_metadata": {
                "metadata": {"assay_type": "CODEX", "version": "2"},
                "dag_provenance_list": [
                    {"origin": "github.com/org/repo", "name": "codex.cwl"},
                    {"origin": "github.com/org/repo"}
                ]
            }
        }));

        let record = build_entity_metadata(&e);
        assert_eq!(record["assay_type"], Value::from("CODEX"));
        assert_eq!(record["entity_type"], Value::from("Dataset"));
        assert_eq!(record["creation_action"], Value::from("Create Dataset Activity"));
        // Incomplete provenance entries are skipped.
        assert_eq!(
            record["dag_provenance_list"],
            Value::List(vec![Value::from("github.com/org/repo:codex.cwl")])
        );
        assert!(!record.contains_key("data_types"));
    }

    #[test]
    fn derived_dataset_gets_computed_data_types() {
        let e = entity(json!({
            "entity_type": "Dataset",
            "dataset_info": "salmon_rnaseq__pipeline"
        }));

        let record = build_entity_metadata(&e);
        assert_eq!(
            record["data_types"],
            Value::List(vec![Value::from("salmon_rnaseq")])
        );
        assert_eq!(record["dag_provenance_list"], Value::List(vec![]));
    }

    #[test]
    fn publication_overrides_ingested_data_types() {
        let e = entity(json!({
            "entity_type": "Publication",
            "data_types": ["publication"],
            "ingest_metadata": {
                "metadata": {"title": "Atlas paper"}
            }
        }));

        let record = build_entity_metadata(&e);
        assert_eq!(record["title"], Value::from("Atlas paper"));
        assert_eq!(
            record["data_types"],
            Value::List(vec![Value::from("publication")])
        );
    }

    #[test]
    fn missing_entity_fields_become_null() {
        let record = build_entity_metadata(&Entity::default());
        assert_eq!(record["entity_type"], Value::Null);
        assert_eq!(record["creation_action"], Value::Null);
    }
}
