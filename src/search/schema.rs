//! Expected index definition and schema comparison.
//!
//! Types serialize to the Azure Search REST representation. Properties the
//! service adds on its side (etag, scoring profiles, analyzers left null) are
//! ignored on deserialization so they never count as drift.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Azure Search EDM type names used by the document index.
pub mod edm {
    pub const STRING: &str = "Edm.String";
    pub const STRING_COLLECTION: &str = "Collection(Edm.String)";
    pub const DATE_TIME_OFFSET: &str = "Edm.DateTimeOffset";
}

/// A single field in an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub key: bool,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub facetable: bool,
    #[serde(default = "default_true")]
    pub retrievable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
}

fn default_true() -> bool {
    true
}

impl IndexField {
    fn new(name: &str, field_type: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: field_type.to_string(),
            key: false,
            searchable: false,
            filterable: false,
            sortable: false,
            facetable: false,
            retrievable: true,
            analyzer: None,
        }
    }

    fn key(mut self) -> Self {
        self.key = true;
        self.filterable = true;
        self
    }

    fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    fn facetable(mut self) -> Self {
        self.facetable = true;
        self
    }

    fn analyzer(mut self, analyzer: &str) -> Self {
        self.analyzer = Some(analyzer.to_string());
        self
    }
}

/// Autocomplete suggester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggester {
    pub name: String,
    pub search_mode: String,
    pub source_fields: Vec<String>,
}

/// Index schema as exchanged with the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition {
    pub name: String,
    pub fields: Vec<IndexField>,
    #[serde(default)]
    pub suggesters: Vec<Suggester>,
}

impl IndexDefinition {
    /// Differences between `self` (expected) and `remote`, one entry per drift.
    ///
    /// Field order is irrelevant. An empty result means the schemas match.
    pub fn diff(&self, remote: &IndexDefinition) -> Vec<String> {
        let mut drift = Vec::new();

        if !self.name.eq_ignore_ascii_case(&remote.name) {
            drift.push(format!("index name {} != {}", remote.name, self.name));
        }

        let expected: BTreeMap<&str, &IndexField> =
            self.fields.iter().map(|f| (f.name.as_str(), f)).collect();
        let actual: BTreeMap<&str, &IndexField> =
            remote.fields.iter().map(|f| (f.name.as_str(), f)).collect();

        for (name, field) in &expected {
            match actual.get(name) {
                None => drift.push(format!("missing field {}", name)),
                Some(remote_field) if remote_field != field => {
                    drift.push(format!("field {} differs", name))
                }
                Some(_) => {}
            }
        }
        for name in actual.keys() {
            if !expected.contains_key(name) {
                drift.push(format!("unexpected field {}", name));
            }
        }

        let expected_suggesters: BTreeMap<&str, &Suggester> =
            self.suggesters.iter().map(|s| (s.name.as_str(), s)).collect();
        let actual_suggesters: BTreeMap<&str, &Suggester> =
            remote.suggesters.iter().map(|s| (s.name.as_str(), s)).collect();
        if expected_suggesters != actual_suggesters {
            drift.push("suggesters differ".to_string());
        }

        drift
    }

    pub fn matches(&self, remote: &IndexDefinition) -> bool {
        self.diff(remote).is_empty()
    }
}

/// The documentation-search index this service expects.
pub fn expected_index(name: &str) -> IndexDefinition {
    IndexDefinition {
        name: name.to_string(),
        fields: vec![
            IndexField::new("id", edm::STRING).key(),
            IndexField::new("projectId", edm::STRING).filterable().facetable(),
            IndexField::new("projectName", edm::STRING).searchable().sortable(),
            IndexField::new("branchName", edm::STRING).filterable().facetable(),
            IndexField::new("url", edm::STRING),
            IndexField::new("title", edm::STRING)
                .searchable()
                .sortable()
                .analyzer("en.microsoft"),
            IndexField::new("content", edm::STRING)
                .searchable()
                .analyzer("en.microsoft"),
            IndexField::new("tags", edm::STRING_COLLECTION)
                .searchable()
                .filterable()
                .facetable(),
            IndexField::new("indexedAt", edm::DATE_TIME_OFFSET)
                .filterable()
                .sortable(),
        ],
        suggesters: vec![Suggester {
            name: "titles".to_string(),
            search_mode: "analyzingInfixMatching".to_string(),
            source_fields: vec!["title".to_string()],
        }],
    }
}
