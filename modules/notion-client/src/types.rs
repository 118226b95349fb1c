use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A database row as returned by `POST /v1/databases/{id}/query`.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, PropertyValue>,
}

impl Page {
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }
}

/// A single page property. Only the property types this workspace reads are
/// modelled; everything else collapses into `Unsupported`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Checkbox {
        checkbox: bool,
    },
    Title {
        title: Vec<RichText>,
    },
    RichText {
        rich_text: Vec<RichText>,
    },
    MultiSelect {
        multi_select: Vec<SelectOption>,
    },
    Files {
        files: Vec<FileObject>,
    },
    Url {
        url: Option<String>,
    },
    Date {
        date: Option<DateValue>,
    },
    Relation {
        relation: Vec<RelationRef>,
    },
    #[serde(other)]
    Unsupported,
}

impl PropertyValue {
    /// The Notion type name, used in schema error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Checkbox { .. } => "checkbox",
            Self::Title { .. } => "title",
            Self::RichText { .. } => "rich_text",
            Self::MultiSelect { .. } => "multi_select",
            Self::Files { .. } => "files",
            Self::Url { .. } => "url",
            Self::Date { .. } => "date",
            Self::Relation { .. } => "relation",
            Self::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectOption {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateValue {
    pub start: String,
    pub end: Option<String>,
}

/// Notion-hosted uploads carry a signed, expiring URL; external files carry
/// whatever link the editor pasted.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileObject {
    File {
        #[serde(default)]
        name: String,
        file: FileLink,
    },
    External {
        #[serde(default)]
        name: String,
        external: FileLink,
    },
}

impl FileObject {
    pub fn url(&self) -> &str {
        match self {
            Self::File { file, .. } => &file.url,
            Self::External { external, .. } => &external.url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileLink {
    pub url: String,
}

/// Body for a database query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<&'a str>,
}

/// One page of query results.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_properties_deserialize_by_type() {
        let page: Page = serde_json::from_value(json!({
            "object": "page",
            "id": "abc",
            "properties": {
                "Lifetime": { "id": "x1", "type": "checkbox", "checkbox": true },
                "Name": { "id": "title", "type": "title", "title": [{ "plain_text": "Ada" }] },
                "Services": { "id": "x2", "type": "multi_select", "multi_select": [{ "id": "o", "name": "Dinner", "color": "red" }] },
                "Website": { "id": "x3", "type": "url", "url": null },
                "Retirement": { "id": "x4", "type": "date", "date": { "start": "2030-01-01", "end": null } },
                "Score": { "id": "x5", "type": "formula", "formula": { "type": "number", "number": 3 } }
            }
        }))
        .unwrap();

        assert!(matches!(page.property("Lifetime"), Some(PropertyValue::Checkbox { checkbox: true })));
        assert!(matches!(page.property("Website"), Some(PropertyValue::Url { url: None })));
        assert!(matches!(page.property("Score"), Some(PropertyValue::Unsupported)));
        match page.property("Services") {
            Some(PropertyValue::MultiSelect { multi_select }) => assert_eq!(multi_select[0].name, "Dinner"),
            other => panic!("unexpected {other:?}"),
        }
        match page.property("Retirement") {
            Some(PropertyValue::Date { date: Some(d) }) => assert_eq!(d.start, "2030-01-01"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn file_objects_expose_url_for_both_variants() {
        let files: Vec<FileObject> = serde_json::from_value(json!([
            { "name": "a.png", "type": "file", "file": { "url": "https://s3/a.png", "expiry_time": "2030-01-01T00:00:00.000Z" } },
            { "name": "b.png", "type": "external", "external": { "url": "https://cdn/b.png" } }
        ]))
        .unwrap();

        assert_eq!(files[0].url(), "https://s3/a.png");
        assert_eq!(files[1].url(), "https://cdn/b.png");
    }

    #[test]
    fn query_request_omits_cursor_on_first_page() {
        let first = serde_json::to_value(QueryRequest { page_size: 100, start_cursor: None }).unwrap();
        assert_eq!(first, json!({ "page_size": 100 }));

        let next = serde_json::to_value(QueryRequest { page_size: 100, start_cursor: Some("c1") }).unwrap();
        assert_eq!(next, json!({ "page_size": 100, "start_cursor": "c1" }));
    }
}
