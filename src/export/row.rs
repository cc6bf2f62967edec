//! Projection of search hits onto the fixed output columns

use serde_json::Value;

/// One output record, always exactly as wide as the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedRow {
    values: Vec<String>,
}

impl ProjectedRow {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Projects hits onto hit-level system fields followed by `_source` fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowProjector {
    system_fields: Vec<String>,
    source_fields: Vec<String>,
}

impl RowProjector {
    pub fn new(system_fields: Vec<String>, source_fields: Vec<String>) -> Self {
        Self {
            system_fields,
            source_fields,
        }
    }

    /// Column names in output order
    pub fn header(&self) -> Vec<String> {
        self.system_fields
            .iter()
            .chain(&self.source_fields)
            .cloned()
            .collect()
    }

    pub fn width(&self) -> usize {
        self.system_fields.len() + self.source_fields.len()
    }

    /// Project a single hit; absent fields become empty strings
    pub fn project(&self, hit: &Value) -> ProjectedRow {
        let mut values = Vec::with_capacity(self.width());

        for field in &self.system_fields {
            values.push(render_value(hit.get(field)));
        }

        let source = hit.get("_source");
        for field in &self.source_fields {
            values.push(render_value(source.and_then(|s| s.get(field))));
        }

        ProjectedRow::new(values)
    }
}

/// Render a JSON value as a CSV cell
///
/// Strings are written verbatim, `null` and missing values as empty strings,
/// numbers and booleans by their JSON text, arrays and objects as compact JSON.
pub fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn projector() -> RowProjector {
        RowProjector::new(
            vec!["_id".into()],
            vec!["subject".into(), "size".into(), "to".into()],
        )
    }

    #[test]
    fn test_header_order() {
        assert_eq!(projector().header(), ["_id", "subject", "size", "to"]);
        assert_eq!(projector().width(), 4);
    }

    #[test]
    fn test_project_full_hit() {
        let hit = json!({
            "_id": "abc",
            "_source": {"subject": "hello", "size": 120, "to": ["a@x", "b@x"], "ignored": true}
        });
        let row = projector().project(&hit);
        assert_eq!(row.values(), ["abc", "hello", "120", r#"["a@x","b@x"]"#]);
    }

    #[test]
    fn test_missing_fields_keep_width() {
        let hit = json!({"_id": "abc", "_source": {"subject": null}});
        let row = projector().project(&hit);
        assert_eq!(row.len(), 4);
        assert_eq!(row.values(), ["abc", "", "", ""]);

        let bare = json!({});
        assert_eq!(projector().project(&bare).values(), ["", "", "", ""]);
    }

    #[test]
    fn test_render_scalars() {
        assert_eq!(render_value(Some(&json!(true))), "true");
        assert_eq!(render_value(Some(&json!(1.5))), "1.5");
        assert_eq!(render_value(Some(&json!({"k": 1}))), r#"{"k":1}"#);
        assert_eq!(render_value(None), "");
    }

    #[test]
    fn test_empty_projector() {
        let empty = RowProjector::new(Vec::new(), Vec::new());
        assert_eq!(empty.width(), 0);
        assert!(empty.project(&json!({"_id": "x"})).is_empty());
    }
}
