//! Query compilation
//!
//! Turns a user-authored search body into a [`QueryPlan`]: the body with the
//! slicing, paging and sort keys the export depends on, plus the list of
//! `_source` fields to project. Callers should know that `slice`, `size` and
//! `sort` are always overwritten.

use std::path::Path;

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::dialect::EngineDialect;
use crate::error::{ConfigError, ExportError, Result};

/// Sort key giving the cheapest stable order for scrolling
pub const DOC_ORDER_SORT: &str = "_doc";

/// Term-filter field used to emulate document types on typeless engines
pub const DOC_TYPE_FIELD: &str = "doc_type";

/// Parameters the compiler fixes on every plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileSettings {
    /// Number of slices
    pub partitions: u32,
    /// Page size
    pub batch_size: u32,
    /// Document type to filter on (7.x)
    pub doc_type: String,
}

/// A compiled, slice-ready search body
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    body: Map<String, Value>,
    source_fields: Vec<String>,
    partitions: u32,
}

impl QueryPlan {
    /// The compiled body, with `slice.id` still unset (-1)
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// `_source` fields in declared order
    pub fn source_fields(&self) -> &[String] {
        &self.source_fields
    }

    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    /// Deep copy of the body with this partition's slice id filled in
    ///
    /// Single-partition plans carry no `slice` and are returned unchanged.
    pub fn body_for_partition(&self, partition: u32) -> Value {
        let mut body = self.body.clone();
        if let Some(Value::Object(slice)) = body.get_mut("slice") {
            slice.insert("id".to_string(), json!(partition));
        }
        Value::Object(body)
    }
}

/// Read and parse a query document
///
/// # Returns
/// * `Result<Value>` - Parsed JSON; I/O errors and malformed JSON are reported separately
pub fn load_query_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            ExportError::Config(ConfigError::FileNotFound(path.display().to_string()))
        }
        _ => ExportError::Io(e),
    })?;

    serde_json::from_str(&content).map_err(|e| {
        ConfigError::InvalidFormat(format!("{}: {}", path.display(), e)).into()
    })
}

/// Compile a raw query document for the detected dialect
///
/// # Arguments
/// * `raw` - User query document (must be a JSON object)
/// * `dialect` - Detected engine dialect
/// * `settings` - Slice count, page size and document type
///
/// # Returns
/// * `Result<QueryPlan>` - Compiled plan or a configuration error
pub fn compile(raw: Value, dialect: EngineDialect, settings: &CompileSettings) -> Result<QueryPlan> {
    if settings.partitions == 0 {
        return Err(invalid_setting("partitions", settings.partitions));
    }
    if settings.batch_size == 0 {
        return Err(invalid_setting("batch_size", settings.batch_size));
    }

    let Value::Object(mut body) = raw else {
        return Err(invalid_query("query document must be a JSON object"));
    };

    // Pagination keys are owned by the exporter.
    if settings.partitions > 1 {
        body.insert(
            "slice".to_string(),
            json!({"id": -1, "max": settings.partitions}),
        );
    } else {
        // The engine rejects `slice.max` below 2.
        body.remove("slice");
    }
    body.insert("size".to_string(), json!(settings.batch_size));
    body.insert("sort".to_string(), json!([DOC_ORDER_SORT]));

    if dialect.requires_track_total_hits() {
        body.insert("track_total_hits".to_string(), Value::Bool(true));
    }

    if dialect.requires_type_filter() {
        inject_type_filter(&mut body, &settings.doc_type)?;
    }

    let source_fields = extract_source_fields(&body)?;
    let compiled = Value::Object(body.clone());
    debug!("Compiled query body: {}", compiled);

    Ok(QueryPlan {
        body,
        source_fields,
        partitions: settings.partitions,
    })
}

/// Append the `doc_type` term filter to `query.bool.filter`
fn inject_type_filter(body: &mut Map<String, Value>, doc_type: &str) -> Result<()> {
    let query = body
        .get_mut("query")
        .ok_or_else(|| invalid_query("JSON query is missing the \"query\" field"))?;

    let bool_query = query
        .get_mut("bool")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| invalid_query("JSON query is missing the \"bool\" field"))?;

    let type_filter = json!({"term": {DOC_TYPE_FIELD: doc_type}});
    let filter = bool_query
        .entry("filter")
        .or_insert_with(|| Value::Array(Vec::new()));

    if filter.is_object() {
        let single = filter.take();
        *filter = Value::Array(vec![single]);
    }

    match filter.as_array_mut() {
        Some(clauses) => {
            clauses.push(type_filter);
            Ok(())
        }
        None => Err(invalid_query("\"query.bool.filter\" must be an array or an object")),
    }
}

/// Field names from `_source.includes`, or the `_source` array shorthand
fn extract_source_fields(body: &Map<String, Value>) -> Result<Vec<String>> {
    let includes = match body.get("_source") {
        Some(Value::Object(source)) => source.get("includes"),
        Some(list @ Value::Array(_)) => Some(list),
        _ => None,
    };

    let Some(includes) = includes else {
        return Ok(Vec::new());
    };

    let Value::Array(items) = includes else {
        return Err(invalid_query("\"_source.includes\" must be a list of field names"));
    };

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_owned)
                .ok_or_else(|| invalid_query(&format!("non-string field name in _source: {item}")))
        })
        .collect()
}

fn invalid_query(msg: &str) -> ExportError {
    ConfigError::InvalidQuery(msg.to_string()).into()
}

fn invalid_setting(field: &str, value: u32) -> ExportError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}
