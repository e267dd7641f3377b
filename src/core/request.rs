//! Request data shared by every form request of an invocation
//!
//! [`RequestSnapshot`] is the immutable copy of the inbound request that the
//! route middleware captures once. Each form request instance builds its own
//! [`InputData`] from it, so sibling instances constructed by the coordinator
//! see exactly the same query, body, files, headers and cookies.

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Mutable JSON object with dotted-path access
///
/// Paths use `.` as separator; numeric segments index into arrays and `*`
/// matches every element of an array or object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputData(Map<String, Value>);

impl InputData {
    /// Create empty input
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build input from a JSON value, `None` unless the value is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = step(current, segment)?;
        }
        Some(current)
    }

    /// Check whether a dotted path is present (null counts as present)
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Set a value by dotted path, creating intermediate objects
    pub fn set(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        set_in_map(&mut self.0, &segments, value);
    }

    /// Remove a value by dotted path
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        match path.rsplit_once('.') {
            None => self.0.remove(path),
            Some((parent, key)) => {
                let segments: Vec<&str> = parent.split('.').collect();
                let (head, rest) = segments.split_first()?;
                let mut current = self.0.get_mut(*head)?;
                for segment in rest {
                    current = step_mut(current, segment)?;
                }
                match current {
                    Value::Object(map) => map.remove(key),
                    _ => None,
                }
            }
        }
    }

    /// Keep only the given paths
    ///
    /// Nested paths keep their parents; `*` segments keep the array shape so
    /// that element positions stay stable. An index segment keeps only that
    /// element, with `null` in the slots before it.
    pub fn only<I, S>(&self, paths: I) -> InputData
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let root = Value::Object(self.0.clone());
        let mut projected = Value::Object(Map::new());
        for path in paths {
            let segments: Vec<&str> = path.as_ref().split('.').collect();
            if let Some(value) = project(&root, &segments) {
                overlay(&mut projected, value);
            }
        }
        match projected {
            Value::Object(map) => Self(map),
            _ => Self::new(),
        }
    }

    /// Merge another input into this one, recursively; `other` wins on leaves
    pub fn merge(&mut self, other: InputData) {
        for (key, value) in other.0 {
            match self.0.get_mut(&key) {
                Some(existing) => merge_values(existing, value),
                None => {
                    self.0.insert(key, value);
                }
            }
        }
    }

    /// Expand a wildcard path into the concrete paths present in the data
    ///
    /// A pattern without `*`, or one that matches nothing, is returned as is.
    pub fn expand(&self, pattern: &str) -> Vec<String> {
        if !pattern.split('.').any(|s| s == "*") {
            return vec![pattern.to_string()];
        }
        let root = Value::Object(self.0.clone());
        let segments: Vec<&str> = pattern.split('.').collect();
        let mut paths = Vec::new();
        expand_into(Some(&root), &segments, String::new(), &mut paths);
        if paths.is_empty() {
            paths.push(pattern.to_string());
        }
        paths
    }

    /// Top-level keys
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying JSON object
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert into a JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for InputData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn step_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn set_in_map(map: &mut Map<String, Value>, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.insert(head.to_string(), value);
        return;
    }
    let entry = map
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    set_in_value(entry, rest, value);
}

fn set_in_value(target: &mut Value, segments: &[&str], value: Value) {
    if let Value::Array(items) = target {
        if let Some((head, rest)) = segments.split_first() {
            if let Some(slot) = head.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                if rest.is_empty() {
                    *slot = value;
                } else {
                    set_in_value(slot, rest, value);
                }
                return;
            }
        }
    }
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        set_in_map(map, segments, value);
    }
}

fn project(value: &Value, segments: &[&str]) -> Option<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value.clone());
    };
    match value {
        Value::Object(map) if *head == "*" => {
            let mut out = Map::new();
            for (key, item) in map {
                if let Some(inner) = project(item, rest) {
                    out.insert(key.clone(), inner);
                }
            }
            Some(Value::Object(out))
        }
        Value::Object(map) => {
            let inner = project(map.get(*head)?, rest)?;
            let mut out = Map::new();
            out.insert(head.to_string(), inner);
            Some(Value::Object(out))
        }
        Value::Array(items) if *head == "*" => Some(Value::Array(
            items
                .iter()
                .map(|item| project(item, rest).unwrap_or_else(|| Value::Object(Map::new())))
                .collect(),
        )),
        Value::Array(items) => {
            let index = head.parse::<usize>().ok()?;
            let inner = project(items.get(index)?, rest)?;
            let mut out = vec![Value::Null; index];
            out.push(inner);
            Some(Value::Array(out))
        }
        _ => None,
    }
}

/// Combine projections of the same source; padding never replaces a value
fn overlay(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(existing), Value::Array(incoming)) => {
            for (index, value) in incoming.into_iter().enumerate() {
                match existing.get_mut(index) {
                    Some(slot) => overlay(slot, value),
                    None => existing.push(value),
                }
            }
        }
        (_, Value::Null) => {}
        (_, Value::Object(map)) if map.is_empty() => {}
        (slot, value) => *slot = value,
    }
}

fn merge_values(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(existing), Value::Array(incoming)) => {
            for (index, value) in incoming.into_iter().enumerate() {
                match existing.get_mut(index) {
                    Some(slot) => merge_values(slot, value),
                    None => existing.push(value),
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn expand_into(value: Option<&Value>, segments: &[&str], prefix: String, out: &mut Vec<String>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(prefix);
        return;
    };
    let join = |segment: &str| {
        if prefix.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", prefix, segment)
        }
    };
    if *head == "*" {
        match value {
            Some(Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    expand_into(Some(item), rest, join(&index.to_string()), out);
                }
            }
            Some(Value::Object(map)) => {
                for (key, item) in map {
                    expand_into(Some(item), rest, join(key), out);
                }
            }
            _ => {}
        }
    } else {
        let next = value.and_then(|v| step(v, head));
        expand_into(next, rest, join(head), out);
    }
}

/// A file received in a multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Form field the file was sent under
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(field: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            field: field.into(),
            file_name: None,
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// JSON description of the file as seen by validation rules
    pub fn metadata(&self) -> Value {
        serde_json::json!({
            "file_name": self.file_name,
            "content_type": self.content_type,
            "size": self.size(),
        })
    }
}

/// Immutable copy of the inbound request
#[derive(Debug, Clone, Default)]
pub struct RequestSnapshot {
    method: Method,
    path: String,
    query: InputData,
    body: InputData,
    content: Bytes,
    files: Vec<UploadedFile>,
    headers: HeaderMap,
    cookies: IndexMap<String, String>,
    route_params: IndexMap<String, String>,
}

impl RequestSnapshot {
    /// Create an empty GET snapshot
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Replace the query parameters; non-object values are ignored
    pub fn with_query(mut self, query: Value) -> Self {
        self.query = InputData::from_value(query).unwrap_or_default();
        self
    }

    /// Replace the decoded body fields; non-object values are ignored
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = InputData::from_value(body).unwrap_or_default();
        self
    }

    pub fn with_content(mut self, content: impl Into<Bytes>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }

    /// Add a header; invalid names or values are skipped
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_route_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_params.insert(name.into(), value.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &InputData {
        &self.query
    }

    pub fn body(&self) -> &InputData {
        &self.body
    }

    /// Raw body bytes as received
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    /// First file uploaded under `field`
    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == field)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn cookies(&self) -> &IndexMap<String, String> {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn route_params(&self) -> &IndexMap<String, String> {
        &self.route_params
    }

    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.route_params.get(name).map(String::as_str)
    }

    /// Everything a form request validates: query, then body, then files
    ///
    /// Body fields replace query fields of the same name; file metadata is
    /// merged recursively on top. Several files under one field become a list.
    pub fn all(&self) -> InputData {
        let mut data = self.query.clone();
        for (key, value) in self.body.as_map() {
            data.0.insert(key.clone(), value.clone());
        }

        let mut grouped: IndexMap<&str, Vec<Value>> = IndexMap::new();
        for file in &self.files {
            grouped
                .entry(file.field.as_str())
                .or_default()
                .push(file.metadata());
        }
        let mut files = InputData::new();
        for (field, mut entries) in grouped {
            let value = if entries.len() == 1 {
                entries.remove(0)
            } else {
                Value::Array(entries)
            };
            files.set(field, value);
        }
        data.merge(files);
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: Value) -> InputData {
        InputData::from_value(value).expect("object")
    }

    // === InputData::get / set / remove ===

    #[test]
    fn test_get_nested_path() {
        let data = input(json!({"address": {"city": "Lyon"}, "tags": ["a", "b"]}));
        assert_eq!(data.get("address.city"), Some(&json!("Lyon")));
        assert_eq!(data.get("tags.1"), Some(&json!("b")));
        assert_eq!(data.get("address.zip"), None);
        assert_eq!(data.get("tags.9"), None);
    }

    #[test]
    fn test_contains_counts_null_as_present() {
        let data = input(json!({"nickname": null}));
        assert!(data.contains("nickname"));
        assert!(!data.contains("age"));
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut data = InputData::new();
        data.set("address.city", json!("Lyon"));
        assert_eq!(data.into_value(), json!({"address": {"city": "Lyon"}}));
    }

    #[test]
    fn test_set_into_existing_array_slot() {
        let mut data = input(json!({"items": [{"qty": 1}, {"qty": 2}]}));
        data.set("items.1.qty", json!(5));
        assert_eq!(data.get("items.1.qty"), Some(&json!(5)));
        assert_eq!(data.get("items.0.qty"), Some(&json!(1)));
    }

    #[test]
    fn test_remove_nested() {
        let mut data = input(json!({"address": {"city": "Lyon", "zip": "69000"}}));
        assert_eq!(data.remove("address.zip"), Some(json!("69000")));
        assert_eq!(data.into_value(), json!({"address": {"city": "Lyon"}}));
    }

    // === InputData::only ===

    #[test]
    fn test_only_keeps_requested_fields() {
        let data = input(json!({"name": "A", "age": "x", "extra": true}));
        assert_eq!(data.only(["name"]).into_value(), json!({"name": "A"}));
    }

    #[test]
    fn test_only_skips_missing_fields() {
        let data = input(json!({"name": "A"}));
        assert_eq!(
            data.only(["name", "age"]).into_value(),
            json!({"name": "A"})
        );
    }

    #[test]
    fn test_only_nested_paths_merge_under_parent() {
        let data = input(json!({"address": {"city": "Lyon", "zip": "69000", "floor": 3}}));
        assert_eq!(
            data.only(["address.city", "address.zip"]).into_value(),
            json!({"address": {"city": "Lyon", "zip": "69000"}})
        );
    }

    #[test]
    fn test_only_wildcard_keeps_array_positions() {
        let data = input(json!({"items": [{"name": "a", "secret": 1}, {"secret": 2}]}));
        assert_eq!(
            data.only(["items.*.name"]).into_value(),
            json!({"items": [{"name": "a"}, {}]})
        );
    }

    #[test]
    fn test_only_index_keeps_single_element_field() {
        let data = input(json!({"items": [{"name": "a", "secret": "s"}, {"name": "b"}]}));
        assert_eq!(
            data.only(["items.0.name"]).into_value(),
            json!({"items": [{"name": "a"}]})
        );
        assert_eq!(
            data.only(["items.1.name"]).into_value(),
            json!({"items": [null, {"name": "b"}]})
        );
    }

    #[test]
    fn test_only_index_paths_combine() {
        let data = input(json!({"tags": ["a", "b", "c"]}));
        assert_eq!(
            data.only(["tags.1", "tags.0"]).into_value(),
            json!({"tags": ["a", "b"]})
        );
        assert!(data.only(["tags.7"]).is_empty());
    }

    // === InputData::merge ===

    #[test]
    fn test_merge_later_wins_on_leaves() {
        let mut data = input(json!({"name": "A", "address": {"city": "Lyon"}}));
        data.merge(input(json!({"name": "B", "address": {"zip": "69000"}})));
        assert_eq!(
            data.into_value(),
            json!({"name": "B", "address": {"city": "Lyon", "zip": "69000"}})
        );
    }

    // === InputData::expand ===

    #[test]
    fn test_expand_plain_path_is_unchanged() {
        let data = InputData::new();
        assert_eq!(data.expand("name"), vec!["name".to_string()]);
    }

    #[test]
    fn test_expand_wildcard_over_array() {
        let data = input(json!({"items": [{"name": "a"}, {"name": "b"}]}));
        assert_eq!(
            data.expand("items.*.name"),
            vec!["items.0.name".to_string(), "items.1.name".to_string()]
        );
    }

    #[test]
    fn test_expand_without_matches_returns_pattern() {
        let data = InputData::new();
        assert_eq!(data.expand("items.*.name"), vec!["items.*.name".to_string()]);
    }

    // === RequestSnapshot ===

    #[test]
    fn test_all_body_overrides_query() {
        let snapshot = RequestSnapshot::new()
            .with_query(json!({"page": "1", "name": "query"}))
            .with_body(json!({"name": "body"}));
        assert_eq!(
            snapshot.all().into_value(),
            json!({"page": "1", "name": "body"})
        );
    }

    #[test]
    fn test_all_includes_file_metadata() {
        let snapshot = RequestSnapshot::new().with_file(
            UploadedFile::new("avatar", &b"png"[..])
                .with_file_name("me.png")
                .with_content_type("image/png"),
        );
        let all = snapshot.all();
        assert_eq!(all.get("avatar.size"), Some(&json!(3)));
        assert_eq!(all.get("avatar.file_name"), Some(&json!("me.png")));
    }

    #[test]
    fn test_all_groups_repeated_files() {
        let snapshot = RequestSnapshot::new()
            .with_file(UploadedFile::new("photos", &b"a"[..]))
            .with_file(UploadedFile::new("photos", &b"bb"[..]));
        assert_eq!(snapshot.all().get("photos.1.size"), Some(&json!(2)));
    }

    #[test]
    fn test_header_and_cookie_accessors() {
        let snapshot = RequestSnapshot::new()
            .with_header("x-tenant", "acme")
            .with_cookie("session", "abc")
            .with_route_param("team", "7");
        assert_eq!(snapshot.header("x-tenant"), Some("acme"));
        assert_eq!(snapshot.cookie("session"), Some("abc"));
        assert_eq!(snapshot.route_param("team"), Some("7"));
        assert_eq!(snapshot.header("missing"), None);
    }

    #[test]
    fn test_non_object_body_is_ignored() {
        let snapshot = RequestSnapshot::new().with_body(json!([1, 2, 3]));
        assert!(snapshot.body().is_empty());
    }
}
