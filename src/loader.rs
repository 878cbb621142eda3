//! Document loading: plain text, JSON arrays, and directory enumeration.
//!
//! Plain-text input yields one document per non-empty line; JSON input (by
//! extension or forced) yields one document per array element. A template
//! renders each source object into the string shown to the model: `{data}`
//! binds the raw line or whole object, `{field}` binds a JSON object field.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::document::Document;

/// Upper bound on documents per run.
pub const MAX_DOCUMENTS: usize = 10_000;

/// Upper bound on files enumerated from one directory.
pub const MAX_FILES_PER_DIRECTORY: usize = 1_000;

pub const DEFAULT_TEMPLATE: &str = "{data}";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid input: {0}")]
    Invalid(String),
}

/// Load documents from a file or directory, rendering each through `template`.
pub fn load_documents(
    path: &Path,
    template: &str,
    force_json: bool,
    pattern: &str,
) -> Result<Vec<Document>, LoadError> {
    let raw = if path.is_dir() {
        let files = enumerate_files(path, pattern)?;
        info!(path = %path.display(), files = files.len(), "loading documents from directory");
        let mut all = Vec::new();
        for file in files {
            all.extend(load_file(&file, template, force_json)?);
        }
        all
    } else {
        load_file(path, template, force_json)?
    };

    // Identical rendered values share a key; keep the first occurrence.
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut documents = Vec::with_capacity(raw.len());
    for doc in raw {
        if seen.insert(doc.key.clone()) {
            documents.push(doc);
        } else {
            debug!(key = %doc.key, "skipping duplicate document");
        }
    }

    if documents.is_empty() {
        return Err(LoadError::Invalid("no documents loaded".to_string()));
    }
    if documents.len() > MAX_DOCUMENTS {
        return Err(LoadError::Invalid(format!(
            "too many documents to rank (max {MAX_DOCUMENTS})"
        )));
    }

    Ok(documents)
}

fn load_file(path: &Path, template: &str, force_json: bool) -> Result<Vec<Document>, LoadError> {
    let content = std::fs::read_to_string(path)?;
    let is_json = force_json
        || path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

    if is_json {
        let objects: Vec<Value> = serde_json::from_str(&content).map_err(|e| {
            LoadError::Invalid(format!("{}: not a JSON array: {e}", path.display()))
        })?;
        objects
            .into_iter()
            .map(|object| {
                let value = render_template(template, &object)?;
                Ok(Document::new(value, object))
            })
            .collect()
    } else {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                let object = Value::String(line.to_string());
                let value = render_template(template, &object)?;
                Ok(Document::new(value, object))
            })
            .collect()
    }
}

/// Enumerate regular files in a directory matching a glob pattern, sorted
/// for deterministic ordering.
fn enumerate_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, LoadError> {
    let mut matched = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if wildcard_match(pattern, &name) {
            matched.push(entry.path());
        }
    }

    if matched.len() > MAX_FILES_PER_DIRECTORY {
        return Err(LoadError::Invalid(format!(
            "directory contains too many matching files (max {MAX_FILES_PER_DIRECTORY})"
        )));
    }
    if matched.is_empty() {
        return Err(LoadError::Invalid(format!(
            "no files matched pattern {pattern:?} in directory {}",
            dir.display()
        )));
    }

    matched.sort();
    Ok(matched)
}

/// Expand `{placeholder}` occurrences against a source object.
fn render_template(template: &str, object: &Value) -> Result<String, LoadError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            return Err(LoadError::Invalid(format!(
                "unparseable template {template:?}: unclosed placeholder"
            )));
        };
        let name = &after[..end];
        out.push_str(&resolve_placeholder(name, object, template)?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn resolve_placeholder(name: &str, object: &Value, template: &str) -> Result<String, LoadError> {
    if name == "data" {
        return Ok(value_to_text(object));
    }
    match object.get(name) {
        Some(field) => Ok(value_to_text(field)),
        None => Err(LoadError::Invalid(format!(
            "template {template:?} references missing field {name:?}"
        ))),
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Minimal glob matching supporting `*` and `?`.
fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    // Iterative star-backtracking match.
    let (mut p, mut n) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;
    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, n));
            p += 1;
        } else if let Some((star_p, star_n)) = star {
            p = star_p + 1;
            n = star_n + 1;
            star = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_text_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "fruit.txt", "apple\n\nbanana\ncherry\n");
        let docs = load_documents(&path, DEFAULT_TEMPLATE, false, "*").unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].value, "apple");
        assert_eq!(docs[0].object, Value::String("apple".to_string()));
    }

    #[test]
    fn loads_json_arrays_with_field_templates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "items.json",
            r#"[{"id": 1, "text": "first"}, {"id": 2, "text": "second"}]"#,
        );
        let docs = load_documents(&path, "{text}", false, "*").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].value, "first");
        assert_eq!(docs[1].object, json!({"id": 2, "text": "second"}));
    }

    #[test]
    fn force_json_overrides_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "items.txt", r#"[{"text": "only"}]"#);
        let docs = load_documents(&path, "{text}", true, "*").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].value, "only");
    }

    #[test]
    fn template_with_missing_field_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "items.json", r#"[{"text": "x"}]"#);
        let err = load_documents(&path, "{nope}", false, "*").unwrap_err();
        assert!(matches!(err, LoadError::Invalid(_)));
    }

    #[test]
    fn unclosed_placeholder_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "a.txt", "x");
        let err = load_documents(&path, "{data", false, "*").unwrap_err();
        assert!(matches!(err, LoadError::Invalid(_)));
    }

    #[test]
    fn duplicates_collapse_to_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "dup.txt", "same\nsame\nother\n");
        let docs = load_documents(&path, DEFAULT_TEMPLATE, false, "*").unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn empty_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "empty.txt", "\n\n");
        let err = load_documents(&path, DEFAULT_TEMPLATE, false, "*").unwrap_err();
        assert!(matches!(err, LoadError::Invalid(_)));
    }

    #[test]
    fn directory_input_aggregates_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.txt", "apple\nbanana");
        write_file(dir.path(), "b.txt", "cherry");
        write_file(dir.path(), "notes.md", "ignored");
        let docs = load_documents(dir.path(), DEFAULT_TEMPLATE, false, "*.txt").unwrap();
        assert_eq!(docs.len(), 3);
    }

    #[test]
    fn directory_with_no_matches_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.md", "x");
        let err = load_documents(dir.path(), DEFAULT_TEMPLATE, false, "*.txt").unwrap_err();
        assert!(matches!(err, LoadError::Invalid(_)));
    }

    #[test]
    fn wildcard_patterns() {
        assert!(wildcard_match("*", "anything.txt"));
        assert!(wildcard_match("*.txt", "notes.txt"));
        assert!(!wildcard_match("*.txt", "notes.md"));
        assert!(wildcard_match("data_*.json", "data_01.json"));
        assert!(!wildcard_match("data_*.json", "other_01.json"));
        assert!(wildcard_match("file?.txt", "file1.txt"));
        assert!(!wildcard_match("file?.txt", "file12.txt"));
        assert!(wildcard_match("a*b*c", "axxbyyc"));
        assert!(!wildcard_match("a*b*c", "axxbyy"));
    }
}
