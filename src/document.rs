//! YAML document store
//!
//! Reads step files into a `serde_yaml::Value` tree and writes the whole
//! tree back. Mappings keep their key order, so keys the tool never touches
//! come back where they were. serde_yaml never emits anchors or aliases:
//! shared sub-structures are always written out in full.

use crate::error::DocumentError;
use serde_yaml::Value;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// A parsed step definition
pub type Document = Value;

/// Where step documents are loaded from and stored to
pub trait DocumentStore {
    fn read(&self, path: &Path) -> Result<Document, DocumentError>;
    fn write(&self, path: &Path, doc: &Document) -> Result<(), DocumentError>;
}

/// Step files on the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl DocumentStore for FileStore {
    fn read(&self, path: &Path) -> Result<Document, DocumentError> {
        read_document(path)
    }

    fn write(&self, path: &Path, doc: &Document) -> Result<(), DocumentError> {
        write_document(path, doc)
    }
}

/// True for documents that load as nothing usable: `null`, `false`, `0`
/// or an empty string.
pub fn is_blank(doc: &Document) -> bool {
    match doc {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f == 0.0 || f.is_nan()),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Read and parse a YAML file
pub fn read_document(path: &Path) -> Result<Document, DocumentError> {
    let content = fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_yaml::from_str(&content).map_err(|source| DocumentError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize a document the way `write_document` stores it
pub fn to_yaml_string(doc: &Document) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(doc)
}

/// Serialize the full document and overwrite `path`
pub fn write_document(path: &Path, doc: &Document) -> Result<(), DocumentError> {
    let yaml = to_yaml_string(doc).map_err(|source| DocumentError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    replace_file(path, yaml.as_bytes()).map_err(|source| DocumentError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), "document written");
    Ok(())
}

/// Write `contents` to a temp file next to the target, then rename it over
/// the target. The file on disk is always either the old or the new content.
fn replace_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    // symlinked steps stay symlinks: replace the file they point at
    let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::Builder::new()
        .prefix(".retrofit-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(contents)?;
    if let Ok(meta) = fs::metadata(&target) {
        temp.as_file().set_permissions(meta.permissions())?;
    }
    temp.as_file().sync_all()?;
    temp.persist(&target).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const STEP: &str = r#"
id: fetch_users
type: datasource
subtype: restQuery
blockData:
  method: GET
  url: https://api.example.com/users
  headers:
    - key: Accept
      value: application/json
  timeoutMs: 3000
  cache: false
ui:
  x: 120.5
  y: -40
notes: ~
"#;

    #[test]
    fn reads_nested_document() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("fetch.yml");
        fs::write(&path, STEP).unwrap();

        let doc = read_document(&path).unwrap();
        assert_eq!(doc["type"], Value::from("datasource"));
        assert_eq!(doc["blockData"]["headers"][0]["key"], Value::from("Accept"));
        assert_eq!(doc["ui"]["x"].as_f64(), Some(120.5));
        assert!(doc["notes"].is_null());
    }

    #[test]
    fn untouched_document_survives_write_and_read() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("fetch.yml");
        let original: Document = serde_yaml::from_str(STEP).unwrap();

        write_document(&path, &original).unwrap();
        let reread = read_document(&path).unwrap();

        assert_eq!(reread, original);
    }

    #[test]
    fn write_keeps_key_order_and_two_space_indent() {
        let doc: Document = serde_yaml::from_str(STEP).unwrap();
        let yaml = to_yaml_string(&doc).unwrap();

        let id = yaml.find("id:").unwrap();
        let block = yaml.find("blockData:").unwrap();
        let ui = yaml.find("ui:").unwrap();
        assert!(id < block && block < ui);
        assert!(yaml.contains("\n  method: GET\n"));
        assert!(!yaml.contains('&'), "no anchors expected:\n{yaml}");
    }

    #[test]
    fn missing_file_is_read_error() {
        let temp = tempdir().unwrap();
        let err = read_document(&temp.path().join("nope.yml")).unwrap_err();
        assert!(matches!(err, DocumentError::Read { .. }));
    }

    #[test]
    fn broken_yaml_is_parse_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("broken.yml");
        fs::write(&path, "type: datasource\nblockData: {url: [unclosed\n").unwrap();

        let err = read_document(&path).unwrap_err();
        assert!(matches!(err, DocumentError::Parse { .. }));
        assert!(err.to_string().contains("broken.yml"));
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(".retrofit-"))
            .collect()
    }

    #[test]
    fn write_replaces_content_whole() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("fetch.yml");
        fs::write(&path, STEP).unwrap();

        let doc: Document = serde_yaml::from_str("type: action\n").unwrap();
        write_document(&path, &doc).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "type: action\n");
        assert!(leftovers(temp.path()).is_empty());
    }

    #[test]
    fn failed_replace_keeps_target_and_cleans_up() {
        let temp = tempdir().unwrap();
        // a non-empty directory cannot be renamed over, even by root
        let path = temp.path().join("fetch.yml");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let doc: Document = serde_yaml::from_str(STEP).unwrap();
        let err = write_document(&path, &doc).unwrap_err();

        assert!(matches!(err, DocumentError::Write { .. }));
        assert_eq!(fs::read_to_string(path.join("keep")).unwrap(), "x");
        assert!(leftovers(temp.path()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let path = temp.path().join("fetch.yml");
        fs::write(&path, STEP).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        let doc: Document = serde_yaml::from_str(STEP).unwrap();
        write_document(&path, &doc).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[cfg(unix)]
    #[test]
    fn write_through_symlink_updates_target() {
        let temp = tempdir().unwrap();
        let real = temp.path().join("shared.yml");
        let link = temp.path().join("fetch.yml");
        fs::write(&real, STEP).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let doc: Document = serde_yaml::from_str("type: action\n").unwrap();
        write_document(&link, &doc).unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&real).unwrap(), "type: action\n");
    }

    #[test]
    fn blank_documents() {
        for yaml in ["~", "false", "0", "0.0", "''"] {
            let doc: Document = serde_yaml::from_str(yaml).unwrap();
            assert!(is_blank(&doc), "{yaml} should be blank");
        }
        for yaml in ["true", "1", "x", "[]", "{}", "type: action"] {
            let doc: Document = serde_yaml::from_str(yaml).unwrap();
            assert!(!is_blank(&doc), "{yaml} should not be blank");
        }
        assert!(is_blank(&Value::Null));
    }

    #[test]
    fn file_store_round_trips() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("fetch.yml");
        let doc: Document = serde_yaml::from_str(STEP).unwrap();

        FileStore.write(&path, &doc).unwrap();
        assert_eq!(FileStore.read(&path).unwrap(), doc);
    }

    #[test]
    fn write_into_missing_directory_is_write_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("gone").join("step.yml");
        let doc: Document = serde_yaml::from_str("type: action").unwrap();

        let err = write_document(&path, &doc).unwrap_err();
        assert!(matches!(err, DocumentError::Write { .. }));
    }
}
