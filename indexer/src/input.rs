use anyhow::{Context, Result};
use semsearch::{DocId, DocumentStore};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: DocId,
    #[serde(alias = "body")]
    text: String,
}

/// Read documents from a `.json`/`.jsonl` file or every such file under a
/// directory. Files are visited in path order; a repeated ID keeps the first
/// body seen.
pub fn load_documents(input: &Path) -> Result<DocumentStore> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(extension(p), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        anyhow::bail!("document input {} does not exist", input.display());
    }

    let mut store = DocumentStore::new();
    for file in files {
        let docs = if extension(&file) == Some("jsonl") { read_jsonl(&file)? } else { read_json(&file)? };
        for doc in docs {
            if !store.insert(doc.id, doc.text) {
                tracing::warn!(doc_id = doc.id, file = %file.display(), "duplicate document id skipped");
            }
        }
    }
    tracing::info!(num_docs = store.len(), "documents loaded");
    Ok(store)
}

fn extension(p: &Path) -> Option<&str> {
    p.extension().and_then(|s| s.to_str())
}

fn read_jsonl(file: &Path) -> Result<Vec<InputDoc>> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
    let mut docs = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: InputDoc = serde_json::from_str(&line).with_context(|| format!("{}:{}", file.display(), i + 1))?;
        docs.push(doc);
    }
    Ok(docs)
}

fn read_json(file: &Path) -> Result<Vec<InputDoc>> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    let docs = match json {
        serde_json::Value::Array(arr) => arr
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<InputDoc>, _>>()?,
        serde_json::Value::Object(_) => vec![serde_json::from_value(json)?],
        _ => {
            tracing::warn!(file = %file.display(), "expected an object or array, skipping");
            Vec::new()
        }
    };
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reads_json_and_jsonl_from_a_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.jsonl"), "{\"id\": 2, \"text\": \"Places to visit in New York\"}\n\n{\"id\": 1, \"text\": \"Best bagels\"}\n").unwrap();
        fs::write(dir.path().join("b.json"), "[{\"id\": 3, \"body\": \"Guide to jazz clubs\"}, {\"id\": 1, \"text\": \"ignored\"}]").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a document").unwrap();

        let store = load_documents(dir.path()).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(1), Some("Best bagels"));
        assert_eq!(store.get(3), Some("Guide to jazz clubs"));
    }

    #[test]
    fn single_object_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("one.json");
        fs::write(&path, "{\"id\": 9, \"text\": \"Dessert spots\"}").unwrap();
        assert_eq!(load_documents(&path).unwrap().get(9), Some("Dessert spots"));
    }

    #[test]
    fn reports_bad_lines_and_missing_input() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        fs::write(&path, "{\"id\": 1, \"text\": \"ok\"}\n{\"id\": \"x\"}\n").unwrap();
        let err = load_documents(&path).unwrap_err();
        assert!(format!("{err:#}").contains("bad.jsonl:2"));
        assert!(load_documents(&dir.path().join("missing")).is_err());
    }
}
