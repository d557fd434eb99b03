use crate::{DocumentStore, InvertedIndex, SimilarityGraph};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub vocab_size: u32,
    pub top_n: u32,
    pub dimension: u32,
    pub created_at: String,
    pub version: u32,
}

/// Layout of an artifact directory.
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn graph(&self) -> PathBuf { self.root.join("graph.bin") }
    fn index(&self) -> PathBuf { self.root.join("index.bin") }
    fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` next to `path` and flush them to disk. The returned temp
/// file replaces `path` only when passed to [`publish`].
fn stage(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let tmp = tmp_path(path);
    let mut f = File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    f.write_all(bytes).with_context(|| format!("writing {}", tmp.display()))?;
    f.sync_all().with_context(|| format!("syncing {}", tmp.display()))?;
    Ok(tmp)
}

fn publish(tmp: &Path, path: &Path) -> Result<()> {
    fs::rename(tmp, path).with_context(|| format!("renaming {} to {}", tmp.display(), path.display()))
}

/// Readers see either the previous file or the complete new one.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = stage(path, bytes)?;
    publish(&tmp, path)
}

fn save_bin<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = bincode::serialize(value)?;
    write_atomic(path, &bytes)
}

fn load_bin<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let mut f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let value = bincode::deserialize(&buf).with_context(|| format!("decoding {}", path.display()))?;
    Ok(value)
}

/// Vectors and neighbor scores are stored bit-exactly.
pub fn save_graph(paths: &IndexPaths, graph: &SimilarityGraph) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_bin(&paths.graph(), graph)
}

pub fn load_graph(paths: &IndexPaths) -> Result<SimilarityGraph> {
    load_bin(&paths.graph())
}

pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_bin(&paths.index(), index)
}

pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex> {
    load_bin(&paths.index())
}

pub fn save_docs(paths: &IndexPaths, docs: &DocumentStore) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_bin(&paths.docs(), docs)
}

pub fn load_docs(paths: &IndexPaths) -> Result<DocumentStore> {
    load_bin(&paths.docs())
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    write_atomic(&paths.meta(), json.as_bytes())
}

/// Replace the graph and its meta together.
///
/// Both files are fully written and synced before either is renamed into
/// place, so a serialization or I/O failure leaves the previous pair intact.
pub fn commit_graph(paths: &IndexPaths, graph: &SimilarityGraph, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let graph_bytes = bincode::serialize(graph)?;
    let meta_json = serde_json::to_string_pretty(meta)?;

    let graph_tmp = stage(&paths.graph(), &graph_bytes)?;
    let meta_tmp = match stage(&paths.meta(), meta_json.as_bytes()) {
        Ok(tmp) => tmp,
        Err(e) => {
            let _ = fs::remove_file(&graph_tmp);
            return Err(e);
        }
    };
    publish(&graph_tmp, &paths.graph())?;
    publish(&meta_tmp, &paths.meta())?;
    tracing::debug!(root = %paths.root.display(), top_n = meta.top_n, "graph committed");
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta()).with_context(|| format!("opening {}", paths.meta().display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    if meta.version != FORMAT_VERSION {
        anyhow::bail!("unsupported artifact version {} (expected {FORMAT_VERSION})", meta.version);
    }
    Ok(meta)
}

/// Everything a query process needs: graph, index, documents and meta.
pub fn load_artifacts(paths: &IndexPaths) -> Result<(SimilarityGraph, InvertedIndex, DocumentStore, MetaFile)> {
    let meta = load_meta(paths)?;
    let graph = load_graph(paths)?;
    let index = load_index(paths)?;
    let docs = load_docs(paths)?;
    if meta.top_n as usize != graph.top_n() || meta.vocab_size as usize != graph.len() {
        tracing::warn!(
            meta_top_n = meta.top_n,
            graph_top_n = graph.top_n(),
            meta_vocab_size = meta.vocab_size,
            graph_vocab_size = graph.len(),
            "meta.json does not describe graph.bin"
        );
    }
    Ok((graph, index, docs, meta))
}

impl MetaFile {
    /// Fails when a count does not fit the `u32` fields of the file format.
    pub fn describe(graph: &SimilarityGraph, num_docs: usize, created_at: String) -> Result<Self> {
        Ok(Self {
            num_docs: u32::try_from(num_docs).with_context(|| format!("num_docs {num_docs} exceeds u32"))?,
            vocab_size: u32::try_from(graph.len()).with_context(|| format!("vocab_size {} exceeds u32", graph.len()))?,
            top_n: u32::try_from(graph.top_n()).with_context(|| format!("top_n {} exceeds u32", graph.top_n()))?,
            dimension: u32::try_from(graph.dimension())
                .with_context(|| format!("dimension {} exceeds u32", graph.dimension()))?,
            created_at,
            version: FORMAT_VERSION,
        })
    }
}
