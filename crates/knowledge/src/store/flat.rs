//! Flat in-process vector index with file persistence.
//!
//! Layout inside the store directory:
//! - `index.bin`: magic `DQFLAT01`, `dim: u32 LE`, `count: u64 LE`, then
//!   `count * dim` little-endian `f32`s, row-major.
//! - `metadata.txt`: one escaped chunk per line, in insertion order.
//!
//! Both files are rewritten in full after every successful add.

use crate::config::{flat_index_path, flat_manifest_path};
use crate::store::{batch_dimension, check_dimension, StoreBackend, VectorStore};
use crate::types::SearchHit;
use docqa_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

const INDEX_MAGIC: &[u8; 8] = b"DQFLAT01";
const HEADER_LEN: usize = 8 + 4 + 8;

#[derive(Debug, Default)]
struct FlatState {
    dim: Option<usize>,
    vectors: Vec<f32>,
    texts: Vec<String>,
}

/// Brute-force squared-L2 index over every stored vector.
#[derive(Debug)]
pub struct FlatIndex {
    dir: PathBuf,
    state: RwLock<FlatState>,
}

impl FlatIndex {
    /// Open the index in `dir`, loading persisted state when present.
    pub async fn open(dir: &Path) -> AppResult<Self> {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            AppError::Store(format!("Failed to create store directory {:?}: {}", dir, e))
        })?;

        let index_path = flat_index_path(dir);
        let exists = tokio::fs::try_exists(&index_path)
            .await
            .map_err(|e| AppError::Store(format!("Failed to inspect {:?}: {}", index_path, e)))?;
        let state = if exists {
            let state = Self::load(dir).await?;
            tracing::info!(
                "Loaded flat index from {:?} ({} chunks)",
                dir,
                state.texts.len()
            );
            state
        } else {
            tracing::debug!("No flat index at {:?}, starting empty", index_path);
            FlatState::default()
        };

        Ok(Self {
            dir: dir.to_path_buf(),
            state: RwLock::new(state),
        })
    }

    async fn load(dir: &Path) -> AppResult<FlatState> {
        let index_path = flat_index_path(dir);
        let bytes = tokio::fs::read(&index_path)
            .await
            .map_err(|e| AppError::Store(format!("Failed to read {:?}: {}", index_path, e)))?;
        let (dim, vectors) = decode_index(&bytes)?;
        let count = vectors.len() / dim;

        let manifest_path = flat_manifest_path(dir);
        let mut texts = match tokio::fs::read(&manifest_path).await {
            Ok(raw) => {
                let content = String::from_utf8(raw).map_err(|e| {
                    AppError::Store(format!("Manifest {:?} is not UTF-8: {}", manifest_path, e))
                })?;
                decode_manifest(&content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(AppError::Store(format!(
                    "Failed to read {:?}: {}",
                    manifest_path, e
                )))
            }
        };

        // Rows are only appended, so extra trailing lines belong to an add
        // whose index was never replaced
        if texts.len() > count {
            tracing::warn!(
                "Manifest {:?} lists {} chunks for {} vectors, dropping the tail",
                manifest_path,
                texts.len(),
                count
            );
            texts.truncate(count);
        }

        if texts.len() != count {
            return Err(AppError::Store(format!(
                "Index holds {} vectors but manifest lists {} chunks",
                count,
                texts.len()
            )));
        }

        Ok(FlatState {
            dim: Some(dim),
            vectors,
            texts,
        })
    }

    async fn persist(&self, state: &FlatState) -> AppResult<()> {
        let Some(dim) = state.dim else {
            return Ok(());
        };

        let index_path = flat_index_path(&self.dir);
        let manifest_path = flat_manifest_path(&self.dir);
        let index_tmp = temp_path(&index_path);
        let manifest_tmp = temp_path(&manifest_path);

        // Both files are staged before either is replaced. The index goes
        // last: until it lands, the manifest is at worst a superset.
        write_file(&index_tmp, encode_index(dim, &state.vectors)).await?;
        write_file(&manifest_tmp, encode_manifest(&state.texts).into_bytes()).await?;
        rename_file(&manifest_tmp, &manifest_path).await?;
        rename_file(&index_tmp, &index_path).await?;

        tracing::debug!("Persisted {} chunks to {:?}", state.texts.len(), self.dir);
        Ok(())
    }
}

#[async_trait::async_trait]
impl VectorStore for FlatIndex {
    async fn add(&self, texts: &[String], vectors: &[Vec<f32>]) -> AppResult<()> {
        let Some(dim) = batch_dimension(texts, vectors)? else {
            return Ok(());
        };

        let mut state = self.state.write().await;
        if let Some(existing) = state.dim {
            check_dimension(existing, dim)?;
        }

        let previous_dim = state.dim;
        let previous_rows = state.texts.len();

        state.dim = Some(dim);
        for vector in vectors {
            state.vectors.extend_from_slice(vector);
        }
        state.texts.extend(texts.iter().cloned());

        if let Err(e) = self.persist(&state).await {
            state.dim = previous_dim;
            state.vectors.truncate(previous_rows * dim);
            state.texts.truncate(previous_rows);
            return Err(e);
        }

        tracing::debug!(
            "Added {} chunks to flat index ({} total)",
            texts.len(),
            state.texts.len()
        );
        Ok(())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<SearchHit>> {
        let state = self.state.read().await;
        let Some(dim) = state.dim else {
            return Ok(Vec::new());
        };
        if top_k == 0 {
            return Ok(Vec::new());
        }
        check_dimension(dim, query.len())?;

        let mut scored: Vec<(usize, f32)> = state
            .vectors
            .chunks_exact(dim)
            .map(|row| squared_l2(query, row))
            .enumerate()
            .collect();

        // Stable sort: equal distances keep insertion order
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(row, distance)| SearchHit::new(state.texts[row].clone(), distance))
            .collect())
    }

    async fn len(&self) -> AppResult<usize> {
        Ok(self.state.read().await.texts.len())
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Flat
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

async fn write_file(path: &Path, bytes: Vec<u8>) -> AppResult<()> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| AppError::Store(format!("Failed to write {:?}: {}", path, e)))
}

async fn rename_file(from: &Path, to: &Path) -> AppResult<()> {
    tokio::fs::rename(from, to)
        .await
        .map_err(|e| AppError::Store(format!("Failed to replace {:?}: {}", to, e)))
}

fn encode_index(dim: usize, vectors: &[f32]) -> Vec<u8> {
    let count = vectors.len() / dim;
    let mut bytes = Vec::with_capacity(HEADER_LEN + vectors.len() * 4);
    bytes.extend_from_slice(INDEX_MAGIC);
    bytes.extend_from_slice(&(dim as u32).to_le_bytes());
    bytes.extend_from_slice(&(count as u64).to_le_bytes());
    for &value in vectors {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn decode_index(bytes: &[u8]) -> AppResult<(usize, Vec<f32>)> {
    if bytes.len() < HEADER_LEN || &bytes[..8] != INDEX_MAGIC {
        return Err(AppError::Store("Index file has an invalid header".to_string()));
    }

    let mut dim_bytes = [0u8; 4];
    dim_bytes.copy_from_slice(&bytes[8..12]);
    let dim = u32::from_le_bytes(dim_bytes) as usize;

    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&bytes[12..20]);
    let count = u64::from_le_bytes(count_bytes) as usize;

    if dim == 0 {
        return Err(AppError::Store("Index file declares dimension 0".to_string()));
    }

    let expected = count
        .checked_mul(dim)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| AppError::Store("Index file header overflows".to_string()))?;
    let body = &bytes[HEADER_LEN..];
    if body.len() != expected {
        return Err(AppError::Store(format!(
            "Index file truncated: expected {} bytes of vectors, found {}",
            expected,
            body.len()
        )));
    }

    let vectors = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok((dim, vectors))
}

fn escape_line(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn unescape_line(line: &str) -> String {
    let mut text = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            text.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => text.push('\\'),
            Some('n') => text.push('\n'),
            Some('r') => text.push('\r'),
            Some(other) => {
                text.push('\\');
                text.push(other);
            }
            None => text.push('\\'),
        }
    }
    text
}

fn encode_manifest(texts: &[String]) -> String {
    let mut manifest = String::new();
    for text in texts {
        manifest.push_str(&escape_line(text));
        manifest.push('\n');
    }
    manifest
}

fn decode_manifest(content: &str) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }
    let body = content.strip_suffix('\n').unwrap_or(content);
    body.split('\n').map(unescape_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_escape_round_trip() {
        for text in ["plain", "two\nlines", "cr\r\nlf", "back\\slash\\n", "tail\\", ""] {
            assert_eq!(unescape_line(&escape_line(text)), text);
            assert!(!escape_line(text).contains('\n'));
        }
    }

    #[test]
    fn test_manifest_keeps_one_chunk_per_line() {
        let chunks = texts(&["first\nsecond", "", "third"]);
        let manifest = encode_manifest(&chunks);

        assert_eq!(manifest.lines().count(), 3);
        assert_eq!(decode_manifest(&manifest), chunks);
        assert!(decode_manifest("").is_empty());
    }

    #[test]
    fn test_index_header_validation() {
        let bytes = encode_index(2, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(&bytes[..8], b"DQFLAT01");
        assert_eq!(decode_index(&bytes).unwrap(), (2, vec![1.0, 2.0, 3.0, 4.0]));

        assert!(decode_index(&bytes[..bytes.len() - 1]).is_err());
        assert!(decode_index(b"NOTMAGIC").is_err());
    }

    #[tokio::test]
    async fn test_empty_index_search() {
        let temp = TempDir::new().unwrap();
        let index = FlatIndex::open(temp.path()).await.unwrap();

        assert!(index.search(&[1.0, 0.0], 5).await.unwrap().is_empty());
        assert_eq!(index.len().await.unwrap(), 0);

        // Empty add writes nothing
        index.add(&[], &[]).await.unwrap();
        assert!(!flat_index_path(temp.path()).exists());
    }

    #[tokio::test]
    async fn test_search_orders_by_distance() {
        let temp = TempDir::new().unwrap();
        let index = FlatIndex::open(temp.path()).await.unwrap();

        index
            .add(
                &texts(&["far", "near", "middle", "near-twin"]),
                &[vec![10.0, 0.0], vec![1.0, 0.0], vec![3.0, 0.0], vec![1.0, 0.0]],
            )
            .await
            .unwrap();

        let hits = index.search(&[0.0, 0.0], 3).await.unwrap();
        let order: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(order, vec!["near", "near-twin", "middle"]);
        assert_eq!(hits[0].distance, 1.0);
        assert_eq!(hits[2].distance, 9.0);

        assert!(index.search(&[0.0, 0.0], 0).await.unwrap().is_empty());
        assert_eq!(index.search(&[0.0, 0.0], 50).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_dimension_is_fixed_by_first_add() {
        let temp = TempDir::new().unwrap();
        let index = FlatIndex::open(temp.path()).await.unwrap();

        index.add(&texts(&["a"]), &[vec![1.0, 2.0]]).await.unwrap();

        let err = index
            .add(&texts(&["b"]), &[vec![1.0, 2.0, 3.0]])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert!(index.search(&[1.0], 1).await.is_err());
        assert_eq!(index.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mismatched_batch_is_rejected() {
        let temp = TempDir::new().unwrap();
        let index = FlatIndex::open(temp.path()).await.unwrap();

        let err = index
            .add(&texts(&["a", "b"]), &[vec![1.0]])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert_eq!(index.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reload_after_restart() {
        let temp = TempDir::new().unwrap();
        let chunks = texts(&["line one\nline two", "back\\slash", "plain"]);

        {
            let index = FlatIndex::open(temp.path()).await.unwrap();
            index
                .add(&chunks[..2], &[vec![0.0, 1.0], vec![1.0, 0.0]])
                .await
                .unwrap();
            index.add(&chunks[2..], &[vec![1.0, 1.0]]).await.unwrap();
        }

        let reopened = FlatIndex::open(temp.path()).await.unwrap();
        assert_eq!(reopened.len().await.unwrap(), 3);

        let hits = reopened.search(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].text, "line one\nline two");

        let all = reopened.search(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(all[0].text, "back\\slash");
    }

    #[tokio::test]
    async fn test_manifest_count_mismatch_fails_load() {
        let temp = TempDir::new().unwrap();
        {
            let index = FlatIndex::open(temp.path()).await.unwrap();
            index
                .add(&texts(&["a", "b"]), &[vec![1.0], vec![2.0]])
                .await
                .unwrap();
        }

        std::fs::write(flat_manifest_path(temp.path()), "a\n").unwrap();

        let err = FlatIndex::open(temp.path()).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
    }

    #[tokio::test]
    async fn test_failed_persist_rolls_back() {
        let temp = TempDir::new().unwrap();
        let index = FlatIndex::open(temp.path()).await.unwrap();
        index.add(&texts(&["kept"]), &[vec![1.0]]).await.unwrap();

        // A directory where the manifest temp file would go blocks the write
        std::fs::create_dir(temp.path().join("metadata.txt.tmp")).unwrap();

        assert!(index.add(&texts(&["lost"]), &[vec![2.0]]).await.is_err());
        assert_eq!(index.len().await.unwrap(), 1);
        std::fs::remove_dir(temp.path().join("metadata.txt.tmp")).unwrap();
        assert_eq!(FlatIndex::open(temp.path()).await.unwrap().len().await.unwrap(), 1);
        let hits = index.search(&[2.0], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "kept");
    }

    #[tokio::test]
    async fn test_failed_index_replace_still_reopens() {
        let temp = TempDir::new().unwrap();
        let index_path = flat_index_path(temp.path());
        let index = FlatIndex::open(temp.path()).await.unwrap();
        index.add(&texts(&["kept"]), &[vec![1.0]]).await.unwrap();

        // A non-empty directory at the index path makes its rename fail
        // after the manifest has already been replaced
        let saved = std::fs::read(&index_path).unwrap();
        std::fs::remove_file(&index_path).unwrap();
        std::fs::create_dir(&index_path).unwrap();
        std::fs::write(index_path.join("blocker"), "x").unwrap();

        let err = index.add(&texts(&["lost"]), &[vec![2.0]]).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
        assert_eq!(index.len().await.unwrap(), 1);
        assert_eq!(
            std::fs::read_to_string(flat_manifest_path(temp.path())).unwrap(),
            "kept\nlost\n"
        );

        std::fs::remove_dir_all(&index_path).unwrap();
        std::fs::write(&index_path, saved).unwrap();

        let reopened = FlatIndex::open(temp.path()).await.unwrap();
        assert_eq!(reopened.len().await.unwrap(), 1);
        let hits = reopened.search(&[2.0], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "kept");
    }

    #[tokio::test]
    async fn test_open_failure_is_store_error() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();

        let err = FlatIndex::open(&file.join("store")).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
    }
}
