//! File-system service seam backing the File family (spec.md §4.D).

use std::path::Path;

use indexmap::IndexMap;

use crate::error::Result;
use crate::value::TypedValue;

#[derive(Debug, Clone)]
pub struct FileStat {
    pub size: u64,
    pub is_dir: bool,
    pub modified: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<FileStat> for TypedValue {
    fn from(stat: FileStat) -> Self {
        let mut m = IndexMap::new();
        m.insert("size".to_string(), TypedValue::Integer(stat.size as i64));
        m.insert("isDirectory".to_string(), TypedValue::Boolean(stat.is_dir));
        if let Some(modified) = stat.modified {
            m.insert("modified".to_string(), TypedValue::Date(modified));
        }
        TypedValue::Map(m)
    }
}

#[async_trait::async_trait]
pub trait FileSystemService: Send + Sync {
    async fn read(&self, path: &str) -> Result<Vec<u8>>;
    async fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;
    async fn append(&self, path: &str, bytes: &[u8]) -> Result<()>;
    async fn exists(&self, path: &str) -> bool;
    async fn is_dir(&self, path: &str) -> bool;
    async fn stat(&self, path: &str) -> Result<FileStat>;
    async fn list(&self, path: &str, glob: Option<&str>, recursive: bool) -> Result<Vec<String>>;
    async fn make_dir(&self, path: &str) -> Result<()>;
    async fn make_file(&self, path: &str) -> Result<()>;
    async fn copy(&self, from: &str, to: &str) -> Result<()>;
    async fn rename(&self, from: &str, to: &str) -> Result<()>;
}

pub struct TokioFileSystemService;

#[async_trait::async_trait]
impl FileSystemService for TokioFileSystemService {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(path).await?)
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
        Ok(tokio::fs::write(path, bytes).await?)
    }

    async fn append(&self, path: &str, bytes: &[u8]) -> Result<()> {
        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(bytes).await?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }

    async fn is_dir(&self, path: &str) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn stat(&self, path: &str) -> Result<FileStat> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(FileStat {
            size: meta.len(),
            is_dir: meta.is_dir(),
            modified: meta.modified().ok().map(chrono::DateTime::<chrono::Utc>::from),
        })
    }

    async fn list(&self, path: &str, glob: Option<&str>, recursive: bool) -> Result<Vec<String>> {
        let matcher = match glob {
            Some(pattern) => Some(globset::Glob::new(pattern)?.compile_matcher()),
            None => None,
        };
        let mut out = Vec::new();
        list_dir(Path::new(path), recursive, &matcher, &mut out).await?;
        Ok(out)
    }

    async fn make_dir(&self, path: &str) -> Result<()> {
        Ok(tokio::fs::create_dir_all(path).await?)
    }

    async fn make_file(&self, path: &str) -> Result<()> {
        tokio::fs::File::create(path).await?;
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        tokio::fs::copy(from, to).await?;
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        Ok(tokio::fs::rename(from, to).await?)
    }
}

fn list_dir<'a>(
    dir: &'a Path,
    recursive: bool,
    matcher: &'a Option<globset::GlobMatcher>,
    out: &'a mut Vec<String>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            let matched = matcher
                .as_ref()
                .map(|m| m.is_match(&path))
                .unwrap_or(true);
            if matched {
                out.push(path.to_string_lossy().to_string());
            }
            if file_type.is_dir() && recursive {
                list_dir(&path, recursive, matcher, out).await?;
            }
        }
        Ok(())
    })
}
