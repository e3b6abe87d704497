use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;

use crate::constants::RESULT_SUFFIX;
use crate::error::{AppError, Result};

/// Entry in a data directory listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntryInfo {
    pub name: String,
    /// Path relative to the data directory, `/`-separated
    pub path: String,
    pub is_directory: bool,
    pub size: u64,
    pub modified_at: Option<String>,
}

/// Contents of a data directory path
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PathContents {
    Directory(Vec<DirEntryInfo>),
    File(String),
}

/// Handle to the flat-file data directory
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the data directory if it does not exist
    pub async fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Resolve a client-supplied relative path inside the data directory
    ///
    /// Only plain components are accepted; `..`, roots and drive prefixes
    /// are rejected so the result can never escape the root.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let mut resolved = self.root.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    tracing::warn!("Rejected data path outside root: {}", relative);
                    return Err(AppError::Forbidden);
                }
            }
        }
        Ok(resolved)
    }

    fn relative_display(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// List a directory: directories first, then files, each sorted by name
    pub async fn list(&self, relative: &str) -> Result<Vec<DirEntryInfo>> {
        let dir = self.resolve(relative)?;
        self.list_path(&dir).await
    }

    async fn list_path(&self, dir: &Path) -> Result<Vec<DirEntryInfo>> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::NotFound("Directory".to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut contents = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            let modified_at = meta
                .modified()
                .ok()
                .map(|t| DateTime::<Utc>::from(t).to_rfc3339());

            contents.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: self.relative_display(&entry.path()),
                is_directory: meta.is_dir(),
                size: meta.len(),
                modified_at,
            });
        }

        contents.sort_by(|a, b| {
            b.is_directory
                .cmp(&a.is_directory)
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(contents)
    }

    /// Read a file, or list it if the path is a directory
    pub async fn read(&self, relative: &str) -> Result<PathContents> {
        let path = self.resolve(relative)?;
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::NotFound("File".to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        if meta.is_dir() {
            return Ok(PathContents::Directory(self.list_path(&path).await?));
        }

        Ok(PathContents::File(fs::read_to_string(&path).await?))
    }

    /// Write a file, creating parent directories
    ///
    /// Prediction files always end with a newline.
    pub async fn write(&self, relative: &str, content: &str) -> Result<()> {
        let path = self.resolve(relative)?;
        if path == self.root {
            return Err(AppError::InvalidInput("Path must name a file".to_string()));
        }

        let is_prediction = path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.ends_with(RESULT_SUFFIX));

        if is_prediction && !content.ends_with('\n') {
            write_atomic(&path, format!("{}\n", content).as_bytes()).await
        } else {
            write_atomic(&path, content.as_bytes()).await
        }
    }

    /// Delete a file or a directory tree
    pub async fn delete(&self, relative: &str) -> Result<()> {
        let path = self.resolve(relative)?;
        if path == self.root {
            return Err(AppError::Forbidden);
        }

        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::NotFound("File".to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        if meta.is_dir() {
            fs::remove_dir_all(&path).await?;
        } else {
            fs::remove_file(&path).await?;
        }
        Ok(())
    }

    /// Create a directory (and parents)
    pub async fn mkdir(&self, relative: &str) -> Result<()> {
        let path = self.resolve(relative)?;
        fs::create_dir_all(&path).await?;
        Ok(())
    }
}

/// Read a file, mapping a missing file to `None`
pub async fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Non-empty trimmed lines of `content`
pub fn content_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Replace a file's content via a temporary sibling and rename
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_rejects_traversal() {
        let data = DataDir::new("/srv/data");

        assert!(matches!(data.resolve("../etc/passwd"), Err(AppError::Forbidden)));
        assert!(matches!(data.resolve("pin/../../x"), Err(AppError::Forbidden)));
        assert!(matches!(data.resolve("/etc/passwd"), Err(AppError::Forbidden)));

        assert_eq!(
            data.resolve("./pin/2024-01-01.txt").unwrap(),
            PathBuf::from("/srv/data/pin/2024-01-01.txt")
        );
        assert_eq!(data.resolve("").unwrap(), PathBuf::from("/srv/data"));
    }

    #[tokio::test]
    async fn test_write_read_and_list() {
        let temp_dir = TempDir::new().unwrap();
        let data = DataDir::new(temp_dir.path());

        data.write("b.txt", "hello").await.unwrap();
        data.mkdir("zdir").await.unwrap();
        data.write("a/nested.txt", "x").await.unwrap();

        match data.read("b.txt").await.unwrap() {
            PathContents::File(content) => assert_eq!(content, "hello"),
            other => panic!("expected file, got {:?}", other),
        }

        let listing = data.list("").await.unwrap();
        let names: Vec<_> = listing.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "zdir", "b.txt"]);
        assert_eq!(listing[2].size, 5);

        match data.read("a").await.unwrap() {
            PathContents::Directory(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].path, "a/nested.txt");
            }
            other => panic!("expected directory, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_prediction_write_appends_newline() {
        let temp_dir = TempDir::new().unwrap();
        let data = DataDir::new(temp_dir.path());

        data.write("25001_result.txt", "01 02 03 04 05 + 06 07")
            .await
            .unwrap();
        data.write("notes.txt", "no newline").await.unwrap();

        let prediction = std::fs::read_to_string(temp_dir.path().join("25001_result.txt")).unwrap();
        assert_eq!(prediction, "01 02 03 04 05 + 06 07\n");

        let notes = std::fs::read_to_string(temp_dir.path().join("notes.txt")).unwrap();
        assert_eq!(notes, "no newline");
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let data = DataDir::new(temp_dir.path());

        assert!(matches!(
            data.delete("nope.txt").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(data.delete("").await, Err(AppError::Forbidden)));

        data.write("gone/file.txt", "x").await.unwrap();
        data.delete("gone").await.unwrap();
        assert!(!temp_dir.path().join("gone").exists());
    }

    #[test]
    fn test_content_lines() {
        assert_eq!(
            content_lines("a\n\n  b  \n\n"),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(content_lines("").is_empty());
    }
}
