use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;

use crate::error::{Result, StoreError};

/// One stored announcement audio file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    /// Stored file name (generated-id prefix + original name).
    pub name: String,
    pub path: PathBuf,
    /// `file://` URI handed to the device layer as the stream location.
    pub uri: String,
}

/// Manages the directory of uploaded announcement audio assets.
///
/// Assets are plain files; the binding to a schedule lives in the schedule
/// record's `announcements` list, which references the asset by URI.
pub struct AnnouncementAssets {
    dir: PathBuf,
}

impl AnnouncementAssets {
    /// Open (creating if needed) the asset directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir: PathBuf = dir.into();
        fs::create_dir_all(&dir)?;
        // Canonical form so containment checks on delete are reliable.
        let dir = dir.canonicalize()?;
        Ok(Self { dir })
    }

    /// Persist an uploaded audio payload and return its stored location.
    ///
    /// The stored name is prefixed with a generated ID so repeated uploads
    /// of the same file never collide.
    pub fn save(&self, file_name: &str, bytes: &[u8]) -> Result<AssetFile> {
        // Strip any path components a client may have smuggled in.
        let base = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StoreError::InvalidAssetPath {
                path: file_name.to_string(),
            })?;

        let stored_name = format!("{}_{}", short_id(), base);
        let path = self.dir.join(&stored_name);
        fs::write(&path, bytes)?;
        info!(file = %stored_name, size = bytes.len(), "announcement asset saved");

        Ok(AssetFile {
            name: stored_name,
            uri: file_uri(&path),
            path,
        })
    }

    /// Delete a stored asset.
    ///
    /// Rejects any path that does not resolve inside the asset directory.
    pub fn delete(&self, path: &Path) -> Result<()> {
        let resolved = path
            .canonicalize()
            .map_err(|_| StoreError::InvalidAssetPath {
                path: path.display().to_string(),
            })?;
        if !resolved.starts_with(&self.dir) {
            return Err(StoreError::InvalidAssetPath {
                path: path.display().to_string(),
            });
        }
        fs::remove_file(&resolved)?;
        info!(file = %resolved.display(), "announcement asset deleted");
        Ok(())
    }

    /// Delete a stored asset by its `file://` URI.
    pub fn delete_uri(&self, uri: &str) -> Result<()> {
        let path = uri
            .strip_prefix("file://")
            .ok_or_else(|| StoreError::InvalidAssetPath {
                path: uri.to_string(),
            })?;
        self.delete(Path::new(path))
    }

    /// List all stored assets.
    pub fn list(&self) -> Result<Vec<AssetFile>> {
        let mut assets = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            assets.push(AssetFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                uri: file_uri(&path),
                path,
            });
        }
        assets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(assets)
    }
}

fn file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

fn short_id() -> String {
    // First uuid group: 8 hex chars, plenty for filename uniqueness.
    Uuid::new_v4().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_assets() -> AnnouncementAssets {
        let dir = std::env::temp_dir().join(format!("maestro-assets-{}", Uuid::new_v4()));
        AnnouncementAssets::new(dir).unwrap()
    }

    #[test]
    fn save_list_delete_round_trip() {
        let assets = temp_assets();
        let saved = assets.save("chime.mp3", b"audio-bytes").unwrap();
        assert!(saved.name.ends_with("_chime.mp3"));
        assert!(saved.uri.starts_with("file://"));
        assert!(saved.path.exists());

        let listed = assets.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, saved.name);

        assets.delete(&saved.path).unwrap();
        assert!(assets.list().unwrap().is_empty());
    }

    #[test]
    fn save_strips_path_components() {
        let assets = temp_assets();
        let saved = assets.save("../../etc/passwd", b"x").unwrap();
        assert!(saved.name.ends_with("_passwd"));
        assert!(!saved.name.contains('/'));
        // The file must land directly inside the asset directory.
        assert!(!saved.path.components().any(|c| c.as_os_str() == "etc"));
    }

    #[test]
    fn delete_outside_dir_rejected() {
        let assets = temp_assets();
        let outside = std::env::temp_dir().join(format!("maestro-outside-{}", Uuid::new_v4()));
        fs::write(&outside, b"x").unwrap();
        let result = assets.delete(&outside);
        assert!(matches!(result, Err(StoreError::InvalidAssetPath { .. })));
        fs::remove_file(&outside).unwrap();
    }

    #[test]
    fn delete_by_uri() {
        let assets = temp_assets();
        let saved = assets.save("note.mp3", b"x").unwrap();
        assets.delete_uri(&saved.uri).unwrap();
        assert!(!saved.path.exists());
    }
}
