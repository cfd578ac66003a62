//! 关键图像存储

use pacs_core::{ImageRef, PacsError, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use strict_path::{PathBoundary, StrictPath, StrictPathError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 关键图像存储
///
/// 文件按内容寻址：`reports/<report_id>/<sha256>.<ext>`，相同字节得到相同路径。
/// 返回的路径相对于存储根目录，所有读写都经过根目录边界校验（含符号链接解析）。
#[derive(Debug, Clone)]
pub struct ImageStore {
    boundary: PathBoundary,
}

impl ImageStore {
    /// 打开存储根目录，不存在时创建
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref();
        let boundary = PathBoundary::try_new_create(base_path).map_err(|e| {
            PacsError::Storage(format!(
                "cannot open image store {}: {}",
                base_path.display(),
                e
            ))
        })?;
        Ok(Self { boundary })
    }

    pub fn base_path(&self) -> &Path {
        Path::new(self.boundary.interop_path())
    }

    /// 存储图像字节，`index` 为该图像在报告中的显示顺序
    pub async fn store(
        &self,
        report_id: Uuid,
        data: &[u8],
        extension: &str,
        index: usize,
    ) -> Result<ImageRef> {
        if data.is_empty() {
            return Err(PacsError::Validation("image data is empty".to_string()));
        }
        let extension = normalize_extension(extension)?;

        let relative = format!(
            "reports/{}/{}.{}",
            report_id,
            calculate_hash(data),
            extension
        );
        let target = self.resolve(&relative)?;

        if target.exists() {
            debug!("图像已存在，复用: {}", relative);
        } else {
            if let Some(parent) = Path::new(target.interop_path()).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(target.interop_path(), data).await?;
            info!("存储报告 {} 的图像，大小: {} bytes", report_id, data.len());
        }

        Ok(ImageRef {
            path: relative,
            index,
        })
    }

    /// 读取图像
    pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let target = self.resolve(path)?;
        match tokio::fs::read(target.interop_path()).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PacsError::NotFound(format!("image {}", path)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 删除图像；文件不存在时视为成功
    pub async fn remove(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(target.interop_path()).await {
            Ok(()) => {
                debug!("删除图像: {}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// 将相对路径解析为存储根目录内的路径
    ///
    /// 符号链接解析后仍须位于根目录内，否则返回校验错误。
    pub fn resolve(&self, path: &str) -> Result<StrictPath> {
        if path.trim().is_empty() {
            return Err(PacsError::Validation("image path is empty".to_string()));
        }
        self.boundary.strict_join(path).map_err(|e| match e {
            StrictPathError::PathEscapesBoundary { .. } => {
                warn!("拒绝越出存储根目录的图像路径: {}", path);
                PacsError::Validation(format!("image path must stay inside the store: {}", path))
            }
            other => PacsError::Storage(format!("cannot resolve image path {}: {}", path, other)),
        })
    }
}

fn normalize_extension(extension: &str) -> Result<String> {
    let extension = extension.trim().trim_start_matches('.').to_ascii_lowercase();
    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PacsError::Validation(format!(
            "invalid image extension: {:?}",
            extension
        )));
    }
    Ok(extension)
}

/// 计算内容哈希值
fn calculate_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_store_and_read() {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path()).unwrap();
        let report_id = Uuid::new_v4();

        let image = store.store(report_id, b"pixels", ".PNG", 2).await.unwrap();
        assert_eq!(image.index, 2);
        assert!(image.path.starts_with(&format!("reports/{}/", report_id)));
        assert!(image.path.ends_with(".png"));

        assert_eq!(store.read(&image.path).await.unwrap(), b"pixels");
    }

    #[tokio::test]
    async fn test_identical_bytes_same_path() {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path()).unwrap();
        let report_id = Uuid::new_v4();

        let first = store.store(report_id, b"same", "jpg", 0).await.unwrap();
        let second = store.store(report_id, b"same", "jpg", 1).await.unwrap();
        let other = store.store(report_id, b"different", "jpg", 2).await.unwrap();

        assert_eq!(first.path, second.path);
        assert_ne!(first.path, other.path);
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path()).unwrap();
        let report_id = Uuid::new_v4();

        assert!(matches!(
            store.store(report_id, b"", "png", 0).await,
            Err(PacsError::Validation(_))
        ));
        assert!(matches!(
            store.store(report_id, b"x", "p/ng", 0).await,
            Err(PacsError::Validation(_))
        ));
        assert!(matches!(
            store.read("../secret").await,
            Err(PacsError::Validation(_))
        ));
        assert!(matches!(
            store.read("/etc/passwd").await,
            Err(PacsError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_read_missing_and_remove() {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path()).unwrap();
        let image = store.store(Uuid::new_v4(), b"bytes", "png", 0).await.unwrap();

        store.remove(&image.path).await.unwrap();
        assert!(matches!(
            store.read(&image.path).await,
            Err(PacsError::NotFound(_))
        ));
        // 重复删除不报错
        store.remove(&image.path).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_out_of_store_is_rejected() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        std::fs::write(outside.path().join("secret.png"), b"outside").unwrap();

        let store = ImageStore::new(dir.path()).unwrap();
        std::fs::create_dir_all(dir.path().join("reports")).unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("reports/linked")).unwrap();

        assert!(matches!(
            store.read("reports/linked/secret.png").await,
            Err(PacsError::Validation(_))
        ));
        assert!(matches!(
            store.remove("reports/linked/secret.png").await,
            Err(PacsError::Validation(_))
        ));
        assert!(outside.path().join("secret.png").exists());
    }

    #[tokio::test]
    async fn test_new_creates_missing_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested/images");

        let store = ImageStore::new(&root).unwrap();
        assert!(root.is_dir());

        let image = store.store(Uuid::new_v4(), b"bytes", "png", 0).await.unwrap();
        assert_eq!(store.read(&image.path).await.unwrap(), b"bytes");
    }
}
