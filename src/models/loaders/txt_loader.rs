use crate::error::FileError;
use crate::models::item::Item;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 可作为章节的文件扩展名
const CHAPTER_EXTENSIONS: [&str; 2] = ["txt", "md"];

fn is_chapter_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| CHAPTER_EXTENSIONS.iter().any(|c| c.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// 从文件夹中加载所有章节文件，按文件名排序后编号
pub async fn load_items_from_folder(folder_path: &str) -> Result<Vec<Item>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        }
        .into());
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && is_chapter_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        match fs::read_to_string(&path).await {
            Ok(content) => {
                tracing::info!("正在加载: {} ({} 字符)", name, content.chars().count());
                items.push(Item::new(items.len(), name, content));
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(items)
}
