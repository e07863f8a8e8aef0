//! Local filesystem implementation of [`ScannerService`].

use std::{
    collections::BTreeMap,
    ffi::OsStr,
    fs,
    path::Path,
};

use {
    async_trait::async_trait,
    ragkit_service_traits::{
        DirectoryTreeNode, FileTypeInfo, FolderScanResult, FolderValidation, ScanRequest,
        ScannerService, ServiceResult,
    },
    tracing::debug,
    walkdir::WalkDir,
};

use crate::tree_stats::ExclusionSet;

/// Extensions the ingestion pipeline can parse, with their display names.
pub const SUPPORTED_FILE_TYPES: &[(&str, &str)] = &[
    ("pdf", "PDF"),
    ("docx", "Word"),
    ("doc", "Word"),
    ("md", "Markdown"),
    ("txt", "Text"),
    ("html", "HTML"),
    ("csv", "CSV"),
    ("rst", "ReStructuredText"),
    ("xml", "XML"),
    ("json", "JSON"),
    ("yaml", "YAML"),
];

/// Levels of subfolders listed in the returned tree. Deeper folders still
/// count toward their ancestors' totals.
const TREE_DEPTH: usize = 3;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Scans folders on the local disk. Hidden directories are skipped and
/// symlinks are not followed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsScanner;

#[async_trait]
impl ScannerService for FsScanner {
    async fn validate_folder(&self, path: &str, _recursive: bool) -> ServiceResult<FolderValidation> {
        let root = Path::new(path);
        let error = if !root.exists() {
            Some("Folder does not exist.")
        } else if !root.is_dir() {
            Some("Path is not a directory.")
        } else {
            None
        };
        if let Some(error) = error {
            return Ok(FolderValidation {
                valid: false,
                error: Some(error.into()),
                tree: None,
            });
        }

        let tree = build_tree(root, 0);
        debug!(path, files = tree.file_count, bytes = tree.size_bytes, "scanned folder tree");
        Ok(FolderValidation {
            valid: true,
            error: None,
            tree: Some(tree),
        })
    }

    async fn scan_folder(&self, request: &ScanRequest) -> ServiceResult<FolderScanResult> {
        let root = Path::new(&request.folder_path);
        if !root.is_dir() {
            return Ok(FolderScanResult::default());
        }

        let excluded: ExclusionSet = request.excluded_dirs.iter().map(String::as_str).collect();
        let mut walker = WalkDir::new(root).min_depth(1);
        if !request.recursive {
            walker = walker.max_depth(1);
        }

        // extension -> (count, bytes)
        let mut by_extension: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        let entries = walker.into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !(is_hidden(entry.file_name())
                    || excluded.contains(&entry.path().to_string_lossy()))
        });
        for entry in entries.flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let extension = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_ascii_lowercase();
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let slot = by_extension.entry(extension).or_default();
            slot.0 += 1;
            slot.1 = slot.1.saturating_add(size);
        }

        let mut types: Vec<(String, (u64, u64))> = by_extension.into_iter().collect();
        types.sort_by(|a, b| b.1.0.cmp(&a.1.0).then_with(|| a.0.cmp(&b.0)));

        let mut result = FolderScanResult::default();
        let mut total_bytes = 0u64;
        for (extension, (count, bytes)) in types {
            result.total_files += count;
            total_bytes = total_bytes.saturating_add(bytes);
            let display_name = SUPPORTED_FILE_TYPES
                .iter()
                .find(|(ext, _)| *ext == extension)
                .map(|(_, name)| (*name).to_string());
            let info = FileTypeInfo {
                supported: display_name.is_some(),
                display_name: display_name.unwrap_or_else(|| extension.to_uppercase()),
                extension,
                count,
                size_mb: round_mb(bytes),
            };
            if info.supported {
                result.supported_types.push(info);
            } else {
                result.unsupported_types.push(info);
            }
        }
        result.total_size_mb = round_mb(total_bytes);
        debug!(
            path = %request.folder_path,
            files = result.total_files,
            excluded = excluded.len(),
            "scanned folder file types"
        );
        Ok(result)
    }
}

fn build_tree(path: &Path, depth: usize) -> DirectoryTreeNode {
    let mut files = 0u64;
    let mut size = 0u64;
    let mut children = Vec::new();

    let mut entries: Vec<fs::DirEntry> = match fs::read_dir(path) {
        Ok(entries) => entries.flatten().collect(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "cannot list folder");
            Vec::new()
        },
    };
    entries.sort_by_key(|e| e.file_name().to_ascii_lowercase());

    for entry in entries {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if is_hidden(&entry.file_name()) {
                continue;
            }
            let child = build_tree(&entry.path(), depth + 1);
            files = files.saturating_add(child.file_count);
            size = size.saturating_add(child.size_bytes);
            if depth < TREE_DEPTH {
                children.push(child);
            }
        } else if file_type.is_file() {
            files += 1;
            size = size.saturating_add(entry.metadata().map(|m| m.len()).unwrap_or(0));
        }
    }

    DirectoryTreeNode::new(path.to_string_lossy(), files, size).with_children(children)
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn round_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::tree_stats::validate_tree, tempfile::TempDir};

    /// root/            a.md, b.pdf
    /// root/notes/      c.md
    /// root/notes/old/  d.bin
    /// root/.git/       e.txt (hidden)
    fn sample_dir() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("notes").join("old")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("a.md"), "aaaa").unwrap();
        fs::write(root.join("b.pdf"), "bb").unwrap();
        fs::write(root.join("notes").join("c.md"), "c").unwrap();
        fs::write(root.join("notes").join("old").join("d.bin"), "dddddd").unwrap();
        fs::write(root.join(".git").join("e.txt"), "e").unwrap();
        temp
    }

    fn path_of(temp: &TempDir, rel: &str) -> String {
        temp.path().join(rel).to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn tree_aggregates_subfolders_and_skips_hidden() {
        let temp = sample_dir();
        let root = temp.path().to_string_lossy().into_owned();
        let validation = FsScanner.validate_folder(&root, true).await.unwrap();
        assert!(validation.valid);

        let tree = validation.tree.unwrap();
        assert_eq!(tree.file_count, 4);
        assert_eq!(tree.size_bytes, 13);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].path, path_of(&temp, "notes"));
        assert_eq!(tree.children[0].file_count, 2);
        assert!(validate_tree(&tree).is_ok());
    }

    #[tokio::test]
    async fn missing_folder_is_invalid() {
        let temp = TempDir::new().unwrap();
        let missing = path_of(&temp, "nope");
        let validation = FsScanner.validate_folder(&missing, true).await.unwrap();
        assert!(!validation.valid);
        assert_eq!(validation.error.as_deref(), Some("Folder does not exist."));

        let file = path_of(&temp, "file.txt");
        fs::write(&file, "x").unwrap();
        let validation = FsScanner.validate_folder(&file, true).await.unwrap();
        assert_eq!(validation.error.as_deref(), Some("Path is not a directory."));
    }

    #[tokio::test]
    async fn scan_groups_by_extension_and_honours_exclusions() {
        let temp = sample_dir();
        let request = ScanRequest {
            folder_path: temp.path().to_string_lossy().into_owned(),
            recursive: true,
            excluded_dirs: Vec::new(),
        };
        let result = FsScanner.scan_folder(&request).await.unwrap();
        assert_eq!(result.total_files, 4);
        assert_eq!(result.supported_types[0].extension, "md");
        assert_eq!(result.supported_types[0].count, 2);
        assert_eq!(result.supported_types[0].display_name, "Markdown");
        assert_eq!(result.unsupported_types.len(), 1);
        assert_eq!(result.unsupported_types[0].display_name, "BIN");

        let request = ScanRequest {
            excluded_dirs: vec![path_of(&temp, "notes/old")],
            ..request
        };
        let result = FsScanner.scan_folder(&request).await.unwrap();
        assert_eq!(result.total_files, 3);
        assert!(result.unsupported_types.is_empty());

        let request = ScanRequest {
            recursive: false,
            excluded_dirs: Vec::new(),
            ..request
        };
        assert_eq!(FsScanner.scan_folder(&request).await.unwrap().total_files, 2);
    }
}
