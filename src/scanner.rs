use crate::error::{Error, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// File scanner for a generated TypeScript SDK.
///
/// The SDK is expected to keep model classes and API classes in two sibling directories
/// (`model/` and `api/` by default). Both trees are walked in file-name order so that the
/// resulting unit lists, and everything folded from them, are deterministic.
///
/// # Example
///
/// ```no_run
/// use openapi_from_sdk::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./sdk"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} model and {} API units", result.model_files.len(), result.api_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
    api_dir: String,
    model_dir: String,
}

/// Result of a scan: source units in traversal order plus any warnings.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub model_files: Vec<PathBuf>,
    pub api_files: Vec<PathBuf>,
    /// Warning messages for entries that could not be read
    pub warnings: Vec<String>,
}

impl ScanResult {
    pub fn total(&self) -> usize {
        self.model_files.len() + self.api_files.len()
    }
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            api_dir: "api".to_string(),
            model_dir: "model".to_string(),
        }
    }

    /// Overrides the API and model directory names under the root.
    pub fn with_dirs(mut self, api_dir: impl Into<String>, model_dir: impl Into<String>) -> Self {
        self.api_dir = api_dir.into();
        self.model_dir = model_dir.into();
        self
    }

    pub fn api_root(&self) -> PathBuf {
        self.root_path.join(&self.api_dir)
    }

    pub fn model_root(&self) -> PathBuf {
        self.root_path.join(&self.model_dir)
    }

    /// Collects model units (`*.ts` except `models.ts`) and API units (`*Api.ts`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceRootMissing`] if either root directory does not exist. Unreadable
    /// entries below the roots only produce warnings.
    pub fn scan(&self) -> Result<ScanResult> {
        let model_root = self.model_root();
        let api_root = self.api_root();
        for root in [&model_root, &api_root] {
            if !root.is_dir() {
                return Err(Error::SourceRootMissing(root.clone()));
            }
        }

        let mut warnings = Vec::new();
        let model_files = walk(&model_root, is_model_unit, &mut warnings);
        let api_files = walk(&api_root, is_api_unit, &mut warnings);
        let result = ScanResult {
            model_files,
            api_files,
            warnings,
        };

        debug!(
            "Scanned {}: {} model units, {} API units",
            self.root_path.display(),
            result.model_files.len(),
            result.api_files.len()
        );
        Ok(result)
    }
}

fn walk(root: &Path, accept: fn(&str) -> bool, warnings: &mut Vec<String>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e))
    {
        match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                if accept(&name) {
                    files.push(entry.into_path());
                }
            }
            Err(e) => {
                let warning = format!("Failed to access path: {}", e);
                warn!("{}", warning);
                warnings.push(warning);
            }
        }
    }
    files
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.file_type().is_dir() && (name.starts_with('.') || name == "node_modules")
}

fn is_model_unit(file_name: &str) -> bool {
    file_name.ends_with(".ts") && !file_name.ends_with(".d.ts") && file_name != "models.ts"
}

fn is_api_unit(file_name: &str) -> bool {
    file_name.ends_with("Api.ts")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sdk_root() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("model")).unwrap();
        fs::create_dir_all(temp_dir.path().join("api")).unwrap();
        temp_dir
    }

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_scan_filters_units() {
        let temp_dir = sdk_root();
        let root = temp_dir.path();

        fs::write(root.join("model/item.ts"), "export class Item {}").unwrap();
        fs::write(root.join("model/models.ts"), "export * from './item';").unwrap();
        fs::write(root.join("model/readme.md"), "# README").unwrap();
        fs::write(root.join("api/productApi.ts"), "export class ProductApi {}").unwrap();
        fs::write(root.join("api/apis.ts"), "export * from './productApi';").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(names(&result.model_files), vec!["item.ts"]);
        assert_eq!(names(&result.api_files), vec!["productApi.ts"]);
        assert_eq!(result.total(), 2);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_scan_order_is_sorted_and_nested() {
        let temp_dir = sdk_root();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("model/order/v202309")).unwrap();
        fs::write(root.join("model/zeta.ts"), "").unwrap();
        fs::write(root.join("model/alpha.ts"), "").unwrap();
        fs::write(root.join("model/order/v202309/line.ts"), "").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();
        assert_eq!(names(&result.model_files), vec!["alpha.ts", "line.ts", "zeta.ts"]);
    }

    #[test]
    fn test_scan_skips_hidden_and_node_modules() {
        let temp_dir = sdk_root();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("model/.cache")).unwrap();
        fs::create_dir_all(root.join("model/node_modules/pkg")).unwrap();
        fs::write(root.join("model/.cache/stale.ts"), "").unwrap();
        fs::write(root.join("model/node_modules/pkg/index.ts"), "").unwrap();
        fs::write(root.join("model/item.ts"), "").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();
        assert_eq!(names(&result.model_files), vec!["item.ts"]);
    }

    #[test]
    fn test_scan_custom_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src/models")).unwrap();
        fs::create_dir_all(root.join("src/apis")).unwrap();
        fs::write(root.join("src/apis/orderApi.ts"), "").unwrap();

        let result = FileScanner::new(root.to_path_buf())
            .with_dirs("src/apis", "src/models")
            .scan()
            .unwrap();
        assert_eq!(names(&result.api_files), vec!["orderApi.ts"]);
        assert!(result.model_files.is_empty());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("model")).unwrap();

        let err = FileScanner::new(temp_dir.path().to_path_buf()).scan().unwrap_err();
        match err {
            Error::SourceRootMissing(path) => assert!(path.ends_with("api")),
            other => panic!("unexpected error: {}", other),
        }
    }
}
