//! Upload storage
//!
//! Layout under the uploads root:
//! - `temp/` holds staged files between receipt and validation
//! - `<branch>/` holds placed files, one directory per branch, created lazily
//!
//! Files keep their original names. Placing a file whose name already exists
//! in the branch directory replaces it.

use std::path::PathBuf;

use super::branches::Branch;
use super::enhanced_error::{file_ops, file_operation_error, EnhancedError};

/// Name of the staging directory under the uploads root
pub const TEMP_DIR: &str = "temp";

/// A file written to the staging directory and not yet placed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub filename: String,
    pub path: PathBuf,
}

/// Check that a client-supplied filename is a single plain path component
pub fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename != "."
        && filename != ".."
        && !filename.contains(['/', '\\', '\0'])
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(TEMP_DIR)
    }

    pub fn branch_dir(&self, branch: Branch) -> PathBuf {
        self.root.join(branch.as_str())
    }

    /// Create the staging directory. Called once at startup.
    pub fn prepare(&self) -> Result<(), EnhancedError> {
        file_ops::create_dir_all(self.temp_dir())
    }

    /// Write an upload into the staging directory under its original name
    ///
    /// The caller must have checked the name with [`is_safe_filename`].
    pub fn stage(&self, filename: &str, data: &[u8]) -> Result<StagedFile, EnhancedError> {
        let temp_dir = self.temp_dir();
        if !temp_dir.is_dir() {
            file_ops::create_dir_all(&temp_dir)?;
        }

        let path = temp_dir.join(filename);
        file_ops::write(&path, data)?;
        log::debug!("Staged {} ({} bytes)", path.display(), data.len());

        Ok(StagedFile {
            filename: filename.to_string(),
            path,
        })
    }

    /// Remove a staged file that failed validation
    pub fn discard(&self, staged: &StagedFile) {
        if let Err(e) = file_ops::remove_file(&staged.path) {
            log::warn!("Could not clean up staged upload: {}", e);
        }
    }

    /// Move a staged file into its branch directory, replacing any file of
    /// the same name. On failure the staged file is left where it is.
    pub fn place(&self, staged: &StagedFile, branch: Branch) -> Result<PathBuf, EnhancedError> {
        let branch_dir = self.branch_dir(branch);
        if !branch_dir.exists() {
            file_ops::create_dir_all(&branch_dir)?;
        }

        let final_path = branch_dir.join(&staged.filename);
        file_ops::rename(&staged.path, &final_path)?;
        Ok(final_path)
    }

    /// Entry names of a branch directory in directory order.
    /// A branch nobody has uploaded to yet lists as empty.
    pub fn list(&self, branch: Branch) -> Result<Vec<String>, EnhancedError> {
        let branch_dir = self.branch_dir(branch);
        if !branch_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = match file_ops::read_dir(&branch_dir) {
            Ok(entries) => entries,
            Err(e) if e.io_kind() == Some(std::io::ErrorKind::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| file_operation_error("read_dir", &branch_dir, e))?;
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn adama() -> Branch {
        Branch::parse("adama").unwrap()
    }

    #[test]
    fn test_safe_filenames() {
        assert!(is_safe_filename("report.pdf"));
        assert!(is_safe_filename(".hidden"));
        assert!(is_safe_filename("two words.txt"));
        assert!(!is_safe_filename(""));
        assert!(!is_safe_filename("."));
        assert!(!is_safe_filename(".."));
        assert!(!is_safe_filename("../adama/x.txt"));
        assert!(!is_safe_filename("C:\\fakepath\\x.txt"));
        assert!(!is_safe_filename("nul\0byte"));
    }

    #[test]
    fn test_prepare_creates_temp_dir() {
        let dir = tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"));

        store.prepare().unwrap();
        assert!(store.temp_dir().is_dir());
    }

    #[test]
    fn test_stage_then_place() {
        let dir = tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let staged = store.stage("notes.txt", b"hello").unwrap();
        assert_eq!(staged.path, dir.path().join("temp").join("notes.txt"));

        let placed = store.place(&staged, adama()).unwrap();
        assert_eq!(placed, dir.path().join("adama").join("notes.txt"));
        assert_eq!(fs::read(&placed).unwrap(), b"hello");
        assert!(!staged.path.exists());
    }

    #[test]
    fn test_place_overwrites_same_name() {
        let dir = tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let first = store.stage("same.txt", b"first").unwrap();
        store.place(&first, adama()).unwrap();
        let second = store.stage("same.txt", b"second").unwrap();
        let placed = store.place(&second, adama()).unwrap();

        assert_eq!(fs::read(placed).unwrap(), b"second");
        assert_eq!(store.list(adama()).unwrap(), vec!["same.txt".to_string()]);
    }

    #[test]
    fn test_discard_removes_staged_file() {
        let dir = tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let staged = store.stage("bad.txt", b"x").unwrap();
        store.discard(&staged);
        assert!(!staged.path.exists());

        // A second discard only logs.
        store.discard(&staged);
    }

    #[test]
    fn test_failed_place_leaves_staged_file() {
        let dir = tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        // A directory in the way of the final path makes the rename fail.
        fs::create_dir_all(dir.path().join("adama").join("clash.txt").join("inner")).unwrap();
        let staged = store.stage("clash.txt", b"x").unwrap();

        let err = store.place(&staged, adama()).unwrap_err();
        assert_eq!(err.operation, "rename");
        assert!(staged.path.exists());
    }

    #[test]
    fn test_list_missing_branch_is_empty() {
        let dir = tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        assert!(store.list(Branch::parse("mekele").unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_list_returns_every_entry() {
        let dir = tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let branch_dir = dir.path().join("adama");
        fs::create_dir_all(branch_dir.join("subdir")).unwrap();
        fs::write(branch_dir.join("a.txt"), b"a").unwrap();
        fs::write(branch_dir.join(".hidden"), b"h").unwrap();

        let mut files = store.list(adama()).unwrap();
        files.sort();
        assert_eq!(files, vec![".hidden", "a.txt", "subdir"]);
    }
}
