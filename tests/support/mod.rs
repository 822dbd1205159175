use assert_cmd::{cargo::cargo_bin_cmd, Command};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fixed "now" so fallback timestamps are stable across runs
pub const FIXED_NOW: &str = "2024-06-01T12:00:00";

/// Get a Command for denotify with an isolated config directory
pub fn denotify() -> Command {
    let mut cmd = cargo_bin_cmd!("denotify");
    cmd.env("DENOTIFY_NOW", FIXED_NOW)
        .env("DENOTIFY_CONFIG_DIR", "/nonexistent/denotify-test-config")
        .env_remove("DENOTIFY_CONFIG")
        .env_remove("RUST_LOG")
        .env_remove("DENOTIFY_LOG");
    cmd
}

/// A temporary vault plus an output directory next to it
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("vault")).unwrap();
        Self { dir }
    }

    pub fn vault(&self) -> PathBuf {
        self.dir.path().join("vault")
    }

    pub fn out(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Write a file relative to the vault root
    pub fn write(&self, rel: &str, content: &str) -> &Self {
        let path = self.vault().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
        self
    }

    /// Write raw bytes relative to the vault root
    #[allow(dead_code)]
    pub fn write_bytes(&self, rel: &str, content: &[u8]) -> &Self {
        let path = self.vault().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
        self
    }

    /// Read a converted file relative to the output root
    #[allow(dead_code)]
    pub fn read_out(&self, rel: &str) -> String {
        fs::read_to_string(self.out().join(rel)).unwrap()
    }
}

/// All files under `root`, as sorted slash-separated relative paths
#[allow(dead_code)]
pub fn list_files(root: &Path) -> Vec<String> {
    if !root.exists() {
        return Vec::new();
    }
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}
