#![warn(missing_docs)]
//! Test surfaces for worldtests: metrics reports and scratch directories.

mod metrics;

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub use metrics::*;

/// A uniquely named directory under the system temp dir, removed on drop.
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create `<tmp>/<label>_<nanos>`.
    pub fn new(label: &str) -> Result<Self> {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let path = std::env::temp_dir().join(format!("{label}_{nanos}"));
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        fs::remove_dir_all(&self.path).ok();
    }
}

/// Where worldtests write their metrics JSON (`target/metrics/<name>.json`).
pub fn metrics_path(test_name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../target/metrics")
        .join(format!("{test_name}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_dir_is_removed_on_drop() {
        let path = {
            let dir = ScratchDir::new("terra-scratch").expect("scratch dir");
            assert!(dir.path().is_dir());
            dir.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn metrics_path_is_named_after_test() {
        let path = metrics_path("vein_worldtest");
        assert!(path.ends_with("metrics/vein_worldtest.json"));
    }
}
