//! Session-scoped directory handles
//!
//! Paths are derived from an anchor: the directory that holds a crate's
//! integration tests. The data directory sits inside the anchor, the config
//! directory beside it:
//!
//! ```text
//! <crate>/
//! ├── config/        config_dir()
//! └── tests/         anchor
//!     └── data/      test_data_dir()
//! ```
//!
//! Nothing here checks that the directories exist. A missing directory
//! surfaces as an ordinary I/O error in whichever test reads from it.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Data and config directories computed from a tests anchor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPaths {
    anchor: PathBuf,
    data_dir: PathBuf,
    config_dir: PathBuf,
}

impl TestPaths {
    /// Compute both directories from `anchor`
    ///
    /// Relative anchors are resolved against the current directory without
    /// touching the filesystem.
    pub fn from_anchor(anchor: impl AsRef<Path>) -> Self {
        let anchor = absolute(anchor.as_ref());
        let data_dir = anchor.join("data");
        let config_dir = anchor
            .parent()
            .map_or_else(|| anchor.join("config"), |parent| parent.join("config"));

        Self {
            anchor,
            data_dir,
            config_dir,
        }
    }

    pub fn anchor(&self) -> &Path {
        &self.anchor
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of a file inside the data directory
    pub fn data_file(&self, name: impl AsRef<Path>) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Path of a file inside the config directory
    pub fn config_file(&self, name: impl AsRef<Path>) -> PathBuf {
        self.config_dir.join(name)
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Paths for the crate that invokes the macro
///
/// Expands `env!("CARGO_MANIFEST_DIR")` at the call site, so each consuming
/// crate gets its own `tests/data` and `config` directories.
#[macro_export]
macro_rules! test_paths {
    () => {
        $crate::TestPaths::from_anchor(::std::concat!(::std::env!("CARGO_MANIFEST_DIR"), "/tests"))
    };
}

static SESSION_PATHS: OnceLock<TestPaths> = OnceLock::new();

/// Install the session's paths before any fixture computes them
///
/// Crates other than this one call this with `test_paths!()` so the
/// fixtures point at their own directories. Returns the rejected value if
/// the paths were already fixed for this session.
pub fn set_session_paths(paths: TestPaths) -> Result<(), TestPaths> {
    SESSION_PATHS.set(paths)
}

/// The paths for this session, computed on first use
pub fn session_paths() -> &'static TestPaths {
    SESSION_PATHS.get_or_init(|| test_paths!())
}

/// The `data` directory alongside the tests anchor
pub fn test_data_dir() -> &'static Path {
    session_paths().data_dir()
}

/// The `config` directory beside the tests anchor
pub fn config_dir() -> &'static Path {
    session_paths().config_dir()
}
