//! On-disk driver spec discovery.
//!
//! Each driver is registered on the host as a single file in one of the
//! configured driver directories, named `<driver>.<ext>`:
//!
//! * `<driver>.sock` — the listening unix socket itself;
//! * `<driver>.spec` — one line of raw address text;
//! * `<driver>.json` — `{"Address": "<raw address>"}`.
//!
//! [`DriverScanner::discover`] walks the directories in caller-supplied
//! order and the extensions in fixed precedence (`sock` over `spec` over
//! `json`), inserting first-writer-wins.  That single rule enforces both
//! precedence axes at once: within a directory an earlier extension wins,
//! and across directories the earlier-listed directory wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::VolmanError;

/// The kind of spec file a driver was discovered through, which determines
/// how its transport address is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecKind {
    /// `<driver>.sock` — the file is the listening unix socket.
    Sock,
    /// `<driver>.spec` — first line is the raw address.
    Spec,
    /// `<driver>.json` — JSON object with an `Address` field.
    Json,
}

impl SpecKind {
    /// Extension precedence order used by discovery.
    pub const PRECEDENCE: [SpecKind; 3] = [SpecKind::Sock, SpecKind::Spec, SpecKind::Json];

    /// File extension for this spec kind, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            SpecKind::Sock => "sock",
            SpecKind::Spec => "spec",
            SpecKind::Json => "json",
        }
    }
}

/// One discovered driver spec file.
///
/// Ephemeral: rebuilt on every discovery pass, never cached across passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSpec {
    /// Driver name, derived from the spec file name.
    pub name: String,
    /// How the spec encodes its address.
    pub kind: SpecKind,
    /// Full path of the spec file.
    pub path: PathBuf,
}

/// Scans an ordered list of driver directories for spec files.
#[derive(Debug, Clone)]
pub struct DriverScanner {
    driver_paths: Vec<PathBuf>,
}

impl DriverScanner {
    /// Create a scanner over `driver_paths`, in precedence order.
    pub fn new<I, P>(driver_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            driver_paths: driver_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// The configured driver directories, in precedence order.
    pub fn driver_paths(&self) -> &[PathBuf] {
        &self.driver_paths
    }

    /// Run one discovery pass and return the winning spec per driver name.
    ///
    /// A glob pattern error is fatal to the whole pass and reported as
    /// [`VolmanError::InvalidDriverPath`]; an individual unreadable match is
    /// skipped with a warning.  A missing or empty directory simply
    /// contributes no drivers.
    pub fn discover(&self) -> Result<BTreeMap<String, DriverSpec>, VolmanError> {
        let mut specs = BTreeMap::new();
        for dir in &self.driver_paths {
            for kind in SpecKind::PRECEDENCE {
                let pattern = format!("{}/*.{}", dir.display(), kind.extension());
                let matches =
                    glob::glob(&pattern).map_err(|e| VolmanError::InvalidDriverPath {
                        path: dir.display().to_string(),
                        cause: e.to_string(),
                    })?;
                for entry in matches {
                    let path = match entry {
                        Ok(path) => path,
                        Err(e) => {
                            warn!(error = %e, "skipping unreadable driver spec");
                            continue;
                        }
                    };
                    let Some(name) = driver_name(&path) else {
                        continue;
                    };
                    specs.entry(name.to_owned()).or_insert_with(|| DriverSpec {
                        name: name.to_owned(),
                        kind,
                        path: path.clone(),
                    });
                }
            }
        }
        debug!(drivers = specs.len(), "driver spec discovery complete");
        Ok(specs)
    }
}

/// Derive the driver name from a spec file path: everything before the first
/// dot of the file name.
fn driver_name(path: &Path) -> Option<&str> {
    path.file_name()?.to_str()?.split('.').next()
}

/// Write a driver spec file of the given kind into `dir`, creating the
/// directory if needed.  Returns the path written.
///
/// Used by driver installers and by tests to register drivers.
pub async fn write_driver_spec(
    dir: &Path,
    name: &str,
    kind: SpecKind,
    contents: &[u8],
) -> Result<PathBuf, VolmanError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(VolmanError::internal)?;
    let path = dir.join(format!("{name}.{}", kind.extension()));
    tokio::fs::write(&path, contents)
        .await
        .map_err(VolmanError::internal)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn finds_nothing_in_missing_directory() {
        let scanner = DriverScanner::new(["/nonexistent/drivers/path"]);
        let specs = scanner.discover().expect("discover");
        assert!(specs.is_empty());
    }

    #[tokio::test]
    async fn extension_precedence_within_one_directory() {
        let dir = tempdir().expect("tempdir");
        write_driver_spec(dir.path(), "foo", SpecKind::Json, b"{\"Address\":\"127.0.0.1:1\"}")
            .await
            .expect("write json");
        write_driver_spec(dir.path(), "foo", SpecKind::Spec, b"127.0.0.1:2")
            .await
            .expect("write spec");
        write_driver_spec(dir.path(), "foo", SpecKind::Sock, b"")
            .await
            .expect("write sock");

        let scanner = DriverScanner::new([dir.path()]);
        let specs = scanner.discover().expect("discover");
        assert_eq!(specs.len(), 1);
        assert_eq!(specs["foo"].kind, SpecKind::Sock);
    }

    #[tokio::test]
    async fn spec_beats_json() {
        let dir = tempdir().expect("tempdir");
        write_driver_spec(dir.path(), "foo", SpecKind::Json, b"{\"Address\":\"127.0.0.1:1\"}")
            .await
            .expect("write json");
        write_driver_spec(dir.path(), "foo", SpecKind::Spec, b"127.0.0.1:2")
            .await
            .expect("write spec");

        let scanner = DriverScanner::new([dir.path()]);
        let specs = scanner.discover().expect("discover");
        assert_eq!(specs["foo"].kind, SpecKind::Spec);
    }

    #[tokio::test]
    async fn earlier_directory_wins_for_same_name() {
        let first = tempdir().expect("tempdir");
        let second = tempdir().expect("tempdir");
        write_driver_spec(first.path(), "foo", SpecKind::Spec, b"127.0.0.1:1")
            .await
            .expect("write first");
        write_driver_spec(second.path(), "foo", SpecKind::Spec, b"127.0.0.1:2")
            .await
            .expect("write second");

        let scanner = DriverScanner::new([first.path(), second.path()]);
        let specs = scanner.discover().expect("discover");
        assert_eq!(specs.len(), 1);
        assert_eq!(specs["foo"].path.parent(), Some(first.path()));
    }

    #[tokio::test]
    async fn directory_order_beats_extension_order_across_directories() {
        // First directory has only a .json, second has a .spec: the earlier
        // directory still wins because the directory loop is outer.
        let first = tempdir().expect("tempdir");
        let second = tempdir().expect("tempdir");
        write_driver_spec(first.path(), "foo", SpecKind::Json, b"{\"Address\":\"addr1\"}")
            .await
            .expect("write json");
        write_driver_spec(second.path(), "foo", SpecKind::Spec, b"addr2")
            .await
            .expect("write spec");

        let scanner = DriverScanner::new([first.path(), second.path()]);
        let specs = scanner.discover().expect("discover");
        assert_eq!(specs["foo"].kind, SpecKind::Json);
        assert_eq!(specs["foo"].path.parent(), Some(first.path()));
    }

    #[tokio::test]
    async fn distinct_names_across_directories_all_found() {
        let first = tempdir().expect("tempdir");
        let second = tempdir().expect("tempdir");
        write_driver_spec(first.path(), "foo", SpecKind::Spec, b"127.0.0.1:1")
            .await
            .expect("write foo");
        write_driver_spec(second.path(), "bar", SpecKind::Json, b"{\"Address\":\"127.0.0.1:2\"}")
            .await
            .expect("write bar");

        let scanner = DriverScanner::new([first.path(), second.path()]);
        let specs = scanner.discover().expect("discover");
        assert_eq!(specs.len(), 2);
        assert!(specs.contains_key("foo"));
        assert!(specs.contains_key("bar"));
    }

    #[tokio::test]
    async fn name_is_text_before_first_dot() {
        let dir = tempdir().expect("tempdir");
        write_driver_spec(dir.path(), "foo.bar", SpecKind::Spec, b"127.0.0.1:1")
            .await
            .expect("write");

        let scanner = DriverScanner::new([dir.path()]);
        let specs = scanner.discover().expect("discover");
        assert!(specs.contains_key("foo"));
    }

    #[test]
    fn invalid_glob_pattern_is_fatal() {
        // An unclosed character class makes the glob pattern invalid.
        let scanner = DriverScanner::new(["/tmp/bad[path"]);
        let err = scanner.discover().unwrap_err();
        assert!(matches!(err, VolmanError::InvalidDriverPath { .. }));
    }
}
