//! Backend binary discovery.
//!
//! A runtime may ship graphics backends as separate shared libraries next
//! to the host application. Discovery only catalogs what is present; it
//! never loads anything.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::GraphicsBackend;
use crate::error::{Error, Result};

/// Filename stem prefix that marks a file as a runtime backend binary.
const BACKEND_PREFIX: &str = "qar_runtime_";

/// A discovered backend binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    /// Short name, e.g. "cpu" or "gpu_vulkan".
    pub name: String,
    pub kind: GraphicsBackend,
    pub path: PathBuf,
}

/// Source of backend binaries.
pub trait BackendDiscovery {
    fn discover(&self) -> Result<Vec<Backend>>;
}

/// Scans one directory for backend shared libraries.
#[derive(Debug, Clone)]
pub struct DirectoryDiscovery {
    dir: PathBuf,
}

impl DirectoryDiscovery {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

fn is_shared_library(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("so" | "dll" | "dylib")
    )
}

impl BackendDiscovery for DirectoryDiscovery {
    fn discover(&self) -> Result<Vec<Backend>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|err| {
            Error::ResourceExhausted(format!(
                "runtime binaries directory {} is not readable: {err}",
                self.dir.display()
            ))
        })?;

        let mut backends = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| {
                Error::ResourceExhausted(format!("failed to list backend binaries: {err}"))
            })?;
            let path = entry.path();
            if !is_shared_library(&path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            // Linux-style "libqar_runtime_*.so" files carry a lib prefix.
            let stem = stem.strip_prefix("lib").unwrap_or(stem);
            let Some(name) = stem.strip_prefix(BACKEND_PREFIX) else {
                continue;
            };

            let kind = if name.contains("gpu") {
                GraphicsBackend::Gpu
            } else {
                GraphicsBackend::Cpu
            };
            debug!(name, ?kind, path = %path.display(), "discovered backend binary");
            backends.push(Backend {
                name: name.to_string(),
                kind,
                path,
            });
        }

        backends.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(backends)
    }
}
