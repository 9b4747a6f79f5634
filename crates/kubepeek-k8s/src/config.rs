//! Kubeconfig path resolution
//!
//! Precedence, highest first:
//! 1. an explicit path passed by the caller
//! 2. the `KUBECONFIG` entry of the resolver's override map
//! 3. a fallback path configured on the resolver (e.g. from a settings file)
//! 4. `<home>/.kube/config`
//!
//! The override map is owned by the resolver. The process environment is read
//! once by [`ConfigResolver::from_env`] and never written.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{ClusterError, Result};

/// Name of the override carrying a kubeconfig path
pub const KUBECONFIG_VAR: &str = "KUBECONFIG";

/// Which layer a resolved kubeconfig path came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigOrigin {
    Explicit,
    Override,
    Default,
}

/// A resolved kubeconfig location
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub origin: ConfigOrigin,
}

/// Resolves which kubeconfig file to load
#[derive(Clone, Debug, Default)]
pub struct ConfigResolver {
    overrides: HashMap<String, PathBuf>,
    fallback: Option<PathBuf>,
    home: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create a resolver with no overrides and no home directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot `KUBECONFIG` and the user's home directory from the process
    pub fn from_env() -> Self {
        let mut resolver = Self::new();
        if let Some(home) = dirs::home_dir() {
            resolver.home = Some(home);
        }
        if let Some(value) = kubeconfig_from_env() {
            resolver.overrides.insert(KUBECONFIG_VAR.to_string(), value);
        }
        resolver
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn with_override(mut self, name: &str, value: impl Into<PathBuf>) -> Self {
        self.overrides.insert(name.to_string(), value.into());
        self
    }

    /// Path used instead of `<home>/.kube/config` when no override is set
    pub fn with_fallback(mut self, path: Option<impl Into<PathBuf>>) -> Self {
        self.fallback = path.map(Into::into);
        self
    }

    /// Current value of a named override
    pub fn override_value(&self, name: &str) -> Option<&Path> {
        self.overrides.get(name).map(PathBuf::as_path)
    }

    /// Resolve the kubeconfig path for `explicit_path` (empty means "not given").
    ///
    /// When a default path is used it is recorded as the `KUBECONFIG`
    /// override, so later calls on this resolver take the override branch.
    pub fn resolve(&mut self, explicit_path: &str) -> Result<ConfigSource> {
        if !explicit_path.is_empty() {
            debug!(path = explicit_path, "using explicit kubeconfig path");
            return Ok(ConfigSource {
                path: PathBuf::from(explicit_path),
                origin: ConfigOrigin::Explicit,
            });
        }

        if let Some(value) = self.override_value(KUBECONFIG_VAR) {
            debug!(path = %value.display(), "using KUBECONFIG override");
            return Ok(ConfigSource {
                path: value.to_path_buf(),
                origin: ConfigOrigin::Override,
            });
        }

        let path = match (&self.fallback, &self.home) {
            (Some(fallback), _) => fallback.clone(),
            (None, Some(home)) => default_kubeconfig_path(home),
            (None, None) => return Err(ClusterError::MissingHome),
        };
        warn!(path = %path.display(), "KUBECONFIG not set, falling back to default path");
        self.overrides.insert(KUBECONFIG_VAR.to_string(), path.clone());

        Ok(ConfigSource {
            path,
            origin: ConfigOrigin::Default,
        })
    }
}

/// `KUBECONFIG` from the process environment. Empty counts as unset;
/// non-UTF-8 values are kept as-is.
fn kubeconfig_from_env() -> Option<PathBuf> {
    std::env::var_os(KUBECONFIG_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// `<home>/.kube/config`
pub fn default_kubeconfig_path(home: &Path) -> PathBuf {
    home.join(".kube").join("config")
}
