//! Path-pattern filters handed to [`fswatch_debounce::WatchConfig::with_filter`]:
//! a set of ignored directory names plus a set of entity-name regexes, with
//! an optional extension allow-list layered on top.

use fswatch_types::ChangeKind;
use regex::Regex;
use std::path::Path;

const DEFAULT_IGNORE_DIRS: &[&str] = &[
    "__pycache__",
    ".git",
    ".hg",
    ".svn",
    ".tox",
    ".venv",
    "target",
    "node_modules",
    ".idea",
];

const DEFAULT_IGNORE_ENTITY_PATTERNS: &[&str] = &[
    r"\.py[cod]$",
    r"\.___jb_.*___$",
    r"\.sw.$",
    r"~$",
    r"^\.#",
    r"^\.DS_Store$",
    r"^flycheck_",
];

/// A path-pattern filter: ignores a fixed set of directory names anywhere
/// in a changed path, plus any entity name matching one of a set of
/// regexes.
#[derive(Clone)]
pub struct DefaultFilter {
    ignore_dirs: Vec<String>,
    ignore_entity_regexes: Vec<Regex>,
}

impl DefaultFilter {
    /// The default ignore set: VCS directories, virtualenvs, build output,
    /// editor swap files and OS metadata files.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_extra_ignore_dirs(&[])
    }

    /// Default ignore set plus additional directory names to ignore
    /// (CLI's `--ignore-paths`).
    pub fn with_extra_ignore_dirs(extra: &[String]) -> anyhow::Result<Self> {
        let mut ignore_dirs: Vec<String> = DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect();
        ignore_dirs.extend(extra.iter().cloned());

        let ignore_entity_regexes = DEFAULT_IGNORE_ENTITY_PATTERNS
            .iter()
            .map(|p| Regex::new(p).map_err(anyhow::Error::from))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            ignore_dirs,
            ignore_entity_regexes,
        })
    }

    fn allows(&self, path: &Path) -> bool {
        let parts: Vec<_> = path.components().filter_map(|c| c.as_os_str().to_str()).collect();
        if parts.iter().any(|p| self.ignore_dirs.iter().any(|d| d == p)) {
            return false;
        }
        let Some(entity_name) = parts.last() else {
            return true;
        };
        !self.ignore_entity_regexes.iter().any(|re| re.is_match(entity_name))
    }

    /// Build a boxed predicate suitable for `WatchConfig::with_filter`.
    pub fn into_predicate(self) -> impl Fn(ChangeKind, &Path) -> bool + Send + Sync + 'static {
        move |_kind, path| self.allows(path)
    }
}

/// [`DefaultFilter`] plus an extension allow-list — the CLI's
/// `--filter default` versus an extension-scoped filter selected by
/// `--extensions`.
#[derive(Clone)]
pub struct ExtensionFilter {
    base: DefaultFilter,
    extensions: Vec<String>,
}

impl ExtensionFilter {
    /// Only paths ending in one of `extensions` (each including its dot,
    /// e.g. `".rs"`) survive, in addition to the base ignore rules.
    pub fn new(base: DefaultFilter, extensions: Vec<String>) -> Self {
        Self { base, extensions }
    }

    fn allows(&self, path: &Path) -> bool {
        let matches_extension = path
            .to_str()
            .map(|s| self.extensions.iter().any(|ext| s.ends_with(ext.as_str())))
            .unwrap_or(false);
        matches_extension && self.base.allows(path)
    }

    /// Build a boxed predicate suitable for `WatchConfig::with_filter`.
    pub fn into_predicate(self) -> impl Fn(ChangeKind, &Path) -> bool + Send + Sync + 'static {
        move |_kind, path| self.allows(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn default_filter_ignores_vcs_dirs() {
        let filter = DefaultFilter::new().unwrap();
        assert!(!filter.allows(&PathBuf::from("/repo/.git/HEAD")));
        assert!(!filter.allows(&PathBuf::from("/repo/node_modules/lib/index.js")));
        assert!(filter.allows(&PathBuf::from("/repo/src/main.rs")));
    }

    #[test]
    fn default_filter_ignores_swap_and_ds_store() {
        let filter = DefaultFilter::new().unwrap();
        assert!(!filter.allows(&PathBuf::from("/repo/src/main.rs.swp")));
        assert!(!filter.allows(&PathBuf::from("/repo/.DS_Store")));
        assert!(!filter.allows(&PathBuf::from("/repo/src/main.rs~")));
    }

    #[test]
    fn extra_ignore_dirs_are_respected() {
        let filter = DefaultFilter::with_extra_ignore_dirs(&["dist".to_string()]).unwrap();
        assert!(!filter.allows(&PathBuf::from("/repo/dist/bundle.js")));
    }

    #[test]
    fn extension_filter_requires_matching_suffix() {
        let base = DefaultFilter::new().unwrap();
        let filter = ExtensionFilter::new(base, vec![".rs".to_string()]);
        assert!(filter.allows(&PathBuf::from("/repo/src/main.rs")));
        assert!(!filter.allows(&PathBuf::from("/repo/README.md")));
    }
}
