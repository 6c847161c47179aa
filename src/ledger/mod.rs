//! Mapping ledger: the per-copy record of every rename decision.
//!
//! Five independent maps (`files`, `directories`, `ids`, `classes`,
//! `globals`) hold original -> obfuscated names. A key, once recorded, is
//! never remapped. The ledger is owned by a single output copy and persisted
//! as a JSON snapshot next to that copy when its run ends.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::ServiceContext;

/// The five kinds of rename the ledger tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Root-relative file paths.
    Files,
    /// Original directories and the synthetic directory they were folded into.
    Directories,
    /// DOM element ids.
    Ids,
    /// CSS class names.
    Classes,
    /// Top-level script identifiers.
    Globals,
}

impl Category {
    /// Every category, in snapshot order.
    pub const ALL: [Category; 5] =
        [Category::Files, Category::Directories, Category::Ids, Category::Classes, Category::Globals];

    /// Lower-case name used in logs and snapshots.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Files => "files",
            Category::Directories => "directories",
            Category::Ids => "ids",
            Category::Classes => "classes",
            Category::Globals => "globals",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Original -> obfuscated mappings for one output copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingLedger {
    #[serde(default)]
    files: BTreeMap<String, String>,
    #[serde(default)]
    directories: BTreeMap<String, String>,
    #[serde(default)]
    ids: BTreeMap<String, String>,
    #[serde(default)]
    classes: BTreeMap<String, String>,
    #[serde(default)]
    globals: BTreeMap<String, String>,
}

impl MappingLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `original -> obfuscated` unless `original` is already mapped.
    ///
    /// Returns the mapping in effect after the call, which is the earlier
    /// value when the key already existed.
    pub fn record(
        &mut self,
        category: Category,
        original: impl Into<String>,
        obfuscated: impl Into<String>,
    ) -> &str {
        match self.map_mut(category).entry(original.into()) {
            Entry::Occupied(entry) => entry.into_mut().as_str(),
            Entry::Vacant(entry) => {
                let obfuscated = obfuscated.into();
                debug!(%category, original = %entry.key(), %obfuscated, "mapping recorded");
                entry.insert(obfuscated).as_str()
            }
        }
    }

    /// Looks up the obfuscated name for `original`.
    #[must_use]
    pub fn lookup(&self, category: Category, original: &str) -> Option<&str> {
        self.entries(category).get(original).map(String::as_str)
    }

    /// All mappings of one category, ordered by original name.
    #[must_use]
    pub fn entries(&self, category: Category) -> &BTreeMap<String, String> {
        match category {
            Category::Files => &self.files,
            Category::Directories => &self.directories,
            Category::Ids => &self.ids,
            Category::Classes => &self.classes,
            Category::Globals => &self.globals,
        }
    }

    /// Number of mappings per category.
    #[must_use]
    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            files: self.files.len(),
            directories: self.directories.len(),
            ids: self.ids.len(),
            classes: self.classes.len(),
            globals: self.globals.len(),
        }
    }

    fn map_mut(&mut self, category: Category) -> &mut BTreeMap<String, String> {
        match category {
            Category::Files => &mut self.files,
            Category::Directories => &mut self.directories,
            Category::Ids => &mut self.ids,
            Category::Classes => &mut self.classes,
            Category::Globals => &mut self.globals,
        }
    }
}

/// Mapping counts per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// File path mappings.
    pub files: usize,
    /// Directory mappings.
    pub directories: usize,
    /// DOM id mappings.
    pub ids: usize,
    /// Class name mappings.
    pub classes: usize,
    /// Global identifier mappings.
    pub globals: usize,
}

impl fmt::Display for LedgerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "files={} directories={} ids={} classes={} globals={}",
            self.files, self.directories, self.ids, self.classes, self.globals
        )
    }
}

/// Persisted form of a ledger: audit metadata plus the five flat maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Identifier shared by every copy produced in one invocation.
    pub run_id: String,
    /// When the snapshot was written.
    pub generated_at: DateTime<Utc>,
    /// 1-based copy index.
    pub copy: usize,
    /// The mappings themselves.
    #[serde(flatten)]
    pub ledger: MappingLedger,
}

impl LedgerSnapshot {
    /// Writes the snapshot as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, ctx: &ServiceContext, path: &Path) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("failed to serialize mapping snapshot: {e}"))?;
        ctx.fs
            .write(path, &json)
            .map_err(|e| format!("failed to write mapping snapshot {}: {e}", path.display()))
    }

    /// Reads a snapshot written by [`LedgerSnapshot::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(ctx: &ServiceContext, path: &Path) -> Result<Self, String> {
        let contents = ctx
            .fs
            .read_to_string(path)
            .map_err(|e| format!("failed to read mapping snapshot {}: {e}", path.display()))?;
        serde_json::from_str(&contents)
            .map_err(|e| format!("failed to parse mapping snapshot {}: {e}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_write_wins() {
        let mut ledger = MappingLedger::new();
        assert_eq!(ledger.record(Category::Files, "images/logo.png", "res_a1/asset_1.png"), "res_a1/asset_1.png");
        assert_eq!(ledger.record(Category::Files, "images/logo.png", "elsewhere.png"), "res_a1/asset_1.png");
        assert_eq!(ledger.lookup(Category::Files, "images/logo.png"), Some("res_a1/asset_1.png"));
        assert_eq!(ledger.stats().files, 1);
    }

    #[test]
    fn categories_are_independent() {
        let mut ledger = MappingLedger::new();
        ledger.record(Category::Ids, "main", "Xa9");
        ledger.record(Category::Globals, "main", "Qz1");
        assert_eq!(ledger.lookup(Category::Ids, "main"), Some("Xa9"));
        assert_eq!(ledger.lookup(Category::Globals, "main"), Some("Qz1"));
        assert_eq!(ledger.lookup(Category::Classes, "main"), None);
        assert_eq!(
            ledger.stats(),
            LedgerStats { files: 0, directories: 0, ids: 1, classes: 0, globals: 1 }
        );
        assert_eq!(ledger.stats().to_string(), "files=0 directories=0 ids=1 classes=0 globals=1");
    }

    #[test]
    fn snapshot_round_trips_through_disk() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ServiceContext::seeded(1);
        let mut ledger = MappingLedger::new();
        ledger.record(Category::Files, "css/site.css", "lib_0a0b0c/core_12345678.css");
        ledger.record(Category::Directories, "css", "lib_0a0b0c");

        let snapshot = LedgerSnapshot {
            run_id: "run-1".into(),
            generated_at: ctx.clock.now(),
            copy: 2,
            ledger: ledger.clone(),
        };
        let path = temp_dir.path().join("site_OBF_DIR2_mapping.json");
        snapshot.save(&ctx, &path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["files"]["css/site.css"], "lib_0a0b0c/core_12345678.css");
        assert_eq!(raw["copy"], 2);
        assert!(raw["classes"].as_object().unwrap().is_empty());

        let loaded = LedgerSnapshot::load(&ctx, &path).unwrap();
        assert_eq!(loaded.ledger, ledger);
    }
}
