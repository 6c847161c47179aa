//! Random layout generation.
//!
//! The synthetic tree is camouflage: segment names look like an ordinary
//! source layout (`src_3fa91c/lib_07be2d`) rather than random noise.

use std::collections::{BTreeMap, HashSet};

use crate::naming;
use crate::ports::Entropy;

use super::{is_reserved_base_name, join_relative, split_extension, Inventory};

/// Lower bound on synthetic directories, even for tiny projects.
pub const MIN_SYNTHETIC_DIRS: usize = 3;
/// Upper bound on synthetic directories.
pub const MAX_SYNTHETIC_DIRS: usize = 10;
/// Deepest synthetic directory path, in segments.
pub const MAX_DEPTH: usize = 3;

/// Extensions (lower-case, with dot) whose files may be renamed.
pub const RENAMEABLE_EXTENSIONS: &[&str] =
    &[".js", ".css", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".woff", ".woff2", ".ttf"];

/// Where every inventoried entry should end up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutPlan {
    /// Synthetic directories to create, relative to the root.
    pub new_directories: Vec<String>,
    /// Original directory -> synthetic directory it is folded into.
    pub directory_assignment: BTreeMap<String, String>,
    /// Original file path -> new file path (possibly renamed).
    pub file_assignment: BTreeMap<String, String>,
    /// Files that stay at their original path.
    pub preserved: Vec<String>,
}

/// Builds a layout plan for `inventory`.
///
/// Every inventoried file lands in exactly one of `file_assignment` or
/// `preserved`, and no two assigned files share a target path.
pub fn generate(entropy: &dyn Entropy, inventory: &Inventory) -> LayoutPlan {
    let count = (inventory.directories.len() / 2).clamp(MIN_SYNTHETIC_DIRS, MAX_SYNTHETIC_DIRS);
    let mut plan = LayoutPlan {
        new_directories: synthetic_directories(entropy, count),
        ..LayoutPlan::default()
    };

    let mut directories: Vec<&str> =
        inventory.directories.iter().map(|d| d.relative_path.as_str()).collect();
    naming::shuffle(entropy, &mut directories);
    for (index, directory) in directories.into_iter().enumerate() {
        let target = &plan.new_directories[index % count];
        plan.directory_assignment.insert(directory.to_string(), target.clone());
    }

    let mut eligible = Vec::new();
    for file in &inventory.files {
        let root_entry = file.containing_dir.is_empty() && file.name.eq_ignore_ascii_case("index.html");
        if root_entry || is_reserved_base_name(&file.name) {
            plan.preserved.push(file.relative_path.clone());
        } else {
            eligible.push(file);
        }
    }

    naming::shuffle(entropy, &mut eligible);
    let mut taken: HashSet<String> = HashSet::new();
    for (index, file) in eligible.into_iter().enumerate() {
        let renamed = should_rename(&file.name);
        let target = place_file(entropy, &plan.new_directories, index % count, &file.name, renamed, &taken);
        taken.insert(target.clone());
        plan.file_assignment.insert(file.relative_path.clone(), target);
    }

    plan
}

/// Returns `true` if a file with this name may receive a random name.
#[must_use]
pub fn should_rename(file_name: &str) -> bool {
    if is_reserved_base_name(file_name) {
        return false;
    }
    let (_, extension) = split_extension(file_name);
    let extension = extension.to_ascii_lowercase();
    RENAMEABLE_EXTENSIONS.contains(&extension.as_str())
}

fn synthetic_directories(entropy: &dyn Entropy, count: usize) -> Vec<String> {
    let mut directories: Vec<String> = Vec::with_capacity(count);
    while directories.len() < count {
        let depth = naming::between(entropy, 1, MAX_DEPTH);
        let path = naming::directory_path(entropy, depth);
        if !directories.contains(&path) {
            directories.push(path);
        }
    }
    directories
}

/// Picks a free target for one file, starting at its round-robin slot.
///
/// Renamed files redraw their name on collision. Files that keep their name
/// probe the following synthetic directories; if every one already holds a
/// file of that name the round-robin slot is returned and the migrator
/// reports the collision.
fn place_file(
    entropy: &dyn Entropy,
    directories: &[String],
    slot: usize,
    name: &str,
    renamed: bool,
    taken: &HashSet<String>,
) -> String {
    let directory = &directories[slot];
    if renamed {
        let (_, extension) = split_extension(name);
        loop {
            let candidate = join_relative(directory, &naming::file_name(entropy, extension));
            if !taken.contains(&candidate) {
                return candidate;
            }
        }
    }

    (0..directories.len())
        .map(|offset| join_relative(&directories[(slot + offset) % directories.len()], name))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| join_relative(directory, name))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::adapters::live::RngEntropy;
    use crate::restructure::{EntryKind, InventoryEntry};

    fn entry(relative_path: &str, kind: EntryKind) -> InventoryEntry {
        let (containing_dir, name) = relative_path.rsplit_once('/').unwrap_or(("", relative_path));
        InventoryEntry {
            name: name.to_string(),
            relative_path: relative_path.to_string(),
            absolute_path: PathBuf::from("/site").join(relative_path),
            kind,
            containing_dir: containing_dir.to_string(),
        }
    }

    fn inventory(dirs: &[&str], files: &[&str]) -> Inventory {
        Inventory {
            directories: dirs.iter().map(|d| entry(d, EntryKind::Directory)).collect(),
            files: files.iter().map(|f| entry(f, EntryKind::File)).collect(),
        }
    }

    #[test]
    fn synthetic_directory_count_is_bounded() {
        let entropy = RngEntropy::seeded(1);
        let tiny = generate(&entropy, &inventory(&[], &[]));
        assert_eq!(tiny.new_directories.len(), MIN_SYNTHETIC_DIRS);

        let dirs: Vec<String> = (0..14).map(|i| format!("d{i}")).collect();
        let refs: Vec<&str> = dirs.iter().map(String::as_str).collect();
        assert_eq!(generate(&entropy, &inventory(&refs, &[])).new_directories.len(), 7);

        let many: Vec<String> = (0..60).map(|i| format!("d{i}")).collect();
        let refs: Vec<&str> = many.iter().map(String::as_str).collect();
        assert_eq!(generate(&entropy, &inventory(&refs, &[])).new_directories.len(), MAX_SYNTHETIC_DIRS);
    }

    #[test]
    fn synthetic_paths_are_unique_and_shallow() {
        let entropy = RngEntropy::seeded(8);
        let many: Vec<String> = (0..40).map(|i| format!("d{i}")).collect();
        let refs: Vec<&str> = many.iter().map(String::as_str).collect();
        let plan = generate(&entropy, &inventory(&refs, &[]));

        let unique: HashSet<&String> = plan.new_directories.iter().collect();
        assert_eq!(unique.len(), plan.new_directories.len());
        for path in &plan.new_directories {
            let depth = path.split('/').count();
            assert!((1..=MAX_DEPTH).contains(&depth));
        }
    }

    #[test]
    fn directories_are_spread_round_robin() {
        let entropy = RngEntropy::seeded(4);
        let dirs: Vec<String> = (0..6).map(|i| format!("d{i}")).collect();
        let refs: Vec<&str> = dirs.iter().map(String::as_str).collect();
        let plan = generate(&entropy, &inventory(&refs, &[]));

        assert_eq!(plan.new_directories.len(), 3);
        assert_eq!(plan.directory_assignment.len(), 6);
        for synthetic in &plan.new_directories {
            let share = plan.directory_assignment.values().filter(|v| *v == synthetic).count();
            assert_eq!(share, 2);
        }
    }

    #[test]
    fn files_are_preserved_xor_assigned() {
        let entropy = RngEntropy::seeded(12);
        let files = [
            "index.html",
            "pages/index.html",
            "about.html",
            "js/app.js",
            "js/menu.js",
            "css/site.css",
            "img/logo.png",
            "data/feed.xml",
        ];
        let plan = generate(&entropy, &inventory(&["js", "css", "img", "data", "pages"], &files));

        assert_eq!(plan.preserved.len() + plan.file_assignment.len(), files.len());
        for file in files {
            let preserved = plan.preserved.iter().any(|p| p == file);
            let assigned = plan.file_assignment.contains_key(file);
            assert!(preserved ^ assigned, "{file} must have exactly one disposition");
        }
        assert!(plan.preserved.contains(&"index.html".to_string()));
        assert!(plan.preserved.contains(&"pages/index.html".to_string()));
        assert!(plan.preserved.contains(&"js/app.js".to_string()));

        let about = &plan.file_assignment["about.html"];
        assert!(about.ends_with("/about.html"));
        let feed = &plan.file_assignment["data/feed.xml"];
        assert!(feed.ends_with("/feed.xml"));

        let logo = &plan.file_assignment["img/logo.png"];
        assert!(logo.ends_with(".png"));
        assert!(!logo.ends_with("/logo.png"));
        let (directory, _) = logo.rsplit_once('/').unwrap();
        assert!(plan.new_directories.iter().any(|d| d == directory));
    }

    #[test]
    fn same_named_files_get_distinct_targets() {
        let entropy = RngEntropy::seeded(30);
        let plan = generate(
            &entropy,
            &inventory(&["a", "b", "c", "d"], &["a/notes.txt", "b/notes.txt", "c/notes.txt", "d/notes.txt"]),
        );
        let targets: HashSet<&String> = plan.file_assignment.values().collect();
        // Three synthetic directories can hold three distinct `notes.txt`.
        assert_eq!(targets.len(), 3);
    }

    #[test]
    fn rename_rules() {
        assert!(should_rename("photo.JPG"));
        assert!(should_rename("font.woff2"));
        assert!(!should_rename("about.html"));
        assert!(!should_rename("main.css"));
        assert!(!should_rename("README"));
    }
}
