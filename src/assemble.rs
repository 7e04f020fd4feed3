//! Context document rendering.
//!
//! Layout, top to bottom:
//!
//! ```text
//! ================================================================================
//! PROJECT CONTEXT: widgets
//! ================================================================================
//! Repository: https://github.com/acme/widgets
//! Generated on: 2026-01-01 12:00:00 UTC
//! Primary language: JavaScript
//! Description: ...
//!
//! ## TECHNOLOGY STACK          (optional, root-level manifests)
//! ## PROJECT STRUCTURE         (optional, indented directory tree)
//! ## FILE LISTING              (optional)
//! ## LISTED BUT NOT INCLUDED   (optional, image paths only)
//! ## SOURCE FILE INDEX         (optional, source paths by language)
//! ## DOCUMENTATION
//! ## CONFIGURATION
//! ## SOURCE CODE               (grouped by extension, alphabetical)
//!
//! ================================================================================
//! END OF CONTEXT
//! ================================================================================
//! ```
//!
//! Each included file renders as a `--- {path} ---` separator line followed by
//! its text. A section with no files is left out entirely.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::classify::{manifest_label, FileTypeKey, Role};
use crate::config::OutputConfig;
use crate::models::{ClassifiedFile, RepositorySnapshot, RetrievedContent};

const BANNER_WIDTH: usize = 80;
const RULE_WIDTH: usize = 40;

/// Everything the assembler renders.
pub struct AssemblyInput<'a> {
    pub snapshot: &'a RepositorySnapshot,
    /// Every retained (non-excluded) file, in walk order.
    pub listing: &'a [ClassifiedFile],
    /// Directories that survived exclusion. Parents of listed files are
    /// added implicitly, so this only matters for otherwise empty folders.
    pub directories: &'a [String],
    /// Retrieved content of included files, in walk order.
    pub contents: &'a [RetrievedContent],
    pub generated_at: DateTime<Utc>,
}

/// Render the full document. Always ends with a single `\n`.
pub fn assemble(input: &AssemblyInput<'_>, options: &OutputConfig) -> String {
    let mut lines: Vec<String> = Vec::new();

    render_header(&mut lines, input.snapshot, input.generated_at);

    if options.include_tech_stack {
        let manifests: Vec<(&str, &str)> = input
            .listing
            .iter()
            .filter_map(|f| manifest_label(f.path()).map(|label| (label, f.path())))
            .collect();
        if !manifests.is_empty() {
            section_title(&mut lines, "TECHNOLOGY STACK");
            for (label, path) in manifests {
                lines.push(format!("- {} ({})", label, path));
            }
        }
    }

    if options.include_structure && !(input.listing.is_empty() && input.directories.is_empty()) {
        section_title(&mut lines, "PROJECT STRUCTURE");
        lines.push(format!("{}/", input.snapshot.name));
        project_tree(input.directories, input.listing).render(1, &mut lines);
    }

    if options.include_file_listing && !input.listing.is_empty() {
        section_title(&mut lines, "FILE LISTING");
        for file in input.listing {
            lines.push(format!("- {}", file.path()));
        }
    }

    if options.include_image_listing {
        let images: Vec<&ClassifiedFile> = input
            .listing
            .iter()
            .filter(|f| f.role == Role::Image)
            .collect();
        if !images.is_empty() {
            section_title(&mut lines, "LISTED BUT NOT INCLUDED");
            lines.push("Image files (content not rendered):".to_string());
            for file in images {
                lines.push(format!("- {}", file.path()));
            }
        }
    }

    if options.include_source_index {
        let mut index: BTreeMap<&FileTypeKey, Vec<&str>> = BTreeMap::new();
        for file in input.listing {
            if let Role::Source(key) = &file.role {
                index.entry(key).or_default().push(file.path());
            }
        }
        if !index.is_empty() {
            section_title(&mut lines, "SOURCE FILE INDEX");
            for (key, mut paths) in index {
                paths.sort_unstable();
                lines.push(String::new());
                lines.push(format!("{} Files (.{}):", key.language(), key));
                lines.extend(paths.into_iter().map(|p| format!("- {}", p)));
            }
        }
    }

    let docs: Vec<&RetrievedContent> = input
        .contents
        .iter()
        .filter(|c| c.role == Role::Documentation)
        .collect();
    if !docs.is_empty() {
        section_title(&mut lines, "DOCUMENTATION");
        for content in docs {
            render_file(&mut lines, content);
        }
    }

    let configs: Vec<&RetrievedContent> = input
        .contents
        .iter()
        .filter(|c| c.role == Role::Configuration)
        .collect();
    if !configs.is_empty() {
        section_title(&mut lines, "CONFIGURATION");
        for content in configs {
            render_file(&mut lines, content);
        }
    }

    let sources = group_by_type(input.contents);
    if !sources.is_empty() {
        section_title(&mut lines, "SOURCE CODE");
        for (key, files) in &sources {
            lines.push(String::new());
            lines.push(format!("### {} (.{})", key.language(), key));
            for content in files {
                render_file(&mut lines, content);
            }
        }
    }

    render_footer(&mut lines, options.attribution);

    let mut document = lines.join("\n");
    document.push('\n');
    document
}

/// Source files grouped by extension key. Keys iterate alphabetically;
/// each group keeps walk order.
pub fn group_by_type(contents: &[RetrievedContent]) -> BTreeMap<FileTypeKey, Vec<&RetrievedContent>> {
    let mut groups: BTreeMap<FileTypeKey, Vec<&RetrievedContent>> = BTreeMap::new();
    for content in contents {
        if let Role::Source(key) = &content.role {
            groups.entry(key.clone()).or_default().push(content);
        }
    }
    groups
}

/// Directory node of the project tree. Children iterate alphabetically.
#[derive(Default)]
struct DirNode<'a> {
    files: Vec<&'a str>,
    dirs: BTreeMap<&'a str, DirNode<'a>>,
}

impl<'a> DirNode<'a> {
    /// Node for `path`, creating missing ancestors.
    fn dir(&mut self, path: &'a str) -> &mut DirNode<'a> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self, |node, segment| node.dirs.entry(segment).or_default())
    }

    /// Files first, then subdirectories, two spaces per level.
    fn render(&self, depth: usize, lines: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        let mut files = self.files.clone();
        files.sort_unstable();
        for file in files {
            lines.push(format!("{}{}", indent, file));
        }
        for (name, child) in &self.dirs {
            lines.push(format!("{}{}/", indent, name));
            child.render(depth + 1, lines);
        }
    }
}

fn project_tree<'a>(directories: &'a [String], listing: &'a [ClassifiedFile]) -> DirNode<'a> {
    let mut root = DirNode::default();
    for dir in directories {
        root.dir(dir);
    }
    for file in listing {
        match file.path().rsplit_once('/') {
            Some((parent, name)) => root.dir(parent).files.push(name),
            None => root.files.push(file.path()),
        }
    }
    root
}

fn render_header(lines: &mut Vec<String>, snapshot: &RepositorySnapshot, generated_at: DateTime<Utc>) {
    lines.push("=".repeat(BANNER_WIDTH));
    lines.push(format!("PROJECT CONTEXT: {}", snapshot.name));
    lines.push("=".repeat(BANNER_WIDTH));
    lines.push(format!("Repository: {}", snapshot.url));
    lines.push(format!(
        "Generated on: {}",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.push(format!(
        "Primary language: {}",
        snapshot.language.as_deref().unwrap_or("Unknown")
    ));
    lines.push(format!(
        "Description: {}",
        snapshot
            .description
            .as_deref()
            .unwrap_or("No description available")
    ));
}

fn section_title(lines: &mut Vec<String>, title: &str) {
    lines.push(String::new());
    lines.push(format!("## {}", title));
    lines.push("-".repeat(RULE_WIDTH));
}

fn render_file(lines: &mut Vec<String>, content: &RetrievedContent) {
    lines.push(String::new());
    lines.push(format!("--- {} ---", content.path));
    lines.push(content.text.trim_end_matches('\n').to_string());
}

fn render_footer(lines: &mut Vec<String>, attribution: bool) {
    lines.push(String::new());
    lines.push("=".repeat(BANNER_WIDTH));
    lines.push("END OF CONTEXT".to_string());
    if attribution {
        lines.push(format!("Generated by repo-context {}", env!("CARGO_PKG_VERSION")));
    }
    lines.push("=".repeat(BANNER_WIDTH));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::models::FileEntry;

    fn snapshot() -> RepositorySnapshot {
        RepositorySnapshot {
            owner: "acme".to_string(),
            name: "widgets".to_string(),
            default_branch: "main".to_string(),
            description: Some("Widget toolkit".to_string()),
            language: Some("JavaScript".to_string()),
            url: "https://github.com/acme/widgets".to_string(),
        }
    }

    fn classified(path: &str) -> ClassifiedFile {
        ClassifiedFile {
            entry: FileEntry::blob(path),
            role: crate::classify::classify(path),
        }
    }

    fn content(path: &str, text: &str) -> RetrievedContent {
        RetrievedContent {
            path: path.to_string(),
            role: crate::classify::classify(path),
            text: text.to_string(),
            truncated: false,
        }
    }

    fn at_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 2, 12, 0, 0).unwrap()
    }

    fn render(listing: &[ClassifiedFile], contents: &[RetrievedContent], options: &OutputConfig) -> String {
        render_with_dirs(listing, &[], contents, options)
    }

    fn render_with_dirs(
        listing: &[ClassifiedFile],
        directories: &[String],
        contents: &[RetrievedContent],
        options: &OutputConfig,
    ) -> String {
        let snap = snapshot();
        assemble(
            &AssemblyInput {
                snapshot: &snap,
                listing,
                directories,
                contents,
                generated_at: at_noon(),
            },
            options,
        )
    }

    #[test]
    fn test_header_fields() {
        let doc = render(&[], &[], &OutputConfig::default());
        assert!(doc.starts_with(&"=".repeat(80)));
        assert!(doc.contains("PROJECT CONTEXT: widgets\n"));
        assert!(doc.contains("Repository: https://github.com/acme/widgets\n"));
        assert!(doc.contains("Generated on: 2026-01-02 12:00:00 UTC\n"));
        assert!(doc.contains("Primary language: JavaScript\n"));
        assert!(doc.contains("Description: Widget toolkit\n"));
        assert!(doc.contains("END OF CONTEXT\n"));
        assert!(doc.ends_with(&format!("{}\n", "=".repeat(80))));
    }

    #[test]
    fn test_missing_metadata_placeholders() {
        let mut snap = snapshot();
        snap.description = None;
        snap.language = None;
        let doc = assemble(
            &AssemblyInput {
                snapshot: &snap,
                listing: &[],
                directories: &[],
                contents: &[],
                generated_at: at_noon(),
            },
            &OutputConfig::default(),
        );
        assert!(doc.contains("Primary language: Unknown\n"));
        assert!(doc.contains("Description: No description available\n"));
    }

    #[test]
    fn test_empty_sections_omitted() {
        let contents = vec![content("README.md", "# Widgets")];
        let doc = render(&[], &contents, &OutputConfig::default());
        assert!(doc.contains("## DOCUMENTATION"));
        assert!(!doc.contains("## CONFIGURATION"));
        assert!(!doc.contains("## SOURCE CODE"));
        assert!(!doc.contains("## FILE LISTING"));
        assert!(!doc.contains("## LISTED BUT NOT INCLUDED"));
        assert!(!doc.contains("## TECHNOLOGY STACK"));
        assert!(!doc.contains("## PROJECT STRUCTURE"));
        assert!(!doc.contains("## SOURCE FILE INDEX"));
    }

    #[test]
    fn test_section_order() {
        let contents = vec![
            content("src/app.py", "print(1)"),
            content("setup.cfg", "[metadata]"),
            content("README.md", "# Widgets"),
        ];
        let doc = render(&[], &contents, &OutputConfig::default());
        let docs = doc.find("## DOCUMENTATION").unwrap();
        let cfg = doc.find("## CONFIGURATION").unwrap();
        let src = doc.find("## SOURCE CODE").unwrap();
        let end = doc.find("END OF CONTEXT").unwrap();
        assert!(docs < cfg && cfg < src && src < end);
    }

    #[test]
    fn test_source_grouped_alphabetically_walk_order_within() {
        let contents = vec![
            content("src/z.py", "z"),
            content("src/b.js", "b"),
            content("src/a.py", "a"),
            content("src/a.js", "a"),
        ];
        let doc = render(&[], &contents, &OutputConfig::default());
        let js = doc.find("### JavaScript (.js)").unwrap();
        let py = doc.find("### Python (.py)").unwrap();
        assert!(js < py);

        let b_js = doc.find("--- src/b.js ---").unwrap();
        let a_js = doc.find("--- src/a.js ---").unwrap();
        let z_py = doc.find("--- src/z.py ---").unwrap();
        let a_py = doc.find("--- src/a.py ---").unwrap();
        assert!(js < b_js && b_js < a_js && a_js < py);
        assert!(py < z_py && z_py < a_py);
    }

    #[test]
    fn test_file_block_format() {
        let contents = vec![content("README.md", "line one\nline two\n")];
        let doc = render(&[], &contents, &OutputConfig::default());
        assert!(doc.contains("\n--- README.md ---\nline one\nline two\n\n"));
    }

    #[test]
    fn test_listing_and_images() {
        let listing = vec![
            classified("README.md"),
            classified("assets/logo.png"),
            classified("src/app.py"),
        ];
        let doc = render(&listing, &[], &OutputConfig::default());
        assert!(doc.contains(&format!(
            "## FILE LISTING\n{}\n- README.md\n- assets/logo.png\n- src/app.py\n",
            "-".repeat(40)
        )));
        assert!(doc.contains("## LISTED BUT NOT INCLUDED"));
        assert!(doc.contains("Image files (content not rendered):\n- assets/logo.png\n"));
    }

    #[test]
    fn test_optional_sections_disabled() {
        let listing = vec![classified("README.md"), classified("logo.png")];
        let options = OutputConfig {
            include_file_listing: false,
            include_image_listing: false,
            include_structure: false,
            include_tech_stack: false,
            include_source_index: false,
            attribution: false,
            ..OutputConfig::default()
        };
        let doc = render(&listing, &[], &options);
        assert!(!doc.contains("## FILE LISTING"));
        assert!(!doc.contains("## PROJECT STRUCTURE"));
        assert!(!doc.contains("logo.png"));
        assert!(!doc.contains("Generated by"));
    }

    #[test]
    fn test_project_structure_tree() {
        let listing = vec![
            classified("src/util/strings.py"),
            classified("README.md"),
            classified("src/app.py"),
            classified("assets/logo.png"),
            classified("Cargo.toml"),
        ];
        let dirs = vec!["assets".to_string(), "src".to_string(), "src/util".to_string(), "tests".to_string()];
        let doc = render_with_dirs(&listing, &dirs, &[], &OutputConfig::default());
        let expected = [
            "## PROJECT STRUCTURE",
            "-".repeat(40).as_str(),
            "widgets/",
            "  Cargo.toml",
            "  README.md",
            "  assets/",
            "    logo.png",
            "  src/",
            "    app.py",
            "    util/",
            "      strings.py",
            "  tests/",
            "",
        ]
        .join("\n");
        assert!(doc.contains(&expected), "{}", doc);
    }

    #[test]
    fn test_project_structure_creates_missing_parents() {
        let listing = vec![classified("a/b/c.rs")];
        let doc = render(&listing, &[], &OutputConfig::default());
        assert!(doc.contains("widgets/\n  a/\n    b/\n      c.rs\n"));
    }

    #[test]
    fn test_technology_stack_labels_root_manifests() {
        let listing = vec![
            classified("package.json"),
            classified("web/package.json"),
            classified("Cargo.toml"),
            classified("README.md"),
        ];
        let doc = render(&listing, &[], &OutputConfig::default());
        assert!(doc.contains(&format!(
            "## TECHNOLOGY STACK\n{}\n- Node.js dependencies (package.json)\n- Rust dependencies (Cargo.toml)\n",
            "-".repeat(40)
        )));
        assert!(!doc.contains("(web/package.json)"));
    }

    #[test]
    fn test_source_file_index_by_language() {
        let listing = vec![
            classified("src/z.py"),
            classified("src/main.js"),
            classified("src/a.py"),
            classified("README.md"),
        ];
        let doc = render(&listing, &[], &OutputConfig::default());
        assert!(doc.contains("\nJavaScript Files (.js):\n- src/main.js\n"));
        assert!(doc.contains("\nPython Files (.py):\n- src/a.py\n- src/z.py\n"));
        let index = doc.find("## SOURCE FILE INDEX").unwrap();
        assert!(doc.find("JavaScript Files").unwrap() > index);
        assert!(!doc[index..].contains("- README.md"));
    }

    #[test]
    fn test_group_by_type_ignores_non_source() {
        let contents = vec![content("README.md", "x"), content("a.rs", "y")];
        let groups = group_by_type(&contents);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[&FileTypeKey::new("rs")].len(), 1);
    }
}
