//! Path-based file classification.
//!
//! Every path maps to exactly one [`Role`]. Classification looks only at the
//! path string (lower-cased), never at file contents, so it is total,
//! deterministic and can be tested path by path.
//!
//! Order of checks:
//!
//! 1. Exclusion policy: filename blacklist, directory markers, extension
//!    blacklist, minified-asset suffixes, user exclude globs.
//! 2. Image: extension in [`IMAGE_EXTENSIONS`]. Checked before names so a
//!    `readme-banner.png` is never fetched as text.
//! 3. Documentation: file name contains `readme`, `changelog` or `license`.
//! 4. Configuration: known manifest/build file names, or a config extension.
//! 5. Source: extension in [`SOURCE_EXTENSIONS`]; anything else is excluded.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fmt;

/// Lower-cased file extension used to group source files.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileTypeKey(String);

impl FileTypeKey {
    pub fn new(ext: &str) -> Self {
        Self(ext.to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable language name for section headers.
    pub fn language(&self) -> &'static str {
        SOURCE_EXTENSIONS
            .iter()
            .find(|(ext, _)| *ext == self.0)
            .map(|(_, lang)| *lang)
            .unwrap_or("Other")
    }
}

impl fmt::Display for FileTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The role a file plays in the context document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Documentation,
    Configuration,
    Source(FileTypeKey),
    Image,
    Excluded,
}

impl Role {
    /// Whether files with this role contribute content to the document.
    pub fn has_content(&self) -> bool {
        matches!(
            self,
            Role::Documentation | Role::Configuration | Role::Source(_)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Documentation => "documentation",
            Role::Configuration => "configuration",
            Role::Source(_) => "source",
            Role::Image => "image",
            Role::Excluded => "excluded",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Source(key) => write!(f, "source:{}", key),
            other => f.write_str(other.label()),
        }
    }
}

/// Lockfiles and OS metadata, compared against the lower-cased file name.
pub const EXCLUDED_FILENAMES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "cargo.lock",
    "poetry.lock",
    "gemfile.lock",
    "composer.lock",
    "pipfile.lock",
    ".ds_store",
    "thumbs.db",
    "desktop.ini",
];

/// Directory names that exclude everything beneath them, at any depth.
pub const EXCLUDED_DIR_MARKERS: &[&str] = &[
    // version control
    ".git",
    ".svn",
    ".hg",
    // dependency caches
    "node_modules",
    "bower_components",
    "vendor",
    "__pycache__",
    "venv",
    ".venv",
    "env",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
    // build output
    "target",
    "build",
    "dist",
    ".next",
    ".nuxt",
    // editor state
    ".idea",
    ".vscode",
    ".vs",
    // CI
    ".github",
    ".gitlab",
    ".circleci",
    // coverage
    "coverage",
    ".nyc_output",
    "htmlcov",
];

pub const EXCLUDED_EXTENSIONS: &[&str] = &[
    // executables and objects
    "exe", "dll", "so", "dylib", "bin", "o", "a", "obj", "class", "jar", "war", "pyc", "pyo", "wasm",
    // archives
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar",
    // heavy raster formats
    "bmp", "tif", "tiff", "psd", "heic",
    // logs, lockfiles, databases
    "log", "lock", "db", "sqlite", "sqlite3",
    // fonts and media
    "woff", "woff2", "ttf", "otf", "eot", "mp3", "mp4", "wav", "mov", "avi", "pdf",
];

/// Suffixes of minified or bundled assets.
pub const EXCLUDED_SUFFIXES: &[&str] = &[".min.js", ".min.css", ".bundle.js", ".map"];

pub const DOCUMENTATION_MARKERS: &[&str] = &["readme", "changelog", "license"];

/// Package manifests, build configs and environment files.
pub const CONFIG_FILENAMES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "setup.py",
    "setup.cfg",
    "pipfile",
    "gemfile",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "settings.gradle",
    "cargo.toml",
    "go.mod",
    "composer.json",
    "makefile",
    "cmakelists.txt",
    "dockerfile",
    "docker-compose.yml",
    "tsconfig.json",
    "webpack.config.js",
    "vite.config.ts",
    "vite.config.js",
    ".env",
    ".env.example",
    ".editorconfig",
];

pub const CONFIG_EXTENSIONS: &[&str] = &["json", "yaml", "yml", "toml", "ini", "cfg", "conf"];

/// Source extensions and the language name used in section headers.
pub const SOURCE_EXTENSIONS: &[(&str, &str)] = &[
    ("bat", "Batch"),
    ("c", "C"),
    ("cpp", "C++"),
    ("cs", "C#"),
    ("css", "CSS"),
    ("go", "Go"),
    ("h", "C Header"),
    ("hpp", "C++ Header"),
    ("html", "HTML"),
    ("java", "Java"),
    ("js", "JavaScript"),
    ("jsx", "React JSX"),
    ("kt", "Kotlin"),
    ("md", "Markdown"),
    ("php", "PHP"),
    ("py", "Python"),
    ("r", "R"),
    ("rb", "Ruby"),
    ("rs", "Rust"),
    ("sass", "Sass"),
    ("scala", "Scala"),
    ("scss", "SCSS"),
    ("sh", "Shell"),
    ("sql", "SQL"),
    ("swift", "Swift"),
    ("ts", "TypeScript"),
    ("tsx", "React TSX"),
    ("vue", "Vue"),
];

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "ico", "svg"];

/// Root-level manifests and the stack they reveal.
pub const MANIFEST_LABELS: &[(&str, &str)] = &[
    ("requirements.txt", "Python dependencies"),
    ("pyproject.toml", "Python project configuration"),
    ("package.json", "Node.js dependencies"),
    ("gemfile", "Ruby dependencies"),
    ("pom.xml", "Java Maven dependencies"),
    ("build.gradle", "Java Gradle dependencies"),
    ("cargo.toml", "Rust dependencies"),
    ("go.mod", "Go module dependencies"),
    ("composer.json", "PHP dependencies"),
];

/// Stack label for a manifest at the repository root. Nested manifests
/// (`web/package.json`) return `None`.
pub fn manifest_label(path: &str) -> Option<&'static str> {
    let normalized = normalize(path);
    if normalized.contains('/') {
        return None;
    }
    MANIFEST_LABELS
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, label)| *label)
}

/// Classification policy: the fixed rules plus optional user exclude globs.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    extra_excludes: Option<GlobSet>,
}

impl Classifier {
    /// Build a classifier that also excludes paths matching `exclude_globs`.
    pub fn with_excludes(exclude_globs: &[String]) -> Result<Self> {
        if exclude_globs.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            extra_excludes: Some(build_globset(exclude_globs)?),
        })
    }

    pub fn classify(&self, path: &str) -> Role {
        let normalized = normalize(path);
        if let Some(set) = &self.extra_excludes {
            if set.is_match(&normalized) {
                return Role::Excluded;
            }
        }
        classify_normalized(&normalized)
    }

    /// Whether a directory and everything beneath it is excluded, either by
    /// a marker segment or by a user glob.
    pub fn excludes_dir(&self, path: &str) -> bool {
        let normalized = normalize(path);
        if normalized.is_empty() {
            return false;
        }
        if normalized
            .split('/')
            .any(|segment| EXCLUDED_DIR_MARKERS.contains(&segment))
        {
            return true;
        }
        match &self.extra_excludes {
            Some(set) => set.is_match(&normalized) || set.is_match(format!("{}/", normalized)),
            None => false,
        }
    }
}

/// Classify a path with the default policy.
pub fn classify(path: &str) -> Role {
    classify_normalized(&normalize(path))
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
        .trim_start_matches("./")
        .trim_matches('/')
        .to_lowercase()
}

fn classify_normalized(path: &str) -> Role {
    let file_name = path.rsplit('/').next().unwrap_or("");
    if file_name.is_empty() {
        return Role::Excluded;
    }
    let ext = extension(file_name);

    if is_excluded(path, file_name, ext) {
        return Role::Excluded;
    }

    if ext.is_some_and(|e| IMAGE_EXTENSIONS.contains(&e)) {
        return Role::Image;
    }

    if DOCUMENTATION_MARKERS.iter().any(|m| file_name.contains(m)) {
        return Role::Documentation;
    }

    if CONFIG_FILENAMES.contains(&file_name) {
        return Role::Configuration;
    }

    let Some(ext) = ext else {
        return Role::Excluded;
    };

    if CONFIG_EXTENSIONS.contains(&ext) {
        Role::Configuration
    } else if SOURCE_EXTENSIONS.iter().any(|(e, _)| *e == ext) {
        Role::Source(FileTypeKey::new(ext))
    } else {
        Role::Excluded
    }
}

fn is_excluded(path: &str, file_name: &str, ext: Option<&str>) -> bool {
    if EXCLUDED_FILENAMES.contains(&file_name) {
        return true;
    }

    // Markers match whole directory segments, not substrings: `rebuild/`
    // is kept while `build/` is dropped. The file name itself never counts.
    let dirs = &path[..path.len() - file_name.len()];
    if dirs
        .split('/')
        .any(|segment| EXCLUDED_DIR_MARKERS.contains(&segment))
    {
        return true;
    }

    if ext.is_some_and(|e| EXCLUDED_EXTENSIONS.contains(&e)) {
        return true;
    }

    EXCLUDED_SUFFIXES.iter().any(|s| file_name.ends_with(s))
}

/// Extension after the last dot. Dotfiles like `.env` have none.
fn extension(file_name: &str) -> Option<&str> {
    match file_name.rfind('.') {
        Some(0) | None => None,
        Some(pos) if pos + 1 < file_name.len() => Some(&file_name[pos + 1..]),
        Some(_) => None,
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
