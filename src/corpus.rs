use crate::error::CorpusAccessError;
use crate::t_args;
use crate::types::TestCase;
use regex::Regex;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Case-identifier prefix of every Juliet test file.
pub const CASE_PREFIX: &str = "^CWE";
/// Flow-variant number, optional `a` split marker, C source suffix.
pub const CASE_SUFFIX: &str = r"[0-9]{2}a?\.c$";
/// Stripped from the file name to get the base identifier.
pub const BASE_SUFFIX: &str = r"a?\.c$";
/// Windows-only cases cannot be analyzed on other platforms.
pub const PLATFORM_EXCLUDE: &str = "w32";

// The patterns are constants; `built_in_patterns_compile` covers them.
static JULIET: LazyLock<CaseFilter> = LazyLock::new(|| {
    CaseFilter::new(CASE_PREFIX, CASE_SUFFIX, BASE_SUFFIX, PLATFORM_EXCLUDE)
        .unwrap_or_else(|e| unreachable!("built-in case pattern: {e}"))
});

/// Decides which file names are test cases.
#[derive(Debug, Clone)]
pub struct CaseFilter {
    prefix: Regex,
    suffix: Regex,
    base_suffix: Regex,
    exclude: String,
}

impl CaseFilter {
    pub fn new(prefix: &str, suffix: &str, base_suffix: &str, exclude: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            prefix: Regex::new(prefix)?,
            suffix: Regex::new(suffix)?,
            base_suffix: Regex::new(base_suffix)?,
            exclude: exclude.to_string(),
        })
    }

    /// The Juliet naming convention. Compiled once; clones share the regexes.
    pub fn juliet() -> Self {
        JULIET.clone()
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.prefix.is_match(file_name)
            && self.suffix.is_match(file_name)
            && !file_name.contains(&self.exclude)
    }

    pub fn base_identifier(&self, file_name: &str) -> String {
        self.base_suffix.replace(file_name, "").into_owned()
    }
}

impl Default for CaseFilter {
    fn default() -> Self {
        Self::juliet()
    }
}

/// One directory's worth of scan results, both lists sorted by name.
#[derive(Debug, Default)]
pub struct Listing {
    pub cases: Vec<TestCase>,
    pub subdirs: Vec<String>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty() && self.subdirs.is_empty()
    }
}

/// Lists `dir` (not recursively) and splits its entries into test cases and
/// subdirectories. Directories are never filtered by name.
pub fn scan_dir(dir: &Path, filter: &CaseFilter) -> Result<Listing, CorpusAccessError> {
    let access_error = |source: io::Error| CorpusAccessError {
        path: dir.to_path_buf(),
        source,
    };

    let meta = fs::metadata(dir).map_err(access_error)?;
    if !meta.is_dir() {
        return Err(access_error(io::Error::new(
            io::ErrorKind::NotADirectory,
            "not a directory",
        )));
    }

    let mut listing = Listing::default();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) if e.depth() == 0 => {
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("directory walk failed"));
                return Err(access_error(source));
            }
            Err(e) => {
                warn!("{}", t_args!("warn-entry-skipped", "error" => e));
                continue;
            }
        };
        let Some(name) = entry.file_name().to_str() else {
            debug!("skipping non UTF-8 entry {}", entry.path().display());
            continue;
        };

        if entry.file_type().is_dir() {
            listing.subdirs.push(name.to_string());
        } else if entry.file_type().is_file() && filter.matches(name) {
            listing.cases.push(TestCase {
                dir: dir.to_path_buf(),
                file_name: name.to_string(),
                base: filter.base_identifier(name),
            });
        }
    }

    Ok(listing)
}
