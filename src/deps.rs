//! Startup check for required external programs.

use std::ffi::OsStr;
use std::path::PathBuf;

/// Locate `program` the way a shell would.
///
/// Names containing a path separator are checked as given; bare names are
/// searched for in each directory of `search_path`.
pub fn find_program(program: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    let cwd = std::env::current_dir().unwrap_or_default();
    which::which_in(program, search_path, cwd).ok()
}

/// Programs from `required` that cannot be found
pub fn missing_programs(required: &[String], search_path: Option<&OsStr>) -> Vec<String> {
    required
        .iter()
        .filter(|program| find_program(program, search_path).is_none())
        .cloned()
        .collect()
}
