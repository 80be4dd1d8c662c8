//! Path splitting and normalization.
//!
//! Matching operates on normalized absolute paths: forward slashes only, no
//! duplicate separators, no `.`/`..` components, no trailing slash (except
//! the root `/`). [`normalize_path`] brings caller input into that form using
//! a [`NormalizeContext`]; [`split_segments`] is the shared segmenter used by
//! the matcher.

/// Split a normalized path into its segments. Leading slash is stripped and
/// empty segments are dropped, so `/` yields no segments.
pub fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Resolution context for relative and home-anchored input paths.
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    pub home_dir: String,
    pub cwd: String,
    pub project_root: Option<String>,
}

impl NormalizeContext {
    pub fn new(home_dir: impl Into<String>, cwd: impl Into<String>) -> Self {
        Self {
            home_dir: home_dir.into(),
            cwd: cwd.into(),
            project_root: None,
        }
    }
}

/// Normalize an input path to the canonical absolute form.
///
/// `~` expands to the context home directory (path input only; pattern
/// sources never expand it). Relative input is resolved against the cwd.
/// Backslashes are treated as separators, duplicate separators collapse,
/// `.` components drop and `..` pops.
pub fn normalize_path(input: &str, ctx: &NormalizeContext) -> String {
    let unified = input.replace('\\', "/");

    let absolute = if unified == "~" {
        ctx.home_dir.clone()
    } else if let Some(rest) = unified.strip_prefix("~/") {
        format!("{}/{}", ctx.home_dir, rest)
    } else if unified.starts_with('/') {
        unified
    } else {
        format!("{}/{}", ctx.cwd, unified)
    };

    let mut resolved: Vec<&str> = Vec::new();
    for part in absolute.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }

    if resolved.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", resolved.join("/"))
    }
}
