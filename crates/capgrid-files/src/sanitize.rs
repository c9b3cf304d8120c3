//! File name sanitization.
//!
//! Stored names must never steer the storage key outside the scope
//! prefix, so everything except a final basename is discarded.

use cap_core::{CapabilityError, CapabilityResult};

/// Reduces a client-supplied file name to a safe basename.
///
/// Path separators (both `/` and `\`) split the name; only the last
/// non-empty segment survives, and `.` / `..` segments are dropped.
/// An empty survivor is an Invalid error.
pub fn sanitize_name(name: &str) -> CapabilityResult<String> {
    let basename = name
        .split(['/', '\\'])
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .next_back()
        .unwrap_or("")
        .trim();
    if basename.is_empty() {
        return Err(CapabilityError::invalid(format!(
            "file name {name:?} has no usable basename"
        )));
    }
    Ok(basename.to_string())
}

// ── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_passes_through() {
        assert_eq!(sanitize_name("report.pdf").unwrap(), "report.pdf");
    }

    #[test]
    fn traversal_is_reduced_to_basename() {
        assert_eq!(sanitize_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_name("/etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_name("..\\..\\windows\\system32").unwrap(), "system32");
    }

    #[test]
    fn dot_segments_are_dropped() {
        assert_eq!(sanitize_name("./notes.txt").unwrap(), "notes.txt");
        assert_eq!(sanitize_name("a/./b/../c.txt").unwrap(), "c.txt");
    }

    #[test]
    fn empty_results_are_invalid() {
        assert!(sanitize_name("").is_err());
        assert!(sanitize_name(".").is_err());
        assert!(sanitize_name("..").is_err());
        assert!(sanitize_name("../..").is_err());
        assert!(sanitize_name("   ").is_err());
    }
}
