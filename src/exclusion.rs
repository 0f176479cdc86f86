//! Subtree and pattern exclusion for the source tree walk

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::BackupError;

/// Rule describing which part of the source tree is left out of the mirror.
///
/// One subtree is always excluded (the trash folder by default). A rule
/// containing a `/` is an exact path match, anchored at the tree root, and
/// covers every descendant of that path; a bare word matches folders by
/// display name. Extra glob patterns can widen the exclusion.
#[derive(Debug)]
pub struct Exclusion {
	subtree: SubtreeRule,
	patterns: Option<GlobSet>,
}

#[derive(Debug)]
enum SubtreeRule {
	Path(String),
	Name(String),
}

impl Exclusion {
	pub fn new(subtree: &str, extra_patterns: &[String]) -> Result<Self, BackupError> {
		let subtree = if subtree.contains('/') {
			let mut path = subtree.to_string();
			if !path.starts_with('/') {
				path.insert(0, '/');
			}
			if !path.ends_with('/') {
				path.push('/');
			}
			SubtreeRule::Path(path)
		} else {
			SubtreeRule::Name(subtree.to_string())
		};

		let patterns = if extra_patterns.is_empty() {
			None
		} else {
			let mut builder = GlobSetBuilder::new();
			for pattern in extra_patterns {
				let glob = Glob::new(pattern).map_err(|e| BackupError::InvalidConfig {
					message: format!("invalid exclude pattern '{}': {}", pattern, e),
				})?;
				builder.add(glob);
			}
			Some(builder.build().map_err(|e| BackupError::InvalidConfig {
				message: format!("cannot compile exclude patterns: {}", e),
			})?)
		};

		Ok(Exclusion { subtree, patterns })
	}

	/// Whether a node with this name and path is excluded from the mirror
	pub fn excludes(&self, name: &str, path: &str) -> bool {
		match &self.subtree {
			SubtreeRule::Path(subtree) => {
				if path == subtree || path.starts_with(subtree.as_str()) {
					return true;
				}
			}
			SubtreeRule::Name(subtree) => {
				if name == subtree {
					return true;
				}
			}
		}

		if let Some(set) = &self.patterns {
			if set.is_match(path.trim_start_matches('/')) {
				return true;
			}
		}

		false
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_path_rule_matches_subtree_and_descendants() {
		let excl = Exclusion::new("/Trash/", &[]).unwrap();
		assert!(excl.excludes("Trash", "/Trash/"));
		assert!(excl.excludes("Old", "/Trash/Old/"));
		assert!(excl.excludes("junk.pdf", "/Trash/junk.pdf"));
		assert!(!excl.excludes("Legal", "/Legal/"));
	}

	#[test]
	fn test_path_rule_requires_full_component() {
		let excl = Exclusion::new("/Trash/", &[]).unwrap();
		assert!(!excl.excludes("Trashy", "/Trashy/"));
	}

	#[test]
	fn test_path_rule_is_normalized() {
		let excl = Exclusion::new("Archive/2019", &[]).unwrap();
		assert!(excl.excludes("2019", "/Archive/2019/"));
		assert!(excl.excludes("q1.xls", "/Archive/2019/q1.xls"));
		assert!(!excl.excludes("2020", "/Archive/2020/"));
	}

	#[test]
	fn test_name_rule_matches_by_display_name() {
		let excl = Exclusion::new("Trash", &[]).unwrap();
		assert!(excl.excludes("Trash", "/Some/Nested/Trash/"));
		assert!(!excl.excludes("Legal", "/Legal/"));
	}

	#[test]
	fn test_extra_glob_patterns() {
		let patterns = vec!["**/*.tmp".to_string()];
		let excl = Exclusion::new("/Trash/", &patterns).unwrap();
		assert!(excl.excludes("a.tmp", "/Work/a.tmp"));
		assert!(!excl.excludes("a.pdf", "/Work/a.pdf"));
	}

	#[test]
	fn test_invalid_pattern_is_rejected() {
		let patterns = vec!["[".to_string()];
		assert!(Exclusion::new("/Trash/", &patterns).is_err());
	}
}

// vim: ts=4
