//! Canonical path model.
//!
//! # Responsibility
//! - Normalize filesystem paths into one comparable string form.
//! - Serve as the join key between walker output and note store rows.
//!
//! # Invariants
//! - A `CanonicalPath` is always absolute and `/`-separated.
//! - No duplicate separators, no trailing separator except for the root.
//! - `.` segments are dropped and `..` segments are resolved lexically, so
//!   normalization never touches the filesystem and works for missing paths.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Errors produced when a raw path cannot be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Input is blank after trim.
    Empty,
    /// Input is not absolute; canonical paths never depend on a cwd.
    Relative(String),
    /// Input is not valid UTF-8 and cannot be used as a store key.
    NonUtf8(String),
}

impl Display for PathError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "path must not be empty"),
            Self::Relative(raw) => write!(f, "path must be absolute, got `{raw}`"),
            Self::NonUtf8(lossy) => write!(f, "path is not valid UTF-8: `{lossy}`"),
        }
    }
}

impl Error for PathError {}

/// Absolute, separator-normalized path used as a classification key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalPath(String);

impl CanonicalPath {
    /// Normalizes a raw string path.
    ///
    /// Accepts both `/` and `\` separators. Windows drive prefixes are kept
    /// and upper-cased (`c:\x` -> `C:/x`).
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.trim().is_empty() {
            return Err(PathError::Empty);
        }

        // Whitespace is part of a file name; only blank input is rejected.
        let unified = raw.replace('\\', "/");
        let (prefix, rest) = match split_drive_prefix(&unified) {
            Some((drive, rest)) => (format!("{}:", drive.to_ascii_uppercase()), rest),
            None if unified.starts_with('/') => (String::new(), unified.as_str()),
            None => return Err(PathError::Relative(raw.to_string())),
        };

        let mut segments: Vec<&str> = Vec::new();
        for segment in rest.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }

        let mut normalized = prefix;
        if segments.is_empty() {
            normalized.push('/');
        }
        for segment in segments {
            normalized.push('/');
            normalized.push_str(segment);
        }
        Ok(Self(normalized))
    }

    /// Normalizes an OS path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PathError> {
        let path = path.as_ref();
        match path.to_str() {
            Some(raw) => Self::parse(raw),
            None => Err(PathError::NonUtf8(path.to_string_lossy().into_owned())),
        }
    }

    /// Returns the canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last path segment, or the whole path for a root.
    pub fn file_name(&self) -> &str {
        match self.0.rsplit_once('/') {
            Some((_, name)) if !name.is_empty() => name,
            _ => &self.0,
        }
    }

    /// Returns `true` when `self` equals `ancestor` or lies beneath it.
    pub fn starts_with(&self, ancestor: &CanonicalPath) -> bool {
        if self.0 == ancestor.0 {
            return true;
        }
        let base = ancestor.0.trim_end_matches('/');
        self.0
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl Display for CanonicalPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CanonicalPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CanonicalPath> for String {
    fn from(value: CanonicalPath) -> Self {
        value.0
    }
}

fn split_drive_prefix(value: &str) -> Option<(char, &str)> {
    let mut chars = value.chars();
    let drive = chars.next()?;
    if !drive.is_ascii_alphabetic() || chars.next()? != ':' {
        return None;
    }
    let rest = &value[2..];
    if rest.is_empty() || rest.starts_with('/') {
        Some((drive, rest))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{CanonicalPath, PathError};

    fn canon(raw: &str) -> String {
        CanonicalPath::parse(raw)
            .expect("path should normalize")
            .as_str()
            .to_string()
    }

    #[test]
    fn trailing_and_duplicate_separators_collapse() {
        assert_eq!(canon("/home/u/proj/"), "/home/u/proj");
        assert_eq!(canon("//home///u/proj"), "/home/u/proj");
        assert_eq!(canon("/"), "/");
    }

    #[test]
    fn mixed_separators_normalize_equal() {
        assert_eq!(canon("/home\\u/proj\\a.txt"), canon("/home/u/proj/a.txt"));
        assert_eq!(canon("c:\\Work\\a.txt"), "C:/Work/a.txt");
        assert_eq!(canon("C:/"), "C:/");
    }

    #[test]
    fn dot_segments_resolve_lexically() {
        assert_eq!(canon("/a/./b/../c"), "/a/c");
        assert_eq!(canon("/../a"), "/a");
    }

    #[test]
    fn relative_and_blank_inputs_are_rejected() {
        assert_eq!(CanonicalPath::parse("  "), Err(PathError::Empty));
        assert!(matches!(
            CanonicalPath::parse("src/lib.rs"),
            Err(PathError::Relative(_))
        ));
        assert!(matches!(
            CanonicalPath::parse("c:relative"),
            Err(PathError::Relative(_))
        ));
    }

    #[test]
    fn surrounding_whitespace_is_part_of_the_name() {
        assert_ne!(canon("/r/a.txt "), canon("/r/a.txt"));
        assert_eq!(canon("/r/a.txt "), "/r/a.txt ");
        assert_eq!(CanonicalPath::parse("/r/ b").unwrap().file_name(), " b");
    }

    #[test]
    fn file_name_and_ancestry() {
        let root = CanonicalPath::parse("/proj").unwrap();
        let child = CanonicalPath::parse("/proj/src/main.rs").unwrap();
        let sibling = CanonicalPath::parse("/project/x").unwrap();

        assert_eq!(child.file_name(), "main.rs");
        assert!(child.starts_with(&root));
        assert!(!sibling.starts_with(&root));
        assert!(child.starts_with(&CanonicalPath::parse("/").unwrap()));
    }

    #[test]
    fn serde_uses_canonical_string() {
        let parsed: CanonicalPath = serde_json::from_str("\"/a//b/\"").unwrap();
        assert_eq!(parsed.as_str(), "/a/b");
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"/a/b\"");
    }
}
