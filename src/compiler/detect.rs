// src/compiler/detect.rs

//! Choosing an adapter variant from a path.
//!
//! Rules are matched against the file name, top to bottom, first match
//! wins. The sequence rule comes first because `case*.in` would otherwise
//! be taken for a single text file.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::CompilerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Text,
    Sequence,
    C,
    #[serde(rename = "c++")]
    Cpp,
    Pascal,
    Python2,
    Python3,
    Executable,
}

impl SourceKind {
    /// Canonical name; for compiled and interpreted kinds this is also the
    /// toolchain key in `judge.yaml`.
    pub fn language_tag(self) -> &'static str {
        match self {
            SourceKind::Text => "text",
            SourceKind::Sequence => "sequence",
            SourceKind::C => "c",
            SourceKind::Cpp => "c++",
            SourceKind::Pascal => "pascal",
            SourceKind::Python2 => "python2",
            SourceKind::Python3 => "python3",
            SourceKind::Executable => "executable",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.language_tag())
    }
}

impl FromStr for SourceKind {
    type Err = CompilerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_lowercase().as_str() {
            "text" | "file" => SourceKind::Text,
            "sequence" | "files" => SourceKind::Sequence,
            "c" => SourceKind::C,
            "c++" | "cpp" | "cxx" => SourceKind::Cpp,
            "pascal" | "pas" => SourceKind::Pascal,
            "python" | "python3" | "py" => SourceKind::Python3,
            "python2" | "py2" => SourceKind::Python2,
            "exe" | "executable" | "binary" => SourceKind::Executable,
            _ => return Err(CompilerError::UnknownSourceType(s.to_string())),
        };
        Ok(kind)
    }
}

fn rules() -> &'static [(Regex, SourceKind)] {
    static RULES: OnceLock<Vec<(Regex, SourceKind)>> = OnceLock::new();

    RULES.get_or_init(|| {
        [
            (r"\*", SourceKind::Sequence),
            (r"(?i)\.(txt|in|out|ans)$", SourceKind::Text),
            (r"(?i)\.(cpp|cc|cxx|c\+\+)$", SourceKind::Cpp),
            (r"(?i)\.c$", SourceKind::C),
            (r"(?i)\.(pas|pp)$", SourceKind::Pascal),
            (r"(?i)\.(py|py3)$", SourceKind::Python3),
            (r"(?i)\.py2$", SourceKind::Python2),
            (r"(?i)\.exe$", SourceKind::Executable),
            (r"^[^.]+$", SourceKind::Executable),
        ]
        .into_iter()
        .map(|(pattern, kind)| {
            (
                Regex::new(pattern).expect("detection rule patterns are valid"),
                kind,
            )
        })
        .collect()
    })
}

/// Kind for `path` by file name alone. Anything unmatched is text.
pub fn detect(path: &Path) -> SourceKind {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();

    rules()
        .iter()
        .find(|(re, _)| re.is_match(&name))
        .map(|(_, kind)| *kind)
        .unwrap_or(SourceKind::Text)
}

/// Explicit override when given (and non-empty), detection otherwise.
pub fn resolve_kind(path: &Path, type_override: Option<&str>) -> Result<SourceKind, CompilerError> {
    match type_override.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => name.parse(),
        None => Ok(detect(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(p: &str) -> SourceKind {
        detect(Path::new(p))
    }

    #[test]
    fn suffix_rules() {
        assert_eq!(kind("data/1.in"), SourceKind::Text);
        assert_eq!(kind("data/1.ANS"), SourceKind::Text);
        assert_eq!(kind("notes.txt"), SourceKind::Text);
        assert_eq!(kind("sol.cpp"), SourceKind::Cpp);
        assert_eq!(kind("sol.c++"), SourceKind::Cpp);
        assert_eq!(kind("sol.c"), SourceKind::C);
        assert_eq!(kind("sol.pas"), SourceKind::Pascal);
        assert_eq!(kind("gen.py"), SourceKind::Python3);
        assert_eq!(kind("gen.py2"), SourceKind::Python2);
        assert_eq!(kind("std.exe"), SourceKind::Executable);
        assert_eq!(kind("./build/std"), SourceKind::Executable);
        assert_eq!(kind("weird.xyz"), SourceKind::Text);
    }

    #[test]
    fn sequence_wins_over_suffix() {
        assert_eq!(kind("tests/case*.in"), SourceKind::Sequence);
        assert_eq!(kind("tests/case*"), SourceKind::Sequence);
    }

    #[test]
    fn directory_dots_do_not_matter() {
        assert_eq!(kind("v1.2/gen"), SourceKind::Executable);
        assert_eq!(kind("a.cpp/readme"), SourceKind::Executable);
    }

    #[test]
    fn override_takes_precedence() {
        let path = Path::new("sol.txt");
        assert_eq!(resolve_kind(path, Some("C++")).unwrap(), SourceKind::Cpp);
        assert_eq!(resolve_kind(path, Some("")).unwrap(), SourceKind::Text);
        assert_eq!(resolve_kind(path, None).unwrap(), SourceKind::Text);
        assert!(matches!(
            resolve_kind(path, Some("cobol")),
            Err(CompilerError::UnknownSourceType(_))
        ));
    }
}
