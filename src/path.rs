//! # Virtual Paths
//!
//! Archive entries are addressed by *virtual paths*: `/`-separated keys that are independent of
//! the host filesystem. This module converts between host paths and virtual keys, and carries
//! the small string helpers (case folding, comparison, glob matching) the rest of the crate
//! relies on.
//!
//! Case rules are owned by the codecs: TES3/TES4 keys are folded to lower case on insertion,
//! FO4 keys keep their case. Nothing here folds case implicitly except [`make_path_canonizer`].

use std::path::{Path, PathBuf};

/// Convert backslashes to slashes.
///
/// `\` is a legal file name character on Unix, but archive paths always use it as a separator.
pub fn backslash_to_slash(path: &str) -> String {
    path.replace('\\', "/")
}

/// Convert slashes to backslashes, the on-disk separator of all three containers.
pub fn slash_to_backslash(path: &str) -> String {
    path.replace('/', "\\")
}

/// Unicode-aware lower-casing.
pub fn to_lower(s: &str) -> String {
    s.to_lowercase()
}

/// Returns `true` if both strings are equal, optionally ignoring case.
pub fn str_compare(lhs: &str, rhs: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        lhs == rhs
    } else {
        to_lower(lhs) == to_lower(rhs)
    }
}

/// Glob matching with `*` (any run), `?` (exactly one character) and `[set]` (one character of
/// the set). A set that is never closed makes the whole pattern fail.
pub fn str_match(text: &str, pattern: &str, case_sensitive: bool) -> bool {
    let fold = |s: &str| -> Vec<char> {
        if case_sensitive {
            s.chars().collect()
        } else {
            to_lower(s).chars().collect()
        }
    };
    let text = fold(text);
    let pattern = fold(pattern);

    let (mut ti, mut pi) = (0usize, 0usize);
    // Last `*` seen and the text position it is currently absorbing up to.
    let mut star: Option<(usize, usize)> = None;

    while ti < text.len() {
        if pi < pattern.len() {
            match pattern[pi] {
                '*' => {
                    star = Some((pi, ti));
                    pi += 1;
                    continue;
                }
                '?' => {
                    ti += 1;
                    pi += 1;
                    continue;
                }
                '[' => match parse_set(&pattern[pi..]) {
                    None => return false,
                    Some((set, len)) if set.contains(&text[ti]) => {
                        ti += 1;
                        pi += len;
                        continue;
                    }
                    Some(_) => {}
                },
                c if c == text[ti] => {
                    ti += 1;
                    pi += 1;
                    continue;
                }
                _ => {}
            }
        }

        match star {
            Some((star_pi, star_ti)) => {
                pi = star_pi + 1;
                ti = star_ti + 1;
                star = Some((star_pi, star_ti + 1));
            }
            None => return false,
        }
    }

    while pi < pattern.len() && pattern[pi] == '*' {
        pi += 1;
    }
    pi == pattern.len()
}

/// Parses `[...]` at the start of `pattern`. Returns the set and the number of pattern
/// characters it spans, brackets included.
fn parse_set(pattern: &[char]) -> Option<(&[char], usize)> {
    let close = pattern.iter().skip(1).position(|&c| c == ']')? + 1;
    Some((&pattern[1..close], close + 1))
}

/// Builds a closure that turns a host path into a lower-case, `/`-separated string with
/// everything up to and including the first occurrence of `start` removed.
///
/// Useful to turn `C:\Game\Data\Textures\a.dds` into `textures/a.dds` with `start = "data/"`.
pub fn make_path_canonizer(start: &str) -> impl Fn(&Path) -> String + '_ {
    move |path: &Path| {
        let s = backslash_to_slash(&to_lower(&path.to_string_lossy()));
        match s.find(start) {
            Some(pos) => s[pos + start.len()..].to_string(),
            None => s,
        }
    }
}

/// Lexically normalizes a relative path into a virtual key.
///
/// Both separators are accepted, empty and `.` components are dropped, and `..` cancels the
/// previous component. The result never starts or ends with `/`.
pub fn normalize_virtual(path: &Path) -> String {
    let s = backslash_to_slash(&path.to_string_lossy());
    let mut parts: Vec<&str> = Vec::new();
    for part in s.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Splits a normalized virtual key into its directory key and file key.
///
/// Files at the archive root get an empty directory key.
pub fn split_virtual(key: &str) -> (&str, &str) {
    match key.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", key),
    }
}

/// Maps a virtual key to a relative host path.
///
/// Root, `.` and `..` components are discarded so that an entry can never resolve outside the
/// directory it is extracted into.
pub fn virtual_to_local_path(key: &str) -> PathBuf {
    key.split(['/', '\\'])
        .filter(|c| !c.is_empty() && *c != "." && *c != ".." && !c.ends_with(':'))
        .collect()
}

/// Two-level variant of [`virtual_to_local_path`] for directory/file keyed archives.
pub fn virtual_to_local_path_in(directory: &str, file: &str) -> PathBuf {
    virtual_to_local_path(directory).join(virtual_to_local_path(file))
}
