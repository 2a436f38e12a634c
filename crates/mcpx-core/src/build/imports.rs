//! Relative import scanning.
//!
//! Finds the same-project dependencies of a source file by reading its
//! original (uncompiled) text.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// `import x from '...'`, `import '...'`, `export * from '...'`
static STATIC_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)(?:^|[;\s])(?:import|export)\s+(?:[^'";]*?\s+from\s+)?['"]([^'"\n]+)['"]"#)
        .expect("static import pattern")
});

/// `import('...')` and `require('...')`
static CALL_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:\bimport|\brequire)\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#)
        .expect("call import pattern")
});

/// Extensions an import may name for a file that is authored under another
/// extension (`./utils.js` written for `utils.ts`)
const EMITTED_EXTENSIONS: [&str; 4] = ["js", "mjs", "cjs", "jsx"];

/// String literals (kept) ahead of block and line comments (stripped), so
/// that `//` inside `'https://...'` is not taken for a comment
static COMMENT_OR_STRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"'(?:[^'\\\n]|\\.)*'|"(?:[^"\\\n]|\\.)*"|`(?:[^`\\]|\\.)*`|(?s:/\*.*?\*/)|//[^\n]*"#,
    )
    .expect("comment pattern")
});

fn strip_comments(source: &str) -> Cow<'_, str> {
    COMMENT_OR_STRING.replace_all(source, |caps: &Captures<'_>| {
        let text = &caps[0];
        if text.starts_with('/') {
            " ".to_string()
        } else {
            text.to_string()
        }
    })
}

/// True when `specifier` starts with a relative-path marker
pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Relative import specifiers in `source`, deduplicated, in order of
/// appearance
pub fn relative_imports(source: &str) -> Vec<String> {
    let source = strip_comments(source);
    let mut found: Vec<(usize, String)> = STATIC_IMPORT
        .captures_iter(&source)
        .chain(CALL_IMPORT.captures_iter(&source))
        .filter_map(|caps| caps.get(1))
        .filter(|m| is_relative(m.as_str()))
        .map(|m| (m.start(), m.as_str().to_string()))
        .collect();
    found.sort_by_key(|(pos, _)| *pos);

    let mut specifiers: Vec<String> = Vec::with_capacity(found.len());
    for (_, spec) in found {
        if !specifiers.contains(&spec) {
            specifiers.push(spec);
        }
    }
    specifiers
}

/// Locate the source file a relative specifier refers to
///
/// Tries, in order: the path as written, the path with its extension swapped
/// for each accepted extension (`./utils.js` → `utils.ts`), the path with
/// each accepted extension appended, and an `index` file in that directory.
pub fn resolve_source_import(
    specifier: &str,
    source_dir: &Path,
    extensions: &[String],
) -> Option<PathBuf> {
    let base = normalize(&source_dir.join(specifier));

    if base.is_file() {
        return Some(base);
    }

    let emitted = base
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EMITTED_EXTENSIONS.contains(&e));
    if emitted {
        for ext in extensions {
            let candidate = base.with_extension(ext);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    for ext in extensions {
        let mut candidate = base.clone().into_os_string();
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    extensions
        .iter()
        .map(|ext| base.join(format!("index.{ext}")))
        .find(|candidate| candidate.is_file())
}

/// Lexically resolve `.` and `..` components
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
