//! Shell-style defaults file parsing
//!
//! Reads `/etc/default/<name>`-style files: `KEY=VALUE` assignments with
//! comments, single or double quotes, an optional `export` prefix and
//! `$VAR` / `${VAR}` expansion against earlier assignments. Lines that are
//! not plain assignments are shell code and are skipped.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::ConfigError;

/// Apply the assignments in `path` on top of `vars`
///
/// A missing or unreadable file leaves `vars` untouched, the same as
/// `[ -r "$file" ] && . "$file"` in an init script.
pub fn apply_file(path: &Path, vars: &mut HashMap<String, String>) -> Result<(), ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
            debug!(path = %path.display(), "Defaults file not readable, skipping");
            return Ok(());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let applied = apply_content(&contents, vars);
    debug!(path = %path.display(), applied, "Loaded defaults file");
    Ok(())
}

/// Apply the assignments in `content` on top of `vars`
///
/// Returns the number of assignments applied.
pub fn apply_content(content: &str, vars: &mut HashMap<String, String>) -> usize {
    let mut applied = 0;

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);

        let Some((key, raw_value)) = line.split_once('=') else {
            debug!(line = line_num + 1, "Skipping non-assignment line");
            continue;
        };

        if !is_identifier(key) {
            debug!(line = line_num + 1, "Skipping line without a plain variable name");
            continue;
        }

        let value = parse_value(raw_value, vars);
        vars.insert(key.to_string(), value);
        applied += 1;
    }

    applied
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse the right-hand side of an assignment
///
/// Unquoted values end at the first whitespace. Single-quoted text is
/// literal; double-quoted and unquoted text is expanded.
fn parse_value(raw: &str, vars: &HashMap<String, String>) -> String {
    let mut value = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    value.push(c);
                }
            }
            '"' => {
                let mut quoted = String::new();
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => {
                            if let Some(&next) = chars.peek() {
                                if matches!(next, '"' | '\\' | '$' | '`') {
                                    quoted.push('\\');
                                    quoted.push(next);
                                    chars.next();
                                    continue;
                                }
                            }
                            quoted.push('\\');
                        }
                        _ => quoted.push(c),
                    }
                }
                value.push_str(&expand(&quoted, vars));
            }
            c if c.is_whitespace() => break,
            _ => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || next == '\'' || next == '"' {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                value.push_str(&expand(&word, vars));
            }
        }
    }

    value
}

/// Expand `$VAR` and `${VAR}` references; unknown variables expand to nothing
///
/// A backslash escapes the following `$`, `"`, `\` or backtick.
fn expand(text: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some(&next) if matches!(next, '$' | '"' | '\\' | '`') => {
                    out.push(next);
                    chars.next();
                }
                _ => out.push('\\'),
            },
            '$' => {
                let braced = chars.peek() == Some(&'{');
                if braced {
                    chars.next();
                }

                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }

                if braced {
                    if chars.peek() == Some(&'}') {
                        chars.next();
                    } else {
                        out.push_str("${");
                        out.push_str(&name);
                        continue;
                    }
                }

                if name.is_empty() {
                    out.push('$');
                } else if let Some(value) = vars.get(&name) {
                    out.push_str(value);
                }
            }
            _ => out.push(c),
        }
    }

    out
}
