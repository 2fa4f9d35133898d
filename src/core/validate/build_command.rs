//! Classifies a model-supplied build command as C or C++.

use regex::Regex;
use std::sync::LazyLock;

const CPP_COMPILERS: &[&str] = &["g++", "clang++"];
const CPP_EXTENSIONS: &[&str] = &[".cpp", ".cc", ".cxx", ".hpp"];
const CPP_LINK_FLAGS: &[&str] = &[
    "-lstdc++",
    "-lc++",
    "-lboost",
    "-lopencv",
    "-lopencv_core",
    "-lboost_system",
    "-stdlib=libc++",
];

static PKG_CONFIG_OPENCV: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)pkg-config\s+--cflags\s+--libs\s+opencv").ok());

/// Unbalanced quote or trailing escape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnbalancedQuoting;

/// POSIX-shell style word splitting (quotes and backslash escapes).
pub fn shell_split(command: &str) -> Result<Vec<String>, UnbalancedQuoting> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => return Err(UnbalancedQuoting),
                    }
                }
            }
            '"' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(ch @ ('"' | '\\' | '$' | '`')) => current.push(ch),
                            Some('\n') => {}
                            Some(ch) => {
                                current.push('\\');
                                current.push(ch);
                            }
                            None => return Err(UnbalancedQuoting),
                        },
                        Some(ch) => current.push(ch),
                        None => return Err(UnbalancedQuoting),
                    }
                }
            }
            '\\' => {
                in_token = true;
                match chars.next() {
                    Some('\n') => {}
                    Some(ch) => current.push(ch),
                    None => return Err(UnbalancedQuoting),
                }
            }
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                in_token = true;
                current.push(c);
            }
        }
    }

    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Quote-aware split, falling back to plain whitespace splitting
pub fn tokenize(command: &str) -> Vec<String> {
    shell_split(command)
        .unwrap_or_else(|_| command.split_whitespace().map(String::from).collect())
}

/// True if the command shows signs of compiling or linking C++
pub fn looks_cpp(command: &str) -> bool {
    if command.trim().is_empty() {
        return false;
    }

    let token_hit = tokenize(command).iter().any(|token| {
        let token = token.to_lowercase();
        // Compiler may be given by path, e.g. /usr/bin/g++
        let program = token.rsplit('/').next().unwrap_or(token.as_str());
        CPP_COMPILERS.contains(&program)
            || CPP_EXTENSIONS.iter().any(|ext| token.ends_with(ext))
            || CPP_LINK_FLAGS.contains(&token.as_str())
    });

    token_hit
        || PKG_CONFIG_OPENCV
            .as_ref()
            .is_some_and(|re| re.is_match(command))
}
