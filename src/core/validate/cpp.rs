//! Detection of C++ constructs leaking into what must be plain C.

use regex::Regex;
use std::sync::LazyLock;

/// Pattern families scanned in order; matches from every family are reported
const FAMILIES: &[(&str, &[&str])] = &[
    (
        "headers",
        &[
            r"#include\s*<iostream>",
            r"#include\s*<string>",
            r"#include\s*<sstream>",
            r"#include\s*<vector>",
            r"#include\s*<map>",
            r"#include\s*<set>",
            r"#include\s*<list>",
            r"#include\s*<deque>",
            r"#include\s*<algorithm>",
            r"#include\s*<functional>",
            r"#include\s*<stdexcept>",
        ],
    ),
    (
        "namespaces",
        &[r"\bnamespace\s+\w+", r"\busing\s+namespace\s+std\b"],
    ),
    (
        "keywords",
        &[
            r"\bclass\s+\w+",
            r"\btemplate\s*<",
            r"\bpublic\s*:",
            r"\bprivate\s*:",
            r"\bprotected\s*:",
            r"\btry\b",
            r"\bcatch\s*\(",
            r"\bexplicit\b",
            r"\boverride\b",
            r"\bconstexpr\b",
            r"\bnoexcept\b",
            r"\bnullptr\b",
        ],
    ),
    (
        "syntax",
        &[
            r"\bstd::\w+",
            r"\bnew\s+\w+",
            r"\bdelete\s+\w+",
            r"\bcout\s*<<",
            r"\bcin\s*>>",
            r"\bendl\b",
        ],
    ),
    (
        "memory",
        &[
            r"\bstd::unique_ptr\b",
            r"\bstd::shared_ptr\b",
            r"\bstd::make_shared\b",
            r"\bstd::make_unique\b",
        ],
    ),
];

static COMPILED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    FAMILIES
        .iter()
        .flat_map(|(_, patterns)| patterns.iter())
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Matched C++ constructs (as written in the code), deduplicated, in scan order.
///
/// Expects comment-stripped code.
pub fn find_cpp_constructs(code: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for re in COMPILED.iter() {
        if let Some(m) = re.find(code) {
            let construct = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
            if !found.contains(&construct) {
                found.push(construct);
            }
        }
    }
    found
}
