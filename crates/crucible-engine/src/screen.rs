//! Static code screener.
//!
//! Cheap pattern-based rejection of oversized and obviously dangerous
//! submissions before a sandbox is spun up. This is defence in depth, not
//! the isolation boundary: the patterns are assumed to be evadable, and the
//! sandbox (read-only root, no network, capped memory/CPU/pids, short
//! deadline) is never weakened because a pattern appears to cover a case.

use std::sync::OnceLock;

use regex::Regex;

use crucible_core::EngineError;

/// Modules a Python submission may import.
const PYTHON_ALLOWED_IMPORTS: &[&str] = &[
    "math", "random", "datetime", "json", "re", "string", "collections", "itertools",
    "functools", "typing",
];

/// Packages a Go submission may import.
const GO_ALLOWED_IMPORTS: &[&str] = &[
    "fmt", "strings", "strconv", "math", "time", "encoding/json", "errors", "sort", "regexp",
];

fn universal_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        compile(&[
            // shell invocation and process spawning
            r"(?i)(subprocess|exec\.|shell|eval|child_process)",
            // filesystem mutation
            r"(?i)(io/ioutil|os\.Open|os\.Create|os\.Remove)",
            // network access
            r"(?i)(net\.Listen|net\.Dial|http\.|urllib|axios)",
        ])
    })
}

fn python_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        compile(&[
            r"__import__",
            r"\b(globals|locals|vars)\s*\(",
            r"\b(getattr|setattr|delattr)\s*\(",
            r"\b(pip|setuptools|pkg_resources)\b",
        ])
    })
}

fn go_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        compile(&[
            r"unsafe\.",
            r"reflect\.",
            r"plugin\.",
            r"go/ast",
            r"syscall\.",
            r"debug\.",
            r"runtime\.",
            r"os\.Exit",
            r"panic\(",
        ])
    })
}

fn javascript_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        compile(&[
            r"\brequire\s*\(",
            r"import\s+.*\s+from",
            r"import\s*\{",
            r"\bprocess\b",
            r"\bglobal\b",
            r"\bBuffer\b",
            r"__proto__",
            r"\bprototype\b",
            r"\bfs\b",
            r"\bchild_process\b",
            r"\bFunction\b",
        ])
    })
}

fn compile(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|s| Regex::new(s).unwrap_or_else(|e| panic!("invalid screener pattern {s}: {e}")))
        .collect()
}

fn matches_any(patterns: &[Regex], code: &str) -> bool {
    patterns.iter().any(|p| p.is_match(code))
}

/// Screen a submission for the given (already catalog-resolved) language.
pub fn screen(language: &str, code: &str, max_code_len: usize) -> Result<(), EngineError> {
    if code.len() > max_code_len {
        return Err(EngineError::Rejected(format!(
            "code length exceeds maximum limit of {max_code_len} bytes"
        )));
    }

    if matches_any(universal_patterns(), code) {
        return Err(EngineError::Rejected(
            "prohibited system-level access detected".to_string(),
        ));
    }

    match language {
        "python" => {
            if let Some(module) = python_disallowed_import(code) {
                return Err(EngineError::Rejected(format!("unauthorized import: {module}")));
            }
            if matches_any(python_patterns(), code) {
                return Err(EngineError::Rejected(
                    "prohibited python code pattern detected".to_string(),
                ));
            }
        }
        "go" => {
            if let Some(package) = go_disallowed_import(code) {
                return Err(EngineError::Rejected(format!("unauthorized import: {package}")));
            }
            if matches_any(go_patterns(), code) {
                return Err(EngineError::Rejected(
                    "prohibited go code pattern detected".to_string(),
                ));
            }
        }
        "javascript" => {
            if matches_any(javascript_patterns(), code) {
                return Err(EngineError::Rejected(
                    "prohibited javascript code pattern detected".to_string(),
                ));
            }
        }
        // cpp and java have no module system reachable from the sandbox;
        // the universal patterns and the sandbox itself cover them.
        _ => {}
    }

    Ok(())
}

/// First Python import outside the allow-list, if any.
fn python_disallowed_import(code: &str) -> Option<String> {
    for line in code.lines() {
        let line = line.trim_start();
        let module = if let Some(rest) = line.strip_prefix("import ") {
            rest
        } else if let Some(rest) = line.strip_prefix("from ") {
            rest
        } else {
            continue;
        };

        // `import a, b` and `import a.b as c` both resolve to the head
        // module; only the head decides package access.
        for part in module.split(',') {
            let head = part
                .trim()
                .split(|c: char| c.is_whitespace() || c == '.' || c == ';' || c == '(')
                .next()
                .unwrap_or("");
            if head.is_empty() {
                continue;
            }
            if !PYTHON_ALLOWED_IMPORTS.contains(&head) {
                return Some(head.to_string());
            }
        }
    }
    None
}

/// First Go import outside the allow-list, if any. Handles both single-line
/// imports and parenthesized import blocks.
fn go_disallowed_import(code: &str) -> Option<String> {
    fn import_line_regex() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r#"^import\s+(?:\w+\s+)?"([^"]+)""#).unwrap())
    }
    fn block_line_regex() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r#"^(?:\w+\s+)?"([^"]+)"$"#).unwrap())
    }

    let mut in_block = false;
    for line in code.lines() {
        let line = line.trim();
        if in_block {
            if line.starts_with(')') {
                in_block = false;
                continue;
            }
            if let Some(caps) = block_line_regex().captures(line) {
                let package = &caps[1];
                if !GO_ALLOWED_IMPORTS.contains(&package) {
                    return Some(package.to_string());
                }
            }
            continue;
        }
        if line.starts_with("import (") {
            in_block = true;
            continue;
        }
        if let Some(caps) = import_line_regex().captures(line) {
            let package = &caps[1];
            if !GO_ALLOWED_IMPORTS.contains(&package) {
                return Some(package.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 10_000;

    fn rejected(language: &str, code: &str) -> bool {
        screen(language, code, LIMIT).is_err()
    }

    #[test]
    fn size_cap_applies_before_anything_else() {
        let long = "a".repeat(LIMIT + 1);
        let err = screen("python", &long, LIMIT).unwrap_err();
        assert!(err.to_string().contains("length exceeds"));
    }

    #[test]
    fn benign_programs_pass() {
        assert!(!rejected("python", "print('hello')"));
        assert!(!rejected("python", "import math\nprint(math.sqrt(2))"));
        assert!(!rejected("javascript", "console.log('hello')"));
        assert!(!rejected("cpp", "#include <iostream>\nint main(){ std::cout << 1; }"));
        assert!(!rejected("java", "class Main { public static void main(String[] a) {} }"));
        assert!(!rejected(
            "go",
            "package main\nimport \"fmt\"\nfunc main() { fmt.Println(\"hi\") }"
        ));
    }

    #[test]
    fn shell_and_process_spawning_are_universal_rejections() {
        assert!(rejected("python", "import subprocess\nsubprocess.run(['ls'])"));
        assert!(rejected("javascript", "child_process.execSync('ls')"));
        assert!(rejected("python", "eval('1+1')"));
    }

    #[test]
    fn filesystem_mutation_is_rejected() {
        assert!(rejected("go", "f, _ := os.Open(\"/etc/passwd\")"));
        assert!(rejected("go", "os.Remove(\"/tmp/x\")"));
    }

    #[test]
    fn network_access_is_rejected() {
        assert!(rejected("python", "import urllib.request"));
        assert!(rejected("javascript", "axios.get('http://example.com')"));
        assert!(rejected("go", "net.Dial(\"tcp\", \"example.com:80\")"));
    }

    #[test]
    fn python_import_allow_list() {
        assert!(rejected("python", "import os"));
        assert!(rejected("python", "import socket"));
        assert!(rejected("python", "from os import path"));
        assert!(rejected("python", "import math, os"));
        assert!(!rejected("python", "from collections import Counter"));
        assert!(!rejected("python", "import itertools\nimport functools"));
    }

    #[test]
    fn python_reflection_and_packaging_are_rejected() {
        assert!(rejected("python", "__import__('os')"));
        assert!(rejected("python", "getattr(object, 'x')"));
        assert!(rejected("python", "globals()['x'] = 1"));
        assert!(rejected("python", "import pip"));
    }

    #[test]
    fn go_import_allow_list() {
        assert!(rejected("go", "package main\nimport \"os\"\nfunc main() {}"));
        assert!(rejected(
            "go",
            "package main\nimport (\n\t\"fmt\"\n\t\"os/exec\"\n)\nfunc main() {}"
        ));
        assert!(!rejected(
            "go",
            "package main\nimport (\n\t\"fmt\"\n\t\"strings\"\n)\nfunc main() { fmt.Println(strings.ToUpper(\"a\")) }"
        ));
    }

    #[test]
    fn go_escape_hatches_are_rejected() {
        assert!(rejected("go", "unsafe.Pointer(nil)"));
        assert!(rejected("go", "func main() { panic(\"x\") }"));
        assert!(rejected("go", "os.Exit(1)"));
    }

    #[test]
    fn javascript_module_and_prototype_access_is_rejected() {
        assert!(rejected("javascript", "const fs = require('fs')"));
        assert!(rejected("javascript", "import x from 'fs'"));
        assert!(rejected("javascript", "process.exit(1)"));
        assert!(rejected("javascript", "({}).__proto__.polluted = true"));
        assert!(rejected("javascript", "new Function('return 1')()"));
    }

    #[test]
    fn memory_hog_is_not_a_screener_concern() {
        // The memory cap, not the screener, handles allocation bombs.
        assert!(!rejected("python", "a=[0]*10**9"));
    }
}
