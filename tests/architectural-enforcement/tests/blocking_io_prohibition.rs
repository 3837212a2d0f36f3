//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async code in the core and the CLI MUST NOT use blocking I/O.
//! **Required**: `tokio::fs` and `tokio::io`, not `std::fs` or `std::io::stdin()`.
//!
//! Synchronous functions (config loading, argument parsing) and test code
//! are exempt.

use architectural_enforcement::{production_lines, workspace_root};

const BLOCKING: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("reqwest::blocking", "Blocking HTTP client"),
    ("std::io::stdin()", "Blocking stdin"),
    ("std::io::stdout()", "Blocking stdout"),
    ("std::thread::sleep", "Blocking sleep"),
];

fn find_blocking_io_violations() -> Vec<String> {
    let root = workspace_root();
    let mut violations = Vec::new();

    for dir in ["chatflow/core/src", "chatflow/cli/src"] {
        let path = root.join(dir);
        assert!(path.exists(), "sources not found at {}", path.display());

        for line in production_lines(&path) {
            if !line.in_async_fn {
                continue;
            }
            for (pattern, kind) in BLOCKING {
                if line.code.contains(pattern) {
                    violations.push(format!(
                        "{}:{} - {kind}: {}",
                        line.path.display(),
                        line.number,
                        line.code.trim()
                    ));
                }
            }
        }
    }

    violations
}

#[test]
fn test_no_blocking_io_in_async_code() {
    let violations = find_blocking_io_violations();

    if !violations.is_empty() {
        eprintln!("\n❌ Blocking I/O calls found in async code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ REQUIRED async I/O:");
        eprintln!("  - tokio::fs::read_to_string().await, tokio::fs::OpenOptions");
        eprintln!("  - tokio::io::stdin(), tokio::io::stdout()");
        eprintln!("  - tokio::time::sleep().await");

        panic!(
            "\nFound {} blocking I/O violation(s) in async code.",
            violations.len()
        );
    }
}

#[test]
fn test_scanner_sees_async_functions() {
    let lines = production_lines(&workspace_root().join("chatflow/cli/src/form_file.rs"));
    assert!(
        lines
            .iter()
            .any(|l| l.in_async_fn && l.code.contains("tokio::fs::read_to_string")),
        "form loading should be scanned as async code"
    );
}
