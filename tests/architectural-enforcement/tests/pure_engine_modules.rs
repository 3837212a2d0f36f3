//! Integration Test: Pure Engine Modules
//!
//! Field definitions, validation, augmentation, traversal and presentation
//! are plain data transformations. They must compile and run without an async
//! runtime or an HTTP client, so they can back any front end.

use architectural_enforcement::{production_lines, workspace_root};

const PURE_MODULES: &[&str] = &[
    "field.rs",
    "validation.rs",
    "augment.rs",
    "traversal.rs",
    "presentation.rs",
    "ids.rs",
];

const FORBIDDEN: &[&str] = &["tokio", "reqwest", "async fn", ".await"];

#[test]
fn test_pure_modules_have_no_runtime_dependencies() {
    let src = workspace_root().join("chatflow/core/src");
    assert!(src.exists(), "core sources not found at {}", src.display());

    let mut violations = Vec::new();
    for module in PURE_MODULES {
        let path = src.join(module);
        assert!(path.exists(), "missing module {}", path.display());

        for line in production_lines(&path) {
            if let Some(word) = FORBIDDEN.iter().find(|w| line.code.contains(*w)) {
                violations.push(format!(
                    "{}:{} - uses `{word}`: {}",
                    line.path.display(),
                    line.number,
                    line.code.trim()
                ));
            }
        }
    }

    if !violations.is_empty() {
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        panic!(
            "\nFound {} runtime dependency violation(s) in pure engine modules.",
            violations.len()
        );
    }
}
