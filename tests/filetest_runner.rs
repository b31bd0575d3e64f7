//! Dynamic test runner for `.dag` filetests.
//!
//! Discovers every `.dag` file under tests/filetests, lifts it as its RUN lines
//! ask and validates the output against the CHECK directives.

use liftdag::filecheck::{TestRunner, TestSpec};
use liftdag::PowerPc64;
use std::fs;
use std::path::{Path, PathBuf};

/// Discovers all .dag files in a directory recursively
fn discover_dag_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(discover_dag_files(&path));
            } else if path.extension().and_then(|s| s.to_str()) == Some("dag") {
                files.push(path);
            }
        }
    }

    files.sort();
    files
}

fn run_dag_file(runner: &TestRunner<'_>, path: &Path) -> Result<(), String> {
    let content = fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let spec = TestSpec::parse(&content);
    if spec.check_directives.is_empty() {
        return Err("no CHECK directives".to_string());
    }
    runner.run_test(&spec)
}

#[test]
fn run_all_filetests() {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/filetests");
    let files = discover_dag_files(&dir);
    assert!(!files.is_empty(), "no .dag files found in {}", dir.display());

    let target = PowerPc64::new();
    let runner = TestRunner::new(&target, false);

    let mut failures = Vec::new();
    for path in &files {
        let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("?").to_string();
        match run_dag_file(&runner, path) {
            Ok(()) => println!("PASS: {name}"),
            Err(e) => {
                println!("FAIL: {name}: {e}");
                failures.push(format!("{name}: {e}"));
            }
        }
    }

    println!("{} of {} filetests passed", files.len() - failures.len(), files.len());
    assert!(failures.is_empty(), "filetest failures:\n{}", failures.join("\n"));
}
