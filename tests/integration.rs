//! Integration tests for mu


use assert_cmd::Command;
use harness::{TempTree, row_paths, run_mu};
use predicates::prelude::*;

#[test]
fn test_reports_directories_children_first() {
    let tree = TempTree::new();
    tree.file("a/b/file", 4096);

    let (stdout, _stderr, success) = run_mu(tree.path(), &[]);
    assert!(success, "mu should succeed: {}", stdout);

    let rows = row_paths(&stdout);
    assert_eq!(rows, vec!["./a/b", "./a", "."]);
}

#[test]
fn test_files_appear_only_with_all() {
    let tree = TempTree::new();
    tree.file("a/file", 4096);

    let (stdout, _stderr, success) = run_mu(tree.path(), &[]);
    assert!(success);
    assert!(
        !stdout.contains("./a/file"),
        "files are hidden by default: {}",
        stdout
    );

    let (stdout, _stderr, success) = run_mu(tree.path(), &["-a"]);
    assert!(success);
    assert_eq!(row_paths(&stdout), vec!["./a/file", "./a", "."]);
}

#[test]
fn test_summarize_prints_one_row_per_argument() {
    let tree = TempTree::new();
    tree.file("a/b/c/deep", 64);

    let (stdout, _stderr, success) = run_mu(tree.path(), &["-s"]);
    assert!(success);
    assert_eq!(row_paths(&stdout), vec!["."]);
}

#[test]
fn test_max_depth_prunes_rows() {
    let tree = TempTree::new();
    tree.file("a/b/c/deep", 64);

    let (stdout, _stderr, success) = run_mu(tree.path(), &["-d", "1"]);
    assert!(success);
    assert_eq!(row_paths(&stdout), vec!["./a", "."]);
}

#[test]
fn test_summarize_conflicts_with_nonzero_max_depth() {
    let tree = TempTree::new();
    let (_stdout, stderr, success) = run_mu(tree.path(), &["-s", "-d", "2"]);
    assert!(!success);
    assert!(stderr.contains("summarizing conflicts with --max-depth"));
}

#[test]
fn test_all_conflicts_with_summarize() {
    let tree = TempTree::new();
    let (_stdout, stderr, success) = run_mu(tree.path(), &["-a", "-s"]);
    assert!(!success);
    assert!(stderr.contains("cannot both summarize and show all entries"));
}

#[test]
fn test_exclude_drops_whole_subtree() {
    let tree = TempTree::new();
    tree.file("keep/data", 64);
    tree.file("skip/data", 64);

    let (stdout, _stderr, success) = run_mu(tree.path(), &["--exclude", "skip"]);
    assert!(success);
    assert_eq!(row_paths(&stdout), vec!["./keep", "."]);
}

#[test]
fn test_grand_total_row_comes_last() {
    let tree = TempTree::new();
    tree.file("a/file", 64);

    let (stdout, _stderr, success) = run_mu(tree.path(), &["-c"]);
    assert!(success);
    let rows = row_paths(&stdout);
    assert_eq!(rows.last().map(String::as_str), Some("total"));
}

#[test]
fn test_null_terminated_output() {
    let tree = TempTree::new();
    tree.file("a/file", 64);

    let binary = env!("CARGO_BIN_EXE_mu");
    let output = std::process::Command::new(binary)
        .arg("-0")
        .current_dir(tree.path())
        .output()
        .expect("Failed to run mu");

    assert!(output.status.success());
    assert!(output.stdout.contains(&0u8), "rows end with NUL");
    assert!(
        !output.stdout.contains(&b'\n'),
        "no newlines in NUL-terminated mode"
    );
}

#[test]
fn test_missing_root_fails_but_keeps_going() {
    let tree = TempTree::new();
    tree.file("real/file", 64);

    let (stdout, stderr, success) = run_mu(tree.path(), &["no-such-dir", "real"]);
    assert!(!success, "missing operand must fail the run");
    assert!(stderr.contains("cannot access"), "stderr: {}", stderr);
    assert!(
        row_paths(&stdout).contains(&"real".to_string()),
        "remaining roots are still walked: {}",
        stdout
    );
}

#[test]
fn test_repeated_argument_is_counted_once() {
    let tree = TempTree::new();
    tree.file("a/file", 64);

    // Two roots force hash-all mode; the second pass over the same
    // directory is deduplicated entirely.
    let (stdout, _stderr, success) = run_mu(tree.path(), &["a", "a"]);
    assert!(success);
    assert_eq!(row_paths(&stdout), vec!["a"]);
}

#[test]
fn test_threshold_filters_rows() {
    let tree = TempTree::new();
    tree.file("a/file", 64);

    // Nothing holds a terabyte of cache; all rows disappear.
    let (stdout, _stderr, success) = run_mu(tree.path(), &["-t", "1T"]);
    assert!(success);
    assert_eq!(row_paths(&stdout), Vec::<String>::new());

    // Everything fits under a terabyte; all rows stay.
    let (stdout, _stderr, success) = run_mu(tree.path(), &["-t=-1T"]);
    assert!(success);
    assert_eq!(row_paths(&stdout), vec!["./a", "."]);
}

#[test]
fn test_threshold_minus_zero_is_rejected() {
    let tree = TempTree::new();
    let (_stdout, stderr, success) = run_mu(tree.path(), &["-t=-0"]);
    assert!(!success);
    assert!(stderr.contains("-0"));
}

#[test]
fn test_time_column_appears_between_size_and_path() {
    let tree = TempTree::new();
    tree.file("a/file", 64);

    let (stdout, _stderr, success) = run_mu(tree.path(), &["--time", "--time-style=+%Y"]);
    assert!(success);
    for line in stdout.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 3, "size, time, path: {}", line);
        assert_eq!(fields[1].len(), 4, "a bare year: {}", line);
    }
}

#[test]
fn test_format_string_controls_row_layout() {
    let tree = TempTree::new();
    tree.file("a/file", 64);

    let (stdout, _stderr, success) = run_mu(tree.path(), &["-f", "%c %d", "-s"]);
    assert!(success);
    let line = stdout.lines().next().expect("one summary row");
    let size_part = line.split('\t').next().unwrap();
    assert_eq!(
        size_part.split(' ').count(),
        2,
        "two counters in the size column: {}",
        line
    );
}

#[test]
fn test_json_document_shape() {
    let tree = TempTree::new();
    tree.file("a/file", 64);

    let (stdout, _stderr, success) = run_mu(tree.path(), &["--json", "-c"]);
    assert!(success);

    let doc: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    let entries = doc["entries"].as_array().expect("entries array");
    assert!(!entries.is_empty());
    for entry in entries {
        assert!(entry["path"].is_string());
        assert!(entry["cached"].is_u64());
        assert!(entry["dirty"].is_u64());
    }
    assert!(doc["total"]["cached"].is_u64(), "total requested via -c");
}

#[test]
fn test_json_conflicts_with_format() {
    let tree = TempTree::new();
    let (_stdout, stderr, success) = run_mu(tree.path(), &["--json", "-f", "%c"]);
    assert!(!success);
    assert!(stderr.contains("cannot be used with"), "stderr: {}", stderr);
}

#[test]
fn test_files0_from_reads_nul_separated_roots() {
    let tree = TempTree::new();
    tree.file("one/file", 64);
    tree.file("two/file", 64);

    Command::cargo_bin("mu")
        .unwrap()
        .current_dir(tree.path())
        .arg("--files0-from=-")
        .write_stdin("one\0two\0")
        .assert()
        .success()
        .stdout(predicate::str::contains("one").and(predicate::str::contains("two")));
}

#[test]
fn test_files0_from_rejects_operands() {
    let tree = TempTree::new();
    let (_stdout, stderr, success) = run_mu(tree.path(), &["--files0-from=-", "extra"]);
    assert!(!success);
    assert!(stderr.contains("cannot be combined"));
}

#[test]
fn test_files0_from_diagnoses_empty_names() {
    let tree = TempTree::new();
    tree.file("one/file", 64);

    Command::cargo_bin("mu")
        .unwrap()
        .current_dir(tree.path())
        .arg("--files0-from=-")
        .write_stdin("one\0\0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid zero-length file name"));
}

#[cfg(unix)]
#[test]
fn test_unfollowed_symlinks_are_leaves() {
    let tree = TempTree::new();
    tree.file("real/file", 64);
    tree.link("alias", "real");

    let (stdout, _stderr, success) = run_mu(tree.path(), &["-a"]);
    assert!(success);
    let rows = row_paths(&stdout);
    assert!(rows.contains(&"./alias".to_string()), "rows: {:?}", rows);
    assert!(
        !rows.contains(&"./alias/file".to_string()),
        "must not descend through the link: {:?}",
        rows
    );
}

#[cfg(unix)]
#[test]
fn test_dereference_descends_through_symlinks() {
    let tree = TempTree::new();
    tree.file("real/file", 64);
    tree.link("alias", "real");

    let (stdout, _stderr, success) = run_mu(tree.path(), &["-a", "-L"]);
    assert!(success);
    let rows = row_paths(&stdout);
    assert!(
        rows.contains(&"./alias/file".to_string()) || rows.contains(&"./real/file".to_string()),
        "the target's contents are reached exactly once: {:?}",
        rows
    );
}

#[test]
fn test_human_readable_sizes_have_no_tab_inside() {
    let tree = TempTree::new();
    tree.file("a/file", 1 << 20);

    let (stdout, _stderr, success) = run_mu(tree.path(), &["-h", "-s"]);
    assert!(success);
    let line = stdout.lines().next().expect("one row");
    assert_eq!(line.split('\t').count(), 2, "size and path only: {}", line);
}

#[test]
fn test_version_flag() {
    Command::cargo_bin("mu")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mu"));
}
