//! CLI smoke tests: dry-run end to end, determinism across processes.

use std::process::Command;

use tempfile::tempdir;

#[derive(Debug, serde::Deserialize)]
struct OutputRow {
    key: String,
    value: String,
    rank: usize,
    exposure: u32,
}

fn run_dry(input: &str, extra: &[&str]) -> Vec<OutputRow> {
    let dir = tempdir().unwrap();
    let input_path = dir.path().join("input.txt");
    std::fs::write(&input_path, input).unwrap();
    let out_path = dir.path().join("out.json");

    let status = Command::new(env!("CARGO_BIN_EXE_ordinal"))
        .arg("--file")
        .arg(&input_path)
        .arg("--output")
        .arg(&out_path)
        .args(["--prompt", "rank these", "--dry-run", "--seed", "7"])
        .args(extra)
        .status()
        .unwrap();
    assert!(status.success());

    let raw = std::fs::read_to_string(&out_path).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn dry_run_writes_ranked_output() {
    let rows = run_dry(
        "apple\nbanana\ncherry\n",
        &["--max-trials", "2", "--no-converge", "--ratio", "0"],
    );
    assert_eq!(rows.len(), 3);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.rank, i + 1);
        assert_eq!(row.exposure, 2);
        assert_eq!(row.key.len(), 8);
        assert!(!row.value.is_empty());
    }
}

#[test]
fn dry_run_is_deterministic_across_processes() {
    let args = ["--max-trials", "3", "--no-converge", "--ratio", "0"];
    let a = run_dry("one\ntwo\nthree\nfour\nfive\n", &args);
    let b = run_dry("one\ntwo\nthree\nfour\nfive\n", &args);

    let keys = |rows: &[OutputRow]| -> Vec<String> { rows.iter().map(|r| r.key.clone()).collect() };
    assert_eq!(keys(&a), keys(&b));
}

#[test]
fn trace_file_gets_one_event_per_trial() {
    let dir = tempdir().unwrap();
    let input_path = dir.path().join("input.txt");
    std::fs::write(&input_path, "alpha\nbeta\ngamma\ndelta\n").unwrap();
    let trace_path = dir.path().join("trace.jsonl");
    let out_path = dir.path().join("out.json");

    let status = Command::new(env!("CARGO_BIN_EXE_ordinal"))
        .arg("--file")
        .arg(&input_path)
        .arg("--trace")
        .arg(&trace_path)
        .arg("--output")
        .arg(&out_path)
        .args([
            "--prompt",
            "rank these",
            "--dry-run",
            "--seed",
            "7",
            "--max-trials",
            "2",
            "--no-converge",
            "--ratio",
            "0",
        ])
        .status()
        .unwrap();
    assert!(status.success());

    let raw = std::fs::read_to_string(&trace_path).unwrap();
    let events: Vec<serde_json::Value> = raw
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e["kind"] == "trial"));
}
