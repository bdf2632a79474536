//! End-to-end CLI tests: invoke the built binary against small VLP
//! fixtures and check its stdout and exit code.

use std::io::Write;
use std::process::Command;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_inner-molp"))
}

fn write_vlp(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

const UNIT_SQUARE: &str = "\
p vlp min 0 2 0 2 2
j 1 d 0 1
j 2 d 0 1
o 1 1 1
o 2 2 1
e
";

#[test]
fn solves_unit_square_and_reports_vertices() {
    let dir = tempfile::tempdir().unwrap();
    let vlp = write_vlp(&dir, "square.vlp", UNIT_SQUARE);
    let output = bin().arg(&vlp).output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|l| l.starts_with('V')));
    assert!(stdout.lines().filter(|l| l.starts_with('V')).count() >= 1);
}

#[test]
fn short_help_exits_zero_without_a_vlp_file() {
    let output = bin().arg("-h").output().unwrap();
    assert!(output.status.success());
    assert!(!output.stdout.is_empty());
}

#[test]
fn version_flag_prints_the_crate_version() {
    let output = bin().arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("inner-molp"));
}

#[test]
fn dump_config_prints_a_loadable_config_file() {
    let output = bin().arg("--dump").output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("PolytopeEps"));
}

#[test]
fn missing_input_file_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.vlp");
    let output = bin().arg(&missing).output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn malformed_vlp_is_reported_and_nonzero_exit() {
    let dir = tempfile::tempdir().unwrap();
    let vlp = write_vlp(&dir, "bad.vlp", "p vlp min 0 1 0 1 1\no 1 1 1\n");
    let output = bin().arg(&vlp).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).len() > 0);
}

#[test]
fn save_vertices_flag_writes_a_separate_file() {
    let dir = tempfile::tempdir().unwrap();
    let vlp = write_vlp(&dir, "square.vlp", UNIT_SQUARE);
    let out = dir.path().join("verts.out");
    let status = bin().arg("-ov").arg(&out).arg(&vlp).status().unwrap();
    assert!(status.success());
    let contents = std::fs::read_to_string(&out).unwrap();
    assert!(contents.lines().all(|l| l.starts_with('V')));
    assert!(!contents.is_empty());
}

#[test]
fn config_file_overrides_are_honored() {
    let dir = tempfile::tempdir().unwrap();
    let vlp = write_vlp(&dir, "square.vlp", UNIT_SQUARE);
    let cfg = write_vlp(&dir, "quiet.cfg", "Verbosity = 0\nPrintFacets = 0\n");
    let output = bin().arg("-c").arg(&cfg).arg(&vlp).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.lines().any(|l| l.starts_with('F')));
}
