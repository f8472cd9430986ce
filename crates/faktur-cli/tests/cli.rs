use assert_cmd::Command;
use predicates::prelude::*;

fn faktur() -> Command {
    let mut cmd = Command::cargo_bin("faktur").unwrap();
    cmd.env_remove("GEMINI_API_KEY");
    cmd
}

#[test]
fn help_lists_subcommands() {
    faktur()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("mapping"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn config_path_points_at_faktur_dir() {
    faktur()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.json"));
}

#[test]
fn extract_without_pdfs_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
    let pattern = dir.path().join("*").display().to_string();

    faktur()
        .args(["extract", &pattern])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching PDF files"));
}

#[test]
fn extract_without_api_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.pdf"), "%PDF-1.4").unwrap();
    let pattern = dir.path().join("*.pdf").display().to_string();

    faktur()
        .current_dir(dir.path())
        .args(["extract", &pattern])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}
