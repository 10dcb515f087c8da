use std::fs;

use assert_cmd::Command;

fn catalog() -> Command {
    let mut cmd = Command::cargo_bin("catalog").unwrap();
    cmd.env_remove("CATALOG_ENV").env("RUST_LOG", "error");
    cmd
}

fn scratch(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("catalog-cli-{name}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn check_config_prints_layered_values() {
    let dir = scratch("config");
    fs::write(dir.join("base.toml"), "[server]\nport = 4321\n").unwrap();

    let output = catalog()
        .args(["check-config", "--config-dir"])
        .arg(&dir)
        .output()
        .unwrap();
    fs::remove_dir_all(&dir).unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("server: 0.0.0.0:4321"), "{stdout}");
    assert!(stdout.contains("seed_path: (none)"), "{stdout}");
}

#[test]
fn check_seed_accepts_a_consistent_fixture() {
    let dir = scratch("seed-ok");
    let seed = dir.join("seed.json");
    fs::write(
        &seed,
        r#"{"authors": [{"id": "a1", "first_name": "John", "last_name": "Keats"}], "genres": [{"id": "g1", "name": "Poetry"}], "books": [{"id": "b1", "title": "Odes", "author": "a1", "summary": "s", "isbn": "i", "genre": ["g1"]}]}"#,
    )
    .unwrap();

    catalog()
        .args(["check-seed"])
        .arg(&seed)
        .args(["--config-dir"])
        .arg(&dir)
        .assert()
        .success();
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn check_seed_rejects_a_book_with_a_missing_author() {
    let dir = scratch("seed-dangling");
    let seed = dir.join("seed.json");
    fs::write(
        &seed,
        r#"{"genres": [{"id": "g1", "name": "Poetry"}], "books": [{"id": "b1", "title": "Odes", "author": "a1", "summary": "s", "isbn": "i", "genre": ["g1"]}]}"#,
    )
    .unwrap();

    let output = catalog()
        .args(["check-seed"])
        .arg(&seed)
        .args(["--config-dir"])
        .arg(&dir)
        .output()
        .unwrap();
    fs::remove_dir_all(&dir).unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("book b1 has author -> missing author a1"), "{stderr}");
}

#[test]
fn check_seed_rejects_duplicate_genres() {
    let dir = scratch("seed-dupes");
    let seed = dir.join("seed.json");
    fs::write(&seed, r#"{"genres": [{"name": "Poetry"}, {"name": "Poetry"}]}"#).unwrap();

    catalog()
        .args(["check-seed"])
        .arg(&seed)
        .args(["--config-dir"])
        .arg(&dir)
        .assert()
        .failure();
    fs::remove_dir_all(&dir).unwrap();
}
