//! Argument parsing and end-to-end runs of the `ja-prep` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use clap::Parser;
use ja_cache::HashAlgorithm;
use ja_cli::cli::{Cli, Command as CliCommand, RecordTarget};
use ja_sas7bdat::{Column, Sas7bdatDataset, Value, write_sas7bdat};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ja-prep.toml"), "").unwrap();
        fs::create_dir(dir.path().join("extracts")).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn extract(&self, file: &str, rows: usize) {
        let mut dataset = Sas7bdatDataset::with_columns(
            "EXTRACT",
            vec![Column::numeric("ID"), Column::numeric("AGE")],
        );
        for i in 0..rows {
            dataset.add_row(vec![Value::Number(i as f64), Value::Number(40.0)]);
        }
        write_sas7bdat(&self.path("extracts").join(file), &dataset).unwrap();
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_ja-prep"))
            .arg("--config")
            .arg(self.path("ja-prep.toml"))
            .arg("--cache-dir")
            .arg(self.path("cache"))
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_parse_convert_args() {
    let cli = Cli::try_parse_from([
        "ja-prep",
        "convert",
        "--output",
        "out.sqlite3",
        "-t",
        "demographics=demo.sas7bdat",
        "--table",
        "pharma",
        "--chunk-size",
        "500",
        "--register",
        "--algorithm",
        "blake3",
    ])
    .unwrap();
    assert_eq!(cli.cache.algorithm, Some(HashAlgorithm::Blake3));
    let CliCommand::Convert(args) = cli.command else {
        panic!("expected convert");
    };
    assert_eq!(args.tables, vec!["demographics=demo.sas7bdat", "pharma"]);
    assert_eq!(args.chunk_size, Some(500));
    assert!(args.register);
}

#[test]
fn test_parse_record_and_tables() {
    let cli = Cli::try_parse_from(["ja-prep", "record", "slim"]).unwrap();
    assert!(matches!(cli.command, CliCommand::Record(ref a) if a.target == RecordTarget::Slim));

    let cli = Cli::try_parse_from([
        "ja-prep",
        "tables",
        "db.sqlite3",
        "--require",
        "demographics,pharma",
        "--standardize",
    ])
    .unwrap();
    let CliCommand::Tables(args) = cli.command else {
        panic!("expected tables");
    };
    assert_eq!(args.require, vec!["demographics", "pharma"]);
    assert!(args.standardize);

    assert!(Cli::try_parse_from(["ja-prep", "hash", "f", "--algorithm", "md5"]).is_err());
}

#[test]
fn test_convert_register_and_status() {
    let ws = Workspace::new();
    ws.extract("demographics.sas7bdat", 50);
    ws.extract("cohort_a.sas7bdat", 10);
    let output = ws.path("DATABASE.sqlite3");

    let result = ws.run(&[
        "convert",
        "--source-dir",
        path_arg(&ws.path("extracts")),
        "--output",
        path_arg(&output),
        "--table",
        "demographics",
        "--table",
        "cohort_a",
        "--register",
        "--no-progress",
    ]);
    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    assert!(stdout(&result).contains("demographics"));

    let conn = rusqlite::Connection::open(&output).unwrap();
    let tables = ja_store::list_tables(&conn).unwrap();
    assert_eq!(tables, vec!["demographics"]);

    // Fresh cache: nothing recorded, no slim database
    let status = ws.run(&["status", "--json"]);
    assert_eq!(status.status.code(), Some(3));
    let json: serde_json::Value = serde_json::from_str(&stdout(&status)).unwrap();
    assert_eq!(json["reason"], "slim database missing");
    assert_eq!(json["original"], path_arg(&output));

    fs::write(ws.path("DATABASE.jasqlite3"), b"slim").unwrap();
    assert!(ws.run(&["record", "original"]).status.success());
    assert!(ws.run(&["record", "slim"]).status.success());
    let status = ws.run(&["status", "--json"]);
    assert_eq!(status.status.code(), Some(0));
    let json: serde_json::Value = serde_json::from_str(&stdout(&status)).unwrap();
    assert_eq!(json["needs_reprocessing"], false);

    assert!(ws.run(&["invalidate"]).status.success());
    assert!(!ws.path("cache").exists());
    assert_eq!(ws.run(&["status", "--json"]).status.code(), Some(3));
}

#[test]
fn test_convert_missing_extract_fails() {
    let ws = Workspace::new();
    let result = ws.run(&[
        "convert",
        "--source-dir",
        path_arg(&ws.path("extracts")),
        "--output",
        path_arg(&ws.path("out.sqlite3")),
        "--table",
        "diagnoses",
        "--no-progress",
    ]);
    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("diagnoses.sas7bdat"), "{stderr}");
    assert!(!ws.path("out.sqlite3").exists());
}

#[test]
fn test_hash_prints_digest() {
    let ws = Workspace::new();
    let file = ws.path("hello.txt");
    fs::write(&file, b"Hello, World!").unwrap();
    let result = ws.run(&["hash", path_arg(&file)]);
    assert!(result.status.success());
    assert!(
        stdout(&result)
            .starts_with("dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f")
    );
}

#[test]
fn test_tables_require_and_standardize() {
    let ws = Workspace::new();
    let db = ws.path("db.sqlite3");
    let conn = rusqlite::Connection::open(&db).unwrap();
    conn.execute_batch("CREATE TABLE \"Physical Exams\" (ID REAL); CREATE TABLE pharma (ID REAL);")
        .unwrap();
    drop(conn);

    let missing = ws.run(&["tables", path_arg(&db), "--require", "physical_exams"]);
    assert_eq!(missing.status.code(), Some(1));

    let fixed = ws.run(&[
        "tables",
        path_arg(&db),
        "--require",
        "physical_exams,pharma",
        "--standardize",
    ]);
    assert!(fixed.status.success(), "{}", String::from_utf8_lossy(&fixed.stderr));
    assert!(stdout(&fixed).contains("Physical Exams -> physical_exams"));
}
