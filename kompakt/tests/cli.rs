use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn kompakt() -> Command {
    let mut cmd = Command::cargo_bin("kompakt").unwrap();
    cmd.env_remove("KOMPAKT_THREADS").env_remove("KOMPAKT_LOG");
    cmd
}

fn write_sample_tree(root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(root.join("nested"))?;
    fs::write(root.join("file1.txt"), b"Hello, this is the first file.\n")?;
    fs::write(root.join("empty.bin"), b"")?;
    fs::write(root.join("nested").join("data.dat"), [0u8, 1, 2, 3, 4, 5, 5, 5, 5])?;
    Ok(())
}

#[test]
fn test_cli_directory_cycle() -> Result<(), Box<dyn std::error::Error>> {
    for algo in ["huffman", "lzw"] {
        let source_dir = tempdir()?;
        write_sample_tree(source_dir.path())?;

        let work_dir = tempdir()?;
        let archive_path = work_dir.path().join("tree.arc");
        let restore_dir = work_dir.path().join("restored");

        kompakt()
            .args(["compress", "--algo", algo, "-t", "2", "-i"])
            .arg(source_dir.path())
            .arg("-o")
            .arg(&archive_path)
            .assert()
            .success()
            .stdout(predicate::str::contains("archive").and(predicate::str::contains("3 entries")));

        kompakt()
            .arg("list")
            .arg(&archive_path)
            .assert()
            .success()
            .stdout(
                predicate::str::contains("file1.txt")
                    .and(predicate::str::contains("empty.bin"))
                    .and(predicate::str::contains("nested/data.dat")),
            );

        kompakt()
            .args(["decompress", "--algo", algo, "-i"])
            .arg(&archive_path)
            .arg("-o")
            .arg(&restore_dir)
            .assert()
            .success();

        assert_eq!(
            fs::read(restore_dir.join("file1.txt"))?,
            b"Hello, this is the first file.\n"
        );
        assert!(fs::read(restore_dir.join("empty.bin"))?.is_empty());
        assert_eq!(
            fs::read(restore_dir.join("nested").join("data.dat"))?,
            [0u8, 1, 2, 3, 4, 5, 5, 5, 5]
        );
    }
    Ok(())
}

#[test]
fn test_cli_single_file_cycle() -> Result<(), Box<dyn std::error::Error>> {
    let work_dir = tempdir()?;
    let input = work_dir.path().join("input.txt");
    let packed = work_dir.path().join("input.glzw");
    let output = work_dir.path().join("output.txt");
    fs::write(&input, b"ABABABA")?;

    kompakt()
        .args(["compress", "--algo", "LZW", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&packed)
        .assert()
        .success();
    assert_eq!(&fs::read(&packed)?[0..4], b"GLZW");

    kompakt()
        .args(["decompress", "--algo", "lzw", "-i"])
        .arg(&packed)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("7 bytes"));
    assert_eq!(fs::read(&output)?, b"ABABABA");
    Ok(())
}

#[test]
fn test_cli_json_output() -> Result<(), Box<dyn std::error::Error>> {
    let work_dir = tempdir()?;
    let input = work_dir.path().join("input.txt");
    let packed = work_dir.path().join("input.ghuf");
    fs::write(&input, b"AAAA")?;

    let assert = kompakt()
        .args(["--json", "compress", "--algo", "huffman", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&packed)
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    let value: serde_json::Value = serde_json::from_str(&stdout)?;
    assert_eq!(value["success"], true);
    assert_eq!(value["result_code"], 0);
    assert_eq!(value["mode"], "file");
    assert_eq!(value["algorithm"], "huffman");
    assert_eq!(value["bytes_in"], 4);
    Ok(())
}

#[test]
fn test_cli_wrong_codec_fails() -> Result<(), Box<dyn std::error::Error>> {
    let work_dir = tempdir()?;
    let input = work_dir.path().join("input.txt");
    let packed = work_dir.path().join("input.glzw");
    fs::write(&input, b"some content")?;

    kompakt()
        .args(["compress", "--algo", "lzw", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&packed)
        .assert()
        .success();

    kompakt()
        .args(["decompress", "--algo", "huffman", "-i"])
        .arg(&packed)
        .arg("-o")
        .arg(work_dir.path().join("out.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Format error"));
    Ok(())
}

#[test]
fn test_cli_missing_input() -> Result<(), Box<dyn std::error::Error>> {
    let work_dir = tempdir()?;

    kompakt()
        .args(["--json", "compress", "--algo", "huffman", "-i"])
        .arg(work_dir.path().join("missing.txt"))
        .arg("-o")
        .arg(work_dir.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"success\": false").and(predicate::str::contains("does not exist")));
    Ok(())
}

#[test]
fn test_cli_unknown_algorithm() -> Result<(), Box<dyn std::error::Error>> {
    let work_dir = tempdir()?;
    let input = work_dir.path().join("input.txt");
    fs::write(&input, b"x")?;

    kompakt()
        .args(["compress", "--algo", "deflate", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(work_dir.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported algorithm"));
    Ok(())
}

#[test]
fn test_cli_invalid_thread_env() -> Result<(), Box<dyn std::error::Error>> {
    let work_dir = tempdir()?;
    let input = work_dir.path().join("input.txt");
    fs::write(&input, b"x")?;

    kompakt()
        .env("KOMPAKT_THREADS", "many")
        .args(["compress", "--algo", "lzw", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(work_dir.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("KOMPAKT_THREADS"));
    Ok(())
}

#[test]
fn test_cli_scan() -> Result<(), Box<dyn std::error::Error>> {
    let source_dir = tempdir()?;
    write_sample_tree(source_dir.path())?;

    kompakt()
        .arg("scan")
        .arg(source_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("file1.txt").and(predicate::str::contains("data.dat")));

    kompakt()
        .args(["scan", "--flat", "--dirs"])
        .arg(source_dir.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("nested")
                .and(predicate::str::contains("d "))
                .and(predicate::str::contains("data.dat").not()),
        );
    Ok(())
}
