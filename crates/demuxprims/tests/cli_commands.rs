#![cfg(all(unix, feature = "cli"))]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use demuxprims::protocols::ieee1344::{self, CommonFrameHeader, FrameType};
use demuxprims::protocols::pdcstream;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/demuxcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn capture(frames: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    for &soc in frames {
        let frame = ieee1344::encode_frame(CommonFrameHeader::new(FrameType::DATA, soc), b"phasors!")
            .expect("frame should encode");
        out.extend_from_slice(&frame);
    }
    out
}

fn demuxprims(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_demuxprims"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("demuxprims should run")
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line should be json"))
        .collect()
}

fn summary(lines: &[serde_json::Value]) -> &serde_json::Value {
    lines
        .iter()
        .find(|line| line["record"] == "summary")
        .expect("summary line should be printed")
}

#[test]
fn parse_clean_files_succeeds() {
    let dir = unique_temp_dir("parse-clean");
    let a = dir.join("a.bin");
    let b = dir.join("b.bin");
    std::fs::write(&a, capture(&[1, 2, 3])).expect("capture should be writable");
    std::fs::write(&b, capture(&[10, 20])).expect("capture should be writable");

    let output = demuxprims(&[
        "parse",
        a.to_str().unwrap(),
        b.to_str().unwrap(),
        "--chunk",
        "7",
    ]);

    assert_eq!(output.status.code(), Some(0));
    let lines = json_lines(&output);
    let summary = summary(&lines);
    assert_eq!(summary["frames"], 5);
    assert_eq!(summary["discarded"], 0);
    assert_eq!(summary["held_bytes"], 0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn parse_truncated_file_reports_held_bytes() {
    let dir = unique_temp_dir("parse-truncated");
    let path = dir.join("short.bin");
    let mut bytes = capture(&[1, 2]);
    bytes.truncate(bytes.len() - 5);
    std::fs::write(&path, bytes).expect("capture should be writable");

    let output = demuxprims(&["parse", path.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(60));
    let lines = json_lines(&output);
    assert!(lines.iter().any(|line| line["outcome"] == "reused"));
    assert_eq!(summary(&lines)["frames"], 1);
    assert!(summary(&lines)["held_bytes"].as_u64().unwrap() > 0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn parse_corrupt_frame_without_retries_discards() {
    let dir = unique_temp_dir("parse-corrupt");
    let path = dir.join("corrupt.bin");
    let mut bytes = capture(&[1]);
    bytes[9] ^= 0x01;
    std::fs::write(&path, bytes).expect("capture should be writable");

    let output = demuxprims(&["parse", path.to_str().unwrap(), "--reuse-limit", "0"]);

    assert_eq!(output.status.code(), Some(60));
    let lines = json_lines(&output);
    let discarded = lines
        .iter()
        .find(|line| line["outcome"] == "discarded")
        .expect("discard outcome should be printed");
    assert_eq!(discarded["identifier"], "data");
    assert_eq!(summary(&lines)["discarded"], 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn parse_reads_config_file() {
    let dir = unique_temp_dir("parse-config");
    let config = dir.join("parser.json");
    let path = dir.join("pdc.bin");
    std::fs::write(&config, r#"{"optimize_parsing": false, "max_batch_size": 1}"#)
        .expect("config should be writable");

    let options = pdcstream::ParsingOptions::default();
    let frame = pdcstream::encode_frame(pdcstream::CommonFrameHeader::new(0), b"cf", options)
        .expect("frame should encode");
    std::fs::write(&path, &frame).expect("capture should be writable");

    let output = demuxprims(&[
        "parse",
        path.to_str().unwrap(),
        "--protocol",
        "b",
        "--config",
        config.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(0));
    let lines = json_lines(&output);
    assert_eq!(lines[0]["frames"][0]["identifier"], "configuration");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn parse_rejects_invalid_config() {
    let dir = unique_temp_dir("parse-bad-config");
    let config = dir.join("parser.json");
    let path = dir.join("a.bin");
    std::fs::write(&config, r#"{"unparsed_data_reuse_limit": -3}"#)
        .expect("config should be writable");
    std::fs::write(&path, capture(&[1])).expect("capture should be writable");

    let output = demuxprims(&[
        "parse",
        path.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(64));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn header_decodes_example_preamble() {
    let output = demuxprims(&["header", "4B2F1C00 0005 000A"]);

    assert_eq!(output.status.code(), Some(0));
    let lines = json_lines(&output);
    assert_eq!(lines[0]["frame_type"], "data");
    assert_eq!(lines[0]["sample_count"], 5);
    assert_eq!(lines[0]["fragment"], "unfragmented");
}

#[test]
fn checksum_flags_bad_trailer() {
    let good = demuxprims(&["checksum", "31323334353637383929B1"]);
    assert_eq!(good.status.code(), Some(0));
    assert_eq!(json_lines(&good)[0]["valid"], true);

    let bad = demuxprims(&["checksum", "3132333435363738390000"]);
    assert_eq!(bad.status.code(), Some(60));
}

#[test]
fn stream_parses_stdin_until_eof() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_demuxprims"))
        .args([
            "--log-level",
            "error",
            "--format",
            "json",
            "stream",
            "--read-size",
            "5",
            "--interval-ms",
            "5",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("stream command should start");

    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(&capture(&[1, 2, 3, 4]))
        .expect("stdin should accept bytes");

    let output = child.wait_with_output().expect("stream should exit");
    assert_eq!(output.status.code(), Some(0));
    let lines = json_lines(&output);
    assert_eq!(summary(&lines)["frames"], 4);
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_demuxprims"))
        .arg("version")
        .output()
        .expect("version should run");
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn envinfo_reports_effective_config_and_frame_types() {
    let dir = unique_temp_dir("envinfo");
    let config = dir.join("parser.json");
    std::fs::write(&config, r#"{"unparsed_data_reuse_limit": 1, "optimize_parsing": false}"#)
        .expect("config should be writable");

    let output = Command::new(env!("CARGO_BIN_EXE_demuxprims"))
        .args(["--log-level", "error", "--format", "json", "envinfo", "-p", "b"])
        .arg("--config")
        .arg(&config)
        .env_remove("DEMUXPRIMS_CONFIG")
        .output()
        .expect("envinfo should run");

    assert_eq!(output.status.code(), Some(0));
    let lines = json_lines(&output);
    let info = &lines[0];
    assert_eq!(info["parser_config"]["unparsed_data_reuse_limit"], 1);
    assert_eq!(info["parser_config"]["optimize_parsing"], false);
    assert_eq!(info["protocols"][1]["name"], "pdcstream");
    assert_eq!(info["protocols"][1]["selected"], true);
    assert_eq!(
        info["protocols"][0]["frame_types"]
            .as_array()
            .expect("frame types should be an array")
            .len(),
        3
    );
}
