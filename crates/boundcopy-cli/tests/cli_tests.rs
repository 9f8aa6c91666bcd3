use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use boundcopy_testkit::sample_bytes;

const EXIT_SUCCESS: i32 = 0;
const EXIT_CLI: i32 = 2;
const EXIT_SHORT: i32 = 3;
const EXIT_IO: i32 = 4;

fn base_command() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_boundcopy-cli"));
    cmd.env_remove("BOUNDCOPY_BUFFER_SIZE");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run_cmd(args: &[&str], envs: &[(&str, &str)]) -> Output {
    let mut cmd = base_command();
    cmd.args(args);
    for (key, val) in envs {
        cmd.env(key, val);
    }
    cmd.output().expect("run boundcopy-cli")
}

fn run_with_stdin(args: &[&str], input: &[u8]) -> Output {
    let mut child = base_command()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn boundcopy-cli");

    let mut stdin = child.stdin.take().expect("stdin");
    let input = input.to_vec();
    let feeder = thread::spawn(move || {
        let _ = stdin.write_all(&input);
    });

    let output = child.wait_with_output().expect("wait boundcopy-cli");
    feeder.join().expect("join stdin feeder");
    output
}

fn temp_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    dir.push(format!(
        "boundcopy-cli-test-{}-{}-{}",
        label,
        std::process::id(),
        nanos
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

fn assert_exit(output: &Output, expected: i32) {
    assert_eq!(
        output.status.code(),
        Some(expected),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn assert_no_temp(dir: &Path) {
    for entry in fs::read_dir(dir).expect("read dir") {
        let name = entry.expect("dir entry").file_name();
        let name = name.to_string_lossy();
        assert!(
            !(name.starts_with('.') && name.ends_with(".tmp")),
            "unexpected temp file: {name}"
        );
    }
}

#[test]
fn cat_copies_whole_file() {
    let dir = temp_dir("cat");
    let input = dir.join("input.bin");
    let output = dir.join("output.bin");
    let data = sample_bytes(200_000);
    fs::write(&input, &data).expect("write input");

    let out = run_cmd(&["cat", path_str(&input), "-o", path_str(&output)], &[]);

    assert_exit(&out, EXIT_SUCCESS);
    assert_eq!(fs::read(&output).expect("read output"), data);
    assert_no_temp(&dir);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn range_copies_requested_slice() {
    let dir = temp_dir("range");
    let input = dir.join("input.bin");
    let output = dir.join("slice.bin");
    let data = sample_bytes(10_000);
    fs::write(&input, &data).expect("write input");

    let out = run_cmd(
        &[
            "range",
            path_str(&input),
            "--offset",
            "123",
            "--length",
            "4567",
            "--buffer-size",
            "64",
            "-o",
            path_str(&output),
        ],
        &[],
    );

    assert_exit(&out, EXIT_SUCCESS);
    assert_eq!(fs::read(&output).expect("read output"), &data[123..123 + 4567]);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn range_past_end_is_short() {
    let dir = temp_dir("short");
    let input = dir.join("input.bin");
    let output = dir.join("slice.bin");
    fs::write(&input, sample_bytes(100)).expect("write input");

    let out = run_cmd(
        &[
            "range",
            path_str(&input),
            "--offset",
            "90",
            "--length",
            "20",
            "-o",
            path_str(&output),
        ],
        &[],
    );

    assert_exit(&out, EXIT_SHORT);
    assert!(!output.exists());
    assert_no_temp(&dir);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn refuses_overwrite_without_force() {
    let dir = temp_dir("overwrite");
    let input = dir.join("input.bin");
    let output = dir.join("output.bin");
    fs::write(&input, b"fresh").expect("write input");
    fs::write(&output, b"existing").expect("write output");

    let out = run_cmd(&["cat", path_str(&input), "-o", path_str(&output)], &[]);
    assert_exit(&out, EXIT_CLI);
    assert_eq!(fs::read(&output).expect("read output"), b"existing");
    assert_no_temp(&dir);

    let out = run_cmd(
        &["cat", path_str(&input), "-o", path_str(&output), "--force"],
        &[],
    );
    assert_exit(&out, EXIT_SUCCESS);
    assert_eq!(fs::read(&output).expect("read output"), b"fresh");
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_input_is_io_error() {
    let dir = temp_dir("missing");
    let input = dir.join("absent.bin");

    let out = run_cmd(&["cat", path_str(&input)], &[]);

    assert_exit(&out, EXIT_IO);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn stdin_range_goes_to_stdout() {
    let data = sample_bytes(5_000);

    let out = run_with_stdin(&["range", "-", "--offset", "1000", "--length", "2500"], &data);

    assert_exit(&out, EXIT_SUCCESS);
    assert_eq!(out.stdout, &data[1000..3500]);
}

#[test]
fn stdin_cat_goes_to_stdout() {
    let data = sample_bytes(70_000);

    let out = run_with_stdin(&["cat", "-"], &data);

    assert_exit(&out, EXIT_SUCCESS);
    assert_eq!(out.stdout, data);
}

#[test]
fn buffer_size_from_environment_is_validated() {
    let dir = temp_dir("bufsize");
    let input = dir.join("input.bin");
    fs::write(&input, b"abc").expect("write input");

    let out = run_cmd(&["cat", path_str(&input)], &[("BOUNDCOPY_BUFFER_SIZE", "lots")]);
    assert_exit(&out, EXIT_CLI);

    let out = run_cmd(&["cat", path_str(&input), "--buffer-size", "0"], &[]);
    assert_exit(&out, EXIT_CLI);

    let out = run_cmd(&["cat", path_str(&input)], &[("BOUNDCOPY_BUFFER_SIZE", "2")]);
    assert_exit(&out, EXIT_SUCCESS);
    assert_eq!(out.stdout, b"abc");
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn input_named_like_a_temp_file_is_left_intact() {
    let dir = temp_dir("tmp-input");
    let input = dir.join("data.tmp");
    let output = dir.join("data.bin");
    let data = sample_bytes(3_000);
    fs::write(&input, &data).expect("write input");

    let out = run_cmd(&["cat", path_str(&input), "-o", path_str(&output)], &[]);

    assert_exit(&out, EXIT_SUCCESS);
    assert_eq!(fs::read(&output).expect("read output"), data);
    assert_eq!(fs::read(&input).expect("read input"), data);
    assert_no_temp(&dir);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn force_replaces_output_with_tmp_extension() {
    let dir = temp_dir("tmp-output");
    let input = dir.join("a.bin");
    let output = dir.join("b.tmp");
    fs::write(&input, b"fresh").expect("write input");
    fs::write(&output, b"existing").expect("write output");

    let out = run_cmd(
        &["cat", path_str(&input), "-o", path_str(&output), "--force"],
        &[],
    );

    assert_exit(&out, EXIT_SUCCESS);
    assert_eq!(fs::read(&output).expect("read output"), b"fresh");
    assert_no_temp(&dir);
    let _ = fs::remove_dir_all(&dir);
}
