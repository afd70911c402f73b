use std::{
    env, fs,
    io::Write,
    path::PathBuf,
    process::{Command, Output, Stdio},
};

const CONFIG: &str = r#"
[contest]
matches_per_game = 2
game_threads = 2
match_threads = 2
seed = 1234

[[boards]]
name = "facing"
first = { x = 3, y = 10 }
second = { x = 26, y = 10 }

[[boards]]
name = "corners"
first = { x = 1, y = 1 }
second = { x = 28, y = 18 }

[[ais]]
name = "flood"
[ais.strategy]
kind = "genetic"
gene_len = 16
population = 16
generations = 4
crossover_rate = 0.9
mutation_rate = 0.2
elitism = true
fitness = "flood_fill_weighted"

[[ais]]
name = "fibonacci"
[ais.strategy]
kind = "genetic"
gene_len = 16
population = 16
generations = 4
crossover_rate = 0.8
mutation_rate = 0.1
fitness = "fibonacci_weighted"

[[ais]]
name = "nearest"
strategy = { kind = "nearest" }

[[ais]]
name = "random"
strategy = { kind = "random" }
"#;

fn run_bin(args: &[&str], stdin: Option<&str>) -> Output {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_lightcycle"));

    let mut child = Command::new(bin)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn command");

    {
        let mut child_stdin = child.stdin.take().expect("failed to open stdin");
        if let Some(input) = stdin {
            child_stdin
                .write_all(input.as_bytes())
                .expect("failed to write stdin");
        }
    }

    let output = child.wait_with_output().expect("failed to execute command");

    let stdout_str =
        std::str::from_utf8(&output.stdout).expect("failed to convert stdout to string");
    let stderr_str =
        std::str::from_utf8(&output.stderr).expect("failed to convert stderr to string");

    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );
    output
}

fn test_dir(name: &str) -> PathBuf {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");
    fs::write(test_dir.join("config.toml"), CONFIG).expect("failed to write config file");
    test_dir
}

#[test]
fn contest_workflow() {
    let test_dir = test_dir("contest_workflow");
    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    let output = run_bin(&["--contest-dir", test_dir_str, "run"], None);
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["flood", "fibonacci", "nearest", "random"] {
        assert!(stdout.contains(name), "missing {name} in:\n{stdout}");
    }
    assert!(test_dir.join("result-0000.msgpack").is_file());

    run_bin(&["--contest-dir", test_dir_str, "run"], None);
    assert!(test_dir.join("result-0001.msgpack").is_file());

    let output = run_bin(&["--contest-dir", test_dir_str, "report"], None);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("contest seed 1234").count(), 2);

    run_bin(&["--contest-dir", test_dir_str, "clean"], None);
    assert!(!test_dir.join("result-0000.msgpack").exists());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn play_answers_every_round() {
    let test_dir = test_dir("play_answers_every_round");
    let test_dir_str = test_dir
        .to_str()
        .expect("failed to convert test directory to string");

    let input = "2 0\n29 10 29 10\n5 5 5 5\n2 0\n29 10 29 11\n5 5 5 6\n";
    let output = run_bin(
        &["--contest-dir", test_dir_str, "play", "--ai", "flood"],
        Some(input),
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let actions: Vec<_> = stdout.lines().collect();
    assert_eq!(actions.len(), 2);
    assert!(
        actions
            .iter()
            .all(|action| ["UP", "DOWN", "LEFT", "RIGHT"].contains(action))
    );
    assert_ne!(actions[0], "RIGHT");

    fs::remove_dir_all(&test_dir).ok();
}
