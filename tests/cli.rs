use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use rotating_alarm::config::Config;
use tempfile::TempDir;

// a monday
const NOON: &str = "2024-01-01T12:00:00+00:00";

struct Env {
    dir: TempDir,
    config: PathBuf,
}

impl Env {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        Config {
            data_dir: Some(dir.path().join("data")),
            ..Config::default()
        }
        .save(&config)
        .unwrap();
        Self { dir, config }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self, args: &[&str]) -> Command {
        self.cmd_at(NOON, args)
    }

    fn cmd_at(&self, at: &str, args: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("rotating_alarm").unwrap();
        cmd.arg("--config").arg(&self.config).arg("--at").arg(at);
        cmd.args(args);
        cmd
    }
}

#[test]
fn add_list_and_next() {
    let env = Env::new();
    env.cmd(&["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No alarms set"));
    env.cmd(&["add", "6:30", "--label", "Run", "--days", "mon,wed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("added alarm_1704110400000"));

    env.cmd(&["list"]).assert().success().stdout(
        predicate::str::contains("6:30 AM")
            .and(predicate::str::contains("Run"))
            .and(predicate::str::contains("Mon, Wed"))
            .and(predicate::str::contains("1d 18h 30m")),
    );
    env.cmd(&["next"])
        .assert()
        .success()
        .stdout("Next alarm in 1d 18h 30m (Run, Wed 06:30)\n");
    assert!(env.root().join("data").join("alarmClockAlarms.json").exists());
}

#[test]
fn toggle_edit_and_remove() {
    let env = Env::new();
    env.cmd(&["add", "07:00"]).assert().success();
    let id = "alarm_1704110400000";
    env.cmd(&["toggle", id])
        .assert()
        .success()
        .stdout(format!("{id} disabled\n"));
    env.cmd(&["next"]).assert().success().stdout("No alarms set\n");
    env.cmd(&["edit", id, "--label", "Gym", "--days", "everyday"])
        .assert()
        .success();
    env.cmd(&["toggle", id]).assert().success();
    env.cmd(&["next"])
        .assert()
        .success()
        .stdout("Next alarm in 19h 0m (Gym, Tue 07:00)\n");
    env.cmd(&["remove", id])
        .assert()
        .success()
        .stdout(format!("removed {id} (Gym)\n"));
    env.cmd(&["remove", id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no alarm with id"));
}

#[test]
fn invalid_alarms_are_rejected() {
    let env = Env::new();
    env.cmd(&["add", "25:00"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid alarm time"));
    env.cmd(&["add", "07:00", "--volume", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside 0.0..=1.0"));
    env.cmd(&["add", "07:00", "--sound", "kazoo.mp3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown sound"));
    env.cmd(&["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No alarms set"));
}

#[test]
fn rotation_and_sounds() {
    let env = Env::new();
    env.cmd(&["rotation"])
        .assert()
        .success()
        .stdout("Today's sound: Gentle Chimes, changes in 12h\n");
    env.cmd(&["sounds"]).assert().success().stdout(
        predicate::str::contains("* Gentle Chimes (gentle-chimes.mp3, 0:08)")
            .and(predicate::str::contains("  Rooster Call")),
    );
    env.cmd(&["settings", "--rotation", "false"]).assert().success();
    env.cmd(&["rotation"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rotating alarms play Classic Beep"));
}

#[test]
fn settings_are_saved() {
    let env = Env::new();
    env.cmd(&["settings", "--toggle-theme", "--default-snooze", "9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("theme: dark").and(predicate::str::contains("default snooze: 9m")));
    env.cmd(&["settings"])
        .assert()
        .success()
        .stdout(predicate::str::contains("theme: dark"));
    env.cmd(&["settings", "--default-volume", "2"])
        .assert()
        .failure();
}

#[test]
fn in_memory_starts_with_samples_and_forgets() {
    let env = Env::new();
    env.cmd(&["--in-memory", "list"]).assert().success().stdout(
        predicate::str::contains("Work Alarm").and(predicate::str::contains("Weekend Wake-up")),
    );
    env.cmd(&["--in-memory", "remove", "alarm1"]).assert().success();
    env.cmd(&["--in-memory", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Work Alarm"));
    assert!(!env.root().join("data").exists());
}

#[test]
fn run_rings_due_alarm_until_quit() {
    let env = Env::new();
    env.cmd_at("2024-01-01T07:00:00+00:00", &["--in-memory", "run"])
        .write_stdin("quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Work Alarm is ringing"));
}

#[test]
fn init_keeps_existing_config() {
    let env = Env::new();
    env.cmd(&["init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
    let path = env.root().join("fresh.toml");
    Command::cargo_bin("rotating_alarm")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("init")
        .assert()
        .success();
    assert_eq!(Config::load(&path).unwrap(), Config::default());
}
