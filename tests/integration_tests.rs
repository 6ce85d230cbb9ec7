use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

fn sml() -> Command {
    let mut cmd = Command::cargo_bin("sml").unwrap();
    for var in ["SML_REGISTERS", "SML_STRICT_MEMORY", "SML_STEP_LIMIT"] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn runs_without_arguments() {
    sml().assert().success().stdout(contains("Simple Machine Language"));
}

#[test]
fn runs_counting_loop() {
    sml()
        .arg("run")
        .arg("tests/files/count.sml")
        .arg("--minimal")
        .assert()
        .success()
        .stdout("1\n2\n3\n");
}

#[test]
fn reports_final_registers() {
    sml()
        .arg("tests/files/count.sml")
        .assert()
        .success()
        .stdout(contains("Halted"))
        .stdout(contains("after 14 steps"))
        .stdout(contains("r0 "));
}

#[test]
fn runs_off_the_end_without_halt() {
    sml()
        .args(["run", "tests/files/factorial.sml", "--minimal"])
        .assert()
        .success()
        .stdout("720\n");
}

#[test]
fn division_by_zero_faults() {
    sml()
        .args(["run", "tests/files/divzero.sml"])
        .assert()
        .failure()
        .stdout(contains("Faulted"))
        .stderr(contains("division by zero"))
        .stderr(contains("div r0 r0 r1"));
}

#[test]
fn duplicate_label_fails_at_load() {
    sml()
        .args(["run", "tests/files/duplicate.sml"])
        .assert()
        .failure()
        .stdout(contains("Running").not())
        .stderr(contains("Duplicate prefix label"));
}

#[test]
fn unknown_label_faults_when_jumped_to() {
    sml()
        .args(["run", "tests/files/unknown_label.sml", "--minimal"])
        .assert()
        .failure()
        .stderr(contains("elsewhere"));
}

#[test]
fn check_warns_about_undefined_labels() {
    sml()
        .args(["check", "tests/files/unknown_label.sml"])
        .assert()
        .success()
        .stdout(contains("undefined label `nowhere`"))
        .stdout(contains("undefined label `elsewhere`"));

    sml()
        .args(["check", "tests/files/count.sml"])
        .assert()
        .success()
        .stdout(contains("no errors found!"));
}

#[test]
fn memory_defaults_to_zero() {
    sml()
        .args(["run", "tests/files/memory.sml", "--minimal"])
        .assert()
        .success()
        .stdout("42\n0\n");
}

#[test]
fn strict_memory_faults_on_unwritten_read() {
    sml()
        .args(["run", "tests/files/memory.sml", "--minimal", "--strict-memory"])
        .assert()
        .failure()
        .stdout("42\n")
        .stderr(contains("address 500"));

    sml()
        .args(["run", "tests/files/memory.sml", "--minimal"])
        .env("SML_STRICT_MEMORY", "1")
        .assert()
        .failure();
}

#[test]
fn step_limit_stops_infinite_loop() {
    sml()
        .args(["run", "tests/files/spin.sml", "--minimal", "--step-limit", "1000"])
        .assert()
        .failure()
        .stderr(contains("step limit of 1000 exceeded"));

    sml()
        .args(["run", "tests/files/spin.sml", "--minimal"])
        .env("SML_STEP_LIMIT", "10")
        .assert()
        .failure()
        .stderr(contains("step limit of 10 exceeded"));
}

#[test]
fn too_few_registers_faults() {
    sml()
        .args(["run", "tests/files/factorial.sml", "--registers", "8"])
        .assert()
        .failure()
        .stderr(contains("register r20 does not exist"));
}

#[test]
fn wide_register_file() {
    sml()
        .args(["run", "tests/files/wide.sml", "--minimal", "--registers", "300"])
        .assert()
        .success()
        .stdout("7\n");

    sml()
        .args(["run", "tests/files/wide.sml", "--minimal"])
        .assert()
        .failure()
        .stderr(contains("register r299 does not exist"));
}

#[test]
fn register_count_is_bounded() {
    sml()
        .args(["run", "tests/files/count.sml", "--minimal"])
        .args(["--registers", "99999999999999999"])
        .assert()
        .failure()
        .stderr(contains("at most 65536 are supported"));

    sml()
        .args(["run", "tests/files/count.sml", "--minimal"])
        .env("SML_REGISTERS", "99999999999999999")
        .assert()
        .success()
        .stdout("1\n2\n3\n");
}

#[test]
fn oversized_register_id_is_a_load_error() {
    sml()
        .arg("check")
        .arg("tests/files/bad_register.sml")
        .assert()
        .failure()
        .stderr(contains("Encountered an invalid register"));
}

#[test]
fn lists_assembled_program() {
    sml()
        .args(["list", "tests/files/factorial.sml"])
        .assert()
        .success()
        .stdout(contains("f5:      jnz r20 f3"))
        .stdout(contains("mov r20 6"));
}
