// Integration tests
//
// SPDX-License-Identifier: MIT
//
// This file is part of the dpregress package.
// It is licensed under the MIT License.
// For the full copyright and license information, please view the LICENSE
// file that was distributed with this source code.

use uutests::util::{AtPath, TestScenario};
use uutests::util_name;
use uutests::{at_and_ucmd, new_ucmd};

const REPORT: &str = "Legal: 3\n\nSum_Displacement: 12.0\n";

// Create a case whose script, run by sh, writes report into the case.
fn add_case(at: &AtPath, name: &str, report: &str, golden: &str) {
    at.mkdir(name);
    at.write(
        &format!("{name}/a.tcl"),
        &format!("printf '{}' > {name}/a.rpt\n", report.replace('\n', "\\n")),
    );
    at.write(&format!("{name}/a.rpt.ok"), golden);
}

// Test application's invocation
#[test]
fn test_invalid_arg() {
    new_ucmd!().arg("--definitely-invalid").fails().code_is(1);
}

#[test]
fn test_missing_command() {
    new_ucmd!().fails().code_is(1);
}

#[test]
fn test_unknown_mode() {
    new_ucmd!().args(&["run", "screen"]).fails().code_is(1);
}

#[test]
fn test_convert() {
    let (at, mut ucmd) = at_and_ucmd!();
    at.mkdir("simple-test-1");
    at.write(
        "simple-test-1/a.tcl",
        "opendp_external odp\nodp import_lef foo.lef\nodp import_def foo.def\nset exp out\nodp legalize_place\nodp check_legality\n",
    );
    at.write("simple-test-1/a.rpt.ok", REPORT);

    ucmd.arg("convert")
        .succeeds()
        .stdout_contains("or-simple-test-1/a.tcl");

    assert_eq!(
        at.read("simple-test-1/a.tcl"),
        "opendp_external odp\nodp import_lef foo.lef\nodp import_def foo.def\nset exp out\nodp legalize_place\nodp check_legality\n"
    );
    assert_eq!(
        at.read("or-simple-test-1/a.tcl"),
        "set odp [opendp_external]\nread_lef foo.lef\nread_def foo.def\nset exp or-simple-test-1\n\n$odp check_legality\n"
    );
    assert_eq!(at.read("or-simple-test-1/a.rpt.ok"), REPORT);
}

#[test]
fn test_convert_skips_unknown_dirs() {
    let (at, mut ucmd) = at_and_ucmd!();
    at.mkdir("scratch");
    at.write("scratch/a.tcl", "odp run\n");

    ucmd.arg("convert").succeeds().no_stdout();
    assert!(!at.dir_exists("or-scratch"));
}

#[cfg(unix)]
#[test]
fn test_run_passes() {
    let (at, mut ucmd) = at_and_ucmd!();
    add_case(&at, "simple-test-1", REPORT, REPORT);

    ucmd.args(&["run", "--tool", "sh"])
        .succeeds()
        .stdout_contains("Access simple-test-1:")
        .stdout_contains("CMD: sh simple-test-1/a.tcl")
        .stdout_contains("simple-test-1/a.rpt.ok passed!");
    assert!(at.file_exists("simple-test-1/a.tcl.log"));
}

#[cfg(unix)]
#[test]
fn test_run_displacement_within_factor() {
    let (at, mut ucmd) = at_and_ucmd!();
    add_case(
        &at,
        "fence-test-1",
        "Legal: 3\n\nSum_Displacement: 60\n",
        REPORT,
    );

    ucmd.args(&["run", "--tool", "sh"]).succeeds();
}

#[cfg(unix)]
#[test]
fn test_run_legality_mismatch() {
    let (at, mut ucmd) = at_and_ucmd!();
    add_case(
        &at,
        "simple-test-1",
        "Legal: 4\n\nSum_Displacement: 12.0\n",
        REPORT,
    );

    ucmd.args(&["run", "--tool", "sh"])
        .fails()
        .code_is(1)
        .stderr_contains("Legality is different! 3 4");
}

#[cfg(unix)]
#[test]
fn test_run_displacement_regression() {
    let (at, mut ucmd) = at_and_ucmd!();
    add_case(
        &at,
        "low-util-test-1",
        "Legal: 3\n\nSum_Displacement: 60.5\n",
        REPORT,
    );

    ucmd.args(&["run", "--tool", "sh"])
        .fails()
        .code_is(1)
        .stderr_contains("Sum_Displacement exceeds the 5x tolerance: 12 60.5");
}

#[cfg(unix)]
#[test]
fn test_run_stops_at_first_failure() {
    let (at, mut ucmd) = at_and_ucmd!();
    add_case(&at, "simple-test-1", "Legal: 4\n\nSum_Displacement: 1\n", REPORT);
    add_case(&at, "simple-test-2", REPORT, REPORT);

    ucmd.args(&["run", "--tool", "sh"]).fails().code_is(1);
    assert!(!at.file_exists("simple-test-2/a.rpt"));
}

#[cfg(unix)]
#[test]
fn test_run_keep_going() {
    let (at, mut ucmd) = at_and_ucmd!();
    add_case(&at, "simple-test-1", "Legal: 4\n\nSum_Displacement: 1\n", REPORT);
    add_case(&at, "simple-test-2", REPORT, REPORT);
    add_case(&at, "multi-height-test-1", "Legal: 3\n\nSum_Displacement: 99\n", REPORT);

    ucmd.args(&["run", "--tool", "sh", "--keep-going"])
        .fails()
        .code_is(1)
        .stdout_contains("simple-test-2/a.rpt.ok passed!")
        .stderr_contains("2 of 3 golden comparisons failed");
}

#[cfg(unix)]
#[test]
fn test_run_relative_tolerance() {
    let (at, mut ucmd) = at_and_ucmd!();
    add_case(
        &at,
        "simple-test-1",
        "Legal: 3\n\nSum_Displacement: 13.0\n",
        REPORT,
    );

    ucmd.args(&["run", "--tool", "sh", "--tolerance-kind", "relative"])
        .fails()
        .code_is(1)
        .stderr_contains("5% tolerance");
}

#[cfg(unix)]
#[test]
fn test_run_malformed_golden() {
    let (at, mut ucmd) = at_and_ucmd!();
    add_case(&at, "simple-test-1", REPORT, "Legal: 3\n");

    ucmd.args(&["run", "--tool", "sh"])
        .fails()
        .code_is(2)
        .stderr_contains("expected at least 3 lines");
}

#[cfg(unix)]
#[test]
fn test_run_unparsable_field() {
    let (at, mut ucmd) = at_and_ucmd!();
    add_case(
        &at,
        "simple-test-1",
        "Legal: yes\n\nSum_Displacement: 12\n",
        REPORT,
    );

    ucmd.args(&["run", "--tool", "sh"])
        .fails()
        .code_is(2)
        .stderr_contains("field `Legality'");
}

#[cfg(unix)]
#[test]
fn test_run_openroad_with_convert() {
    let (at, mut ucmd) = at_and_ucmd!();
    add_case(&at, "simple-test-1", REPORT, REPORT);
    at.write(
        "simple-test-1/a.tcl",
        &format!(
            "printf '{}' > or-simple-test-1/a.rpt\n",
            REPORT.replace('\n', "\\n")
        ),
    );

    ucmd.args(&["run", "openroad", "--convert", "--tool", "sh"])
        .succeeds()
        .stdout_contains("Access or-simple-test-1:")
        .stdout_contains("or-simple-test-1/a.rpt.ok passed!");
}

#[test]
fn test_run_missing_tool() {
    let (at, mut ucmd) = at_and_ucmd!();
    add_case(&at, "simple-test-1", REPORT, REPORT);

    ucmd.arg("run").fails().stderr_contains("opendp");
}

#[cfg(unix)]
#[test]
fn test_get_once() {
    let (at, mut ucmd) = at_and_ucmd!();
    at.mkdir_all("simple-test-1/exp");
    at.write("simple-test-1/exp/a.rpt", "Legal: 1\n\nSum_Displacement: 4\n");
    at.mkdir_all("notes/exp");
    at.write("notes/exp/b.rpt", "Legal: 9\n");

    ucmd.args(&["get", "--once"]).succeeds().stdout_is(
        "simple-test-1/exp/a.rpt:Legal: 1\n\
         simple-test-1/exp/a.rpt:\n\
         simple-test-1/exp/a.rpt:Sum_Displacement: 4\n",
    );
}
