// Program entry point and CLI processing
//
// SPDX-License-Identifier: MIT
//
// This file is part of the dpregress package.
// It is licensed under the MIT License.
// For the full copyright and license information, please view the LICENSE
// file that was distributed with this source code.

pub mod case;
pub mod derived;
pub mod error_handling;
pub mod executor;
pub mod golden;
pub mod harness;
pub mod registry;
pub mod rewrite;
pub mod watch;

use crate::case::{FailurePolicy, HarnessContext, RunMode};
use crate::error_handling::comparison_failed;
use crate::golden::DisplacementTolerance;
use crate::harness::{RunSummary, convert_all, run_all};
use crate::watch::{DEFAULT_INTERVAL, watch};
use clap::{Arg, ArgMatches, Command, arg};
use std::path::PathBuf;
use std::time::Duration;
use uucore::error::{UResult, UUsageError};
use uucore::format_usage;

const ABOUT: &str = "Regression harness for the detailed placement tool";
const USAGE: &str = "dpregress [--root DIR] <run|convert|get> [OPTION]...";

const DEFAULT_FACTOR: f64 = 5.0;
const DEFAULT_RELATIVE: f64 = 0.05;

#[uucore::main]
pub fn uumain(args: impl uucore::Args) -> UResult<()> {
    let matches = uu_app().try_get_matches_from(args)?;

    match matches.subcommand() {
        Some(("run", sub)) => {
            let ctx = build_context(sub)?;
            finish(&run_all(&ctx)?)
        }
        Some(("convert", sub)) => {
            convert_all(&root_dir(sub))?;
            Ok(())
        }
        Some(("get", sub)) => {
            let interval = sub
                .get_one::<u64>("interval")
                .copied()
                .unwrap_or(DEFAULT_INTERVAL);
            watch(
                &root_dir(sub),
                Duration::from_secs(interval),
                sub.get_flag("once"),
            )
        }
        _ => Err(UUsageError::new(1, "missing command")),
    }
}

pub fn uu_app() -> Command {
    Command::new(uucore::util_name())
        .about(ABOUT)
        .override_usage(format_usage(USAGE))
        .infer_long_args(true)
        .subcommand_required(true)
        .arg(
            // Access with .get_one::<PathBuf>("root")
            Arg::new("root")
                .long("root")
                .value_name("DIR")
                .help("Directory holding the test cases and the tool binaries.")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value(".")
                .global(true),
        )
        .subcommand(
            Command::new("run")
                .about("Run the test groups of a mode and compare reports with their goldens")
                .args([
                    Arg::new("mode")
                        .help("Tool and test groups to run.")
                        .value_parser(["opendp", "openroad"])
                        .default_value("opendp"),
                    arg!(--tool <PATH> "Tool binary to run instead of the mode's default.")
                        .value_parser(clap::value_parser!(PathBuf)),
                    arg!(--"keep-going" "Report every failed comparison instead of stopping at the first."),
                    // Access with .get_one::<f64>("tolerance")
                    arg!(--tolerance <N> "Allowed regression of the displacement sum.")
                        .value_parser(clap::value_parser!(f64)),
                    Arg::new("tolerance-kind")
                        .long("tolerance-kind")
                        .help("Interpret the tolerance as a multiplicative factor or a relative difference.")
                        .value_parser(["factor", "relative"])
                        .default_value("factor"),
                    arg!(--valgrind "Run the tool under valgrind, logging to <script>_mem_check.log."),
                    arg!(--convert "Refresh the converted copies before an openroad run."),
                ]),
        )
        .subcommand(
            Command::new("convert")
                .about("Create or refresh the or- copies of the test cases and rewrite their scripts"),
        )
        .subcommand(
            Command::new("get")
                .about("Show the experiment reports of all test cases")
                .args([
                    arg!(--interval <SECS> "Seconds between refreshes.")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("3"),
                    arg!(--once "Print the reports once and exit."),
                ]),
        )
}

fn root_dir(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<PathBuf>("root")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."))
}

// Parse the run subcommand's arguments into a HarnessContext.
fn build_context(matches: &ArgMatches) -> UResult<HarnessContext> {
    let mode = match matches.get_one::<String>("mode").map(String::as_str) {
        Some("openroad") => RunMode::Openroad,
        _ => RunMode::Opendp,
    };

    let relative = matches
        .get_one::<String>("tolerance-kind")
        .is_some_and(|kind| kind == "relative");
    let threshold = matches.get_one::<f64>("tolerance").copied();
    if let Some(value) = threshold {
        if !value.is_finite() || value < 0.0 {
            return Err(UUsageError::new(
                1,
                format!("invalid tolerance {value}: must be a non-negative number"),
            ));
        }
    }
    let tolerance = if relative {
        DisplacementTolerance::Relative(threshold.unwrap_or(DEFAULT_RELATIVE))
    } else {
        DisplacementTolerance::Factor(threshold.unwrap_or(DEFAULT_FACTOR))
    };

    Ok(HarnessContext {
        root: root_dir(matches),
        mode,
        tool: matches.get_one::<PathBuf>("tool").cloned(),
        tolerance,
        failure_policy: if matches.get_flag("keep-going") {
            FailurePolicy::Collect
        } else {
            FailurePolicy::HaltOnFirst
        },
        valgrind: matches.get_flag("valgrind"),
        convert_first: matches.get_flag("convert"),
    })
}

// Turn the verdicts of a run into the process result.
fn finish(summary: &RunSummary) -> UResult<()> {
    if summary.passed() {
        return Ok(());
    }
    let failed: Vec<_> = summary.failures().collect();
    match failed.as_slice() {
        [only] if summary.halted => Err(comparison_failed(only)),
        _ => Err(comparison_failed(format!(
            "{} of {} golden comparisons failed",
            failed.len(),
            summary.outcomes.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::golden::{ComparisonOutcome, ReportField};
    use crate::harness::CaseOutcome;
    use pretty_assertions::assert_eq;

    fn run_matches(args: &[&str]) -> ArgMatches {
        let matches = uu_app()
            .get_matches_from(["dpregress", "run"].into_iter().chain(args.iter().copied()));
        matches.subcommand_matches("run").unwrap().clone()
    }

    fn outcome(case: &str, pass: bool) -> CaseOutcome {
        CaseOutcome {
            case: case.to_string(),
            golden: PathBuf::from(format!("{case}/a.rpt.ok")),
            outcome: if pass {
                ComparisonOutcome::Pass
            } else {
                ComparisonOutcome::Fail {
                    field: ReportField::SumDisplacement,
                    golden: 10.0,
                    candidate: 60.0,
                    tolerance: Some(DisplacementTolerance::default()),
                }
            },
        }
    }

    #[test]
    fn test_defaults() {
        let ctx = build_context(&run_matches(&[])).unwrap();
        assert_eq!(ctx, HarnessContext::default());
        assert_eq!(ctx.tool(), PathBuf::from("./opendp"));
    }

    #[test]
    fn test_all_flags() {
        let ctx = build_context(&run_matches(&[
            "openroad",
            "--root",
            "tests",
            "--tool",
            "/opt/openroad",
            "--keep-going",
            "--valgrind",
            "--convert",
        ]))
        .unwrap();

        assert_eq!(ctx.mode, RunMode::Openroad);
        assert_eq!(ctx.root, PathBuf::from("tests"));
        assert_eq!(ctx.tool(), PathBuf::from("/opt/openroad"));
        assert_eq!(ctx.failure_policy, FailurePolicy::Collect);
        assert!(ctx.valgrind);
        assert!(ctx.convert_first);
    }

    #[test]
    fn test_root_before_subcommand() {
        let matches = uu_app().get_matches_from(["dpregress", "--root", "tests", "run"]);
        let ctx = build_context(matches.subcommand_matches("run").unwrap()).unwrap();
        assert_eq!(ctx.root, PathBuf::from("tests"));
    }

    #[test]
    fn test_tolerance() {
        let ctx = build_context(&run_matches(&["--tolerance", "2.5"])).unwrap();
        assert_eq!(ctx.tolerance, DisplacementTolerance::Factor(2.5));

        let ctx = build_context(&run_matches(&["--tolerance-kind", "relative"])).unwrap();
        assert_eq!(ctx.tolerance, DisplacementTolerance::Relative(0.05));

        let ctx = build_context(&run_matches(&[
            "--tolerance-kind",
            "relative",
            "--tolerance",
            "0.1",
        ]))
        .unwrap();
        assert_eq!(ctx.tolerance, DisplacementTolerance::Relative(0.1));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let err = build_context(&run_matches(&["--tolerance=-1"])).unwrap_err();
        assert_eq!(err.code(), 1);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(
            uu_app()
                .try_get_matches_from(["dpregress", "run", "screen"])
                .is_err()
        );
    }

    #[test]
    fn test_subcommand_required() {
        assert!(uu_app().try_get_matches_from(["dpregress"]).is_err());
    }

    #[test]
    fn test_get_interval() {
        let matches = uu_app().get_matches_from(["dpregress", "get", "--interval", "10"]);
        let sub = matches.subcommand_matches("get").unwrap();
        assert_eq!(sub.get_one::<u64>("interval"), Some(&10));
        assert!(!sub.get_flag("once"));
    }

    #[test]
    fn test_finish() {
        let mut summary = RunSummary {
            outcomes: vec![outcome("simple-test-1", true)],
            halted: false,
        };
        assert!(finish(&summary).is_ok());

        summary.outcomes.push(outcome("simple-test-2", false));
        summary.halted = true;
        let err = finish(&summary).unwrap_err();
        assert_eq!(err.code(), 1);
        assert_eq!(
            err.to_string(),
            "simple-test-2/a.rpt.ok: Sum_Displacement exceeds the 5x tolerance: 10 60"
        );

        summary.outcomes.push(outcome("fence-test-1", false));
        summary.halted = false;
        assert_eq!(
            finish(&summary).unwrap_err().to_string(),
            "2 of 3 golden comparisons failed"
        );
    }
}
