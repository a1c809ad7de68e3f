// Drive a regression run: convert, execute and compare each test case
//
// SPDX-License-Identifier: MIT
//
// This file is part of the dpregress package.
// It is licensed under the MIT License.
// For the full copyright and license information, please view the LICENSE
// file that was distributed with this source code.

use crate::case::{FailurePolicy, HarnessContext, RunMode, TestCase};
use crate::derived::ShadowCase;
use crate::executor::{Executor, clean_outputs};
use crate::golden::{ComparisonOutcome, find_pairs};
use crate::registry::{discover, select};
use crate::rewrite::RuleSet;

use std::fmt;
use std::path::{Path, PathBuf};
use uucore::display::Quotable;
use uucore::error::UResult;
use uucore::{show_error, show_warning};

#[derive(Debug, Clone, PartialEq)]
/// The verdict for one golden file of a test case
pub struct CaseOutcome {
    pub case: String,
    pub golden: PathBuf, // Relative to the harness root
    pub outcome: ComparisonOutcome,
}

impl fmt::Display for CaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.golden.maybe_quote(), self.outcome)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
/// All verdicts of a run, in the order they were produced
pub struct RunSummary {
    pub outcomes: Vec<CaseOutcome>,
    /// True if the run stopped at a failure before finishing
    pub halted: bool,
}

impl RunSummary {
    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|o| !o.outcome.is_pass())
    }

    pub fn passed(&self) -> bool {
        self.failures().next().is_none()
    }
}

// Shorten path for display, relative to root when possible.
fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

/// Run the groups selected by the context's mode.
pub fn run_all(ctx: &HarnessContext) -> UResult<RunSummary> {
    if ctx.convert_first && ctx.mode == RunMode::Openroad {
        convert_all(&ctx.root)?;
    }

    let cases = discover(&ctx.root)?;
    let executor = Executor::new(&ctx.root, &ctx.tool(), ctx.valgrind);
    let mut summary = RunSummary::default();

    for &category in ctx.mode.groups() {
        run_group(&select(&cases, category), &executor, ctx, &mut summary)?;
        if summary.halted {
            break;
        }
    }
    Ok(summary)
}

/// Run one group of cases. Outputs of the whole group are cleaned before
/// its first script runs.
pub fn run_group(
    group: &[TestCase],
    executor: &Executor,
    ctx: &HarnessContext,
    summary: &mut RunSummary,
) -> UResult<()> {
    for case in group {
        clean_outputs(&case.path)?;
    }

    for case in group {
        println!("Access {}:", case.name);
        executor.run_case(case)?;

        println!("Compare with golden: ");
        for pair in find_pairs(&case.path)? {
            let outcome = pair.compare(ctx.tolerance)?;
            let result = CaseOutcome {
                case: case.name.clone(),
                golden: relative_to(&pair.golden, &ctx.root),
                outcome,
            };

            if result.outcome.is_pass() {
                println!("  {} passed!", result.golden.display());
                summary.outcomes.push(result);
                continue;
            }

            match ctx.failure_policy {
                FailurePolicy::HaltOnFirst => {
                    summary.outcomes.push(result);
                    summary.halted = true;
                    return Ok(());
                }
                FailurePolicy::Collect => {
                    show_error!("{result}");
                    summary.outcomes.push(result);
                }
            }
        }
    }
    Ok(())
}

/// Refresh the shadow copies of all convertible cases under root and
/// rewrite their scripts. Returns the number of scripts converted.
pub fn convert_all(root: &Path) -> UResult<usize> {
    let rules = RuleSet::standard();
    let handle = rules.handle();
    let mut converted = 0;

    for case in discover(root)?
        .iter()
        .filter(|case| case.category.is_convertible())
    {
        let shadow = ShadowCase::for_case(case)?;
        for (path, report) in shadow.convert(rules)? {
            let shown = relative_to(&path, root);
            println!("{}", shown.display());
            for line in &report.routed_before_binding {
                show_warning!(
                    "{}:{}: {} is used before `{}' binds it",
                    shown.maybe_quote(),
                    line + 1,
                    handle.reference(),
                    handle.binding()
                );
            }
            converted += 1;
        }
    }
    Ok(converted)
}
