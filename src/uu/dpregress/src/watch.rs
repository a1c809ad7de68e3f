// Periodic display of the reports produced by running test cases
//
// SPDX-License-Identifier: MIT
//
// This file is part of the dpregress package.
// It is licensed under the MIT License.
// For the full copyright and license information, please view the LICENSE
// file that was distributed with this source code.

use crate::executor::REPORT_EXTENSION;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use uucore::display::Quotable;
use uucore::error::{FromIo, UResult};
use uucore::show_warning;

/// Seconds between two refreshes
pub const DEFAULT_INTERVAL: u64 = 3;

/// Directories whose name contains this are searched for reports
const CASE_MARKER: &str = "-test";
/// Subdirectory of a case holding experiment reports
const EXPERIMENT_DIR: &str = "exp";

// Move to the top-left corner and clear the terminal.
const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J";

/// Return the reports in the experiment directories of all test cases
/// under root, sorted by path.
pub fn collect_reports(root: &Path) -> UResult<Vec<PathBuf>> {
    let context = |dir: &Path| format!("reading directory {}", dir.quote());
    let entries = fs::read_dir(root).map_err_context(|| context(root))?;

    let mut reports = Vec::new();
    for entry in entries {
        let entry = entry.map_err_context(|| context(root))?;
        let is_case = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.contains(CASE_MARKER));
        let exp = entry.path().join(EXPERIMENT_DIR);
        if !is_case || !exp.is_dir() {
            continue;
        }

        for file in fs::read_dir(&exp).map_err_context(|| context(&exp))? {
            let path = file.map_err_context(|| context(&exp))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == REPORT_EXTENSION) {
                reports.push(path);
            }
        }
    }
    reports.sort();
    Ok(reports)
}

/// Render every line of the reports prefixed by the report path,
/// relative to root. Unreadable reports are skipped with a warning.
pub fn render(root: &Path, reports: &[PathBuf]) -> String {
    let mut out = String::new();
    for report in reports {
        let shown = report.strip_prefix(root).unwrap_or(report);
        let text = match fs::read_to_string(report) {
            Ok(text) => text,
            Err(e) => {
                show_warning!("{}: {}", shown.maybe_quote(), e);
                continue;
            }
        };
        for line in text.lines() {
            out.push_str(&format!("{}:{line}\n", shown.display()));
        }
    }
    out
}

/// Show the reports under root, once or every interval until interrupted.
pub fn watch(root: &Path, interval: Duration, once: bool) -> UResult<()> {
    let mut stdout = io::stdout().lock();
    loop {
        let snapshot = render(root, &collect_reports(root)?);
        if once {
            stdout.write_all(snapshot.as_bytes())?;
            stdout.flush()?;
            return Ok(());
        }

        write!(
            stdout,
            "{CLEAR_SCREEN}Every {}s: reports under {}\n\n{snapshot}",
            interval.as_secs(),
            root.display()
        )?;
        stdout.flush()?;
        thread::sleep(interval);
    }
}
