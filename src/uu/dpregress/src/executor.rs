// Run the placement tool on each command script of a test case
//
// SPDX-License-Identifier: MIT
//
// This file is part of the dpregress package.
// It is licensed under the MIT License.
// For the full copyright and license information, please view the LICENSE
// file that was distributed with this source code.

use crate::case::TestCase;
use crate::derived::list_scripts;

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use uucore::display::Quotable;
use uucore::error::{FromIo, UResult};
use uucore::show_warning;

/// Extension of generated reports removed before a run
pub const REPORT_EXTENSION: &str = "rpt";
/// Extension of tool logs removed before a run
pub const LOG_EXTENSION: &str = "log";

#[derive(Debug, Clone, PartialEq, Eq)]
/// A fully resolved tool invocation for one script
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub log: PathBuf, // Receives the combined stdout and stderr
}

impl Invocation {
    /// The command line, as echoed before running it
    pub fn command_line(&self) -> String {
        let mut line = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Sequential runner of the tool binary. The tool runs in the harness
/// root and receives script paths relative to it.
#[derive(Debug, Clone)]
pub struct Executor {
    root: PathBuf,
    tool: PathBuf,
    valgrind: bool,
}

impl Executor {
    pub fn new(root: &Path, tool: &Path, valgrind: bool) -> Self {
        // Relative program paths are ambiguous once current_dir is set.
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        Executor {
            tool: resolve_tool(&root, tool),
            root,
            valgrind,
        }
    }

    /// Build the invocation running script_name of case.
    pub fn invocation(&self, case: &TestCase, script_name: &str) -> Invocation {
        let script = Path::new(&case.name).join(script_name);
        let log = case.path.join(log_name(script_name, self.valgrind));

        if self.valgrind {
            Invocation {
                program: PathBuf::from("valgrind"),
                args: vec![
                    OsString::from("--log-fd=1"),
                    self.tool.clone().into_os_string(),
                    script.into_os_string(),
                ],
                log,
            }
        } else {
            Invocation {
                program: self.tool.clone(),
                args: vec![script.into_os_string()],
                log,
            }
        }
    }

    /// Run invocation to completion. A non-zero exit is reported as a
    /// warning; the golden comparison decides the verdict.
    pub fn run(&self, invocation: &Invocation) -> UResult<ExitStatus> {
        println!("CMD: {}", invocation.command_line());

        let stdout_file = File::create(&invocation.log)
            .map_err_context(|| format!("creating log {}", invocation.log.quote()))?;
        let stderr_file = stdout_file
            .try_clone()
            .map_err_context(|| format!("creating log {}", invocation.log.quote()))?;

        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file))
            .stderr(Stdio::from(stderr_file))
            .status()
            .map_err_context(|| format!("running {}", invocation.program.quote()))?;

        if !status.success() {
            show_warning!(
                "{} exited with {}; see {}",
                invocation.command_line(),
                status,
                invocation.log.quote()
            );
        }
        Ok(status)
    }

    /// Run every script of case in name order.
    pub fn run_case(&self, case: &TestCase) -> UResult<()> {
        for script in list_scripts(&case.path)? {
            let Some(name) = script.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            println!("  {name}");
            self.run(&self.invocation(case, name))?;
        }
        Ok(())
    }
}

// Tool paths with a directory part are taken relative to the root;
// bare names are looked up in PATH.
fn resolve_tool(root: &Path, tool: &Path) -> PathBuf {
    if tool.is_absolute() || tool.components().count() == 1 {
        tool.to_path_buf()
    } else {
        root.join(tool)
    }
}

/// Name of the log receiving the output of script_name.
pub fn log_name(script_name: &str, valgrind: bool) -> String {
    if valgrind {
        format!("{script_name}_mem_check.{LOG_EXTENSION}")
    } else {
        format!("{script_name}.{LOG_EXTENSION}")
    }
}

/// Remove the reports and logs left in dir by an earlier run.
pub fn clean_outputs(dir: &Path) -> UResult<()> {
    let context = || format!("reading directory {}", dir.quote());
    let entries = fs::read_dir(dir).map_err_context(context)?;
    for entry in entries {
        let path = entry.map_err_context(context)?.path();
        let stale = path
            .extension()
            .is_some_and(|ext| ext == REPORT_EXTENSION || ext == LOG_EXTENSION);
        if stale && path.is_file() {
            fs::remove_file(&path).map_err_context(|| format!("removing {}", path.quote()))?;
        }
    }
    Ok(())
}
