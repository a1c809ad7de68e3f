// Shadow copies of test cases and the scripts rewritten inside them
//
// SPDX-License-Identifier: MIT
//
// This file is part of the dpregress package.
// It is licensed under the MIT License.
// For the full copyright and license information, please view the LICENSE
// file that was distributed with this source code.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use tempfile::NamedTempFile;
use uucore::display::Quotable;
use uucore::error::{FromIo, UIoError, UResult, USimpleError};

use crate::case::{DERIVED_PREFIX, TestCase};
use crate::error_handling::original_fixture;
use crate::rewrite::{RuleSet, TransformReport};

/// Extension of command scripts
pub const SCRIPT_EXTENSION: &str = "tcl";

/// True if path names a command script.
pub fn is_script(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SCRIPT_EXTENSION)
}

/// Return the command scripts directly inside dir, sorted by name.
pub fn list_scripts(dir: &Path) -> UResult<Vec<PathBuf>> {
    let context = || format!("listing scripts in {}", dir.quote());
    let entries = fs::read_dir(dir).map_err_context(context)?;

    let mut scripts = Vec::new();
    for entry in entries {
        let path = entry.map_err_context(context)?.path();
        if path.is_file() && is_script(&path) {
            scripts.push(path);
        }
    }
    scripts.sort();
    Ok(scripts)
}

/// A script copy that may be rewritten. Scripts outside a shadow
/// directory are rejected, so originals cannot be modified.
#[derive(Debug)]
pub struct DerivedScript {
    path: PathBuf,
    directory: String, // Name of the owning shadow directory
    text: String,
}

impl DerivedScript {
    /// Load the script at path, which must lie in a shadow directory.
    pub fn open(path: &Path) -> UResult<Self> {
        let directory = match path
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
        {
            Some(name) if name.starts_with(DERIVED_PREFIX) => name.to_string(),
            _ => return original_fixture(path),
        };

        let text = fs::read_to_string(path)
            .map_err_context(|| format!("reading script {}", path.quote()))?;

        Ok(DerivedScript {
            path: path.to_path_buf(),
            directory,
            text,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the script text in memory.
    pub fn transform(&mut self, rules: &RuleSet) -> TransformReport {
        let (text, report) = rules.transform(&self.text, &self.directory);
        self.text = text;
        report
    }

    /// Atomically replace the script file with the current text.
    pub fn write(&self) -> UResult<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp_file = NamedTempFile::new_in(dir)
            .map_err_context(|| format!("error creating temporary file in {}", dir.quote()))?;

        #[cfg(unix)]
        {
            let metadata = fs::metadata(&self.path)
                .map_err_context(|| format!("reading metadata of {}", self.path.quote()))?;
            let mode = metadata.permissions().mode() & 0o7777;
            fs::set_permissions(temp_file.path(), fs::Permissions::from_mode(mode))?;
        }

        temp_file
            .write_all(self.text.as_bytes())
            .map_err_context(|| format!("writing {}", temp_file.path().quote()))?;

        if let Err(e) = temp_file.persist(&self.path) {
            return Err(UIoError::new(
                e.error.kind(),
                format!(
                    "error persisting temporary file {} to {}",
                    e.file.path().quote(),
                    self.path.quote()
                ),
            ));
        }
        Ok(())
    }
}

/// An original test case and its shadow sibling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowCase {
    pub original: PathBuf,
    pub derived: PathBuf,
}

impl ShadowCase {
    /// Describe the shadow copy of case. Fails for cases that already are
    /// shadow copies.
    pub fn for_case(case: &TestCase) -> UResult<Self> {
        if case.name.starts_with(DERIVED_PREFIX) {
            return Err(USimpleError::new(
                1,
                format!("{} is already a converted copy", case.path.quote()),
            ));
        }
        Ok(ShadowCase {
            original: case.path.clone(),
            derived: case.path.with_file_name(case.derived_name()),
        })
    }

    /// Create or refresh the shadow directory. Scripts are always copied
    /// from the original so that conversion starts from pristine text;
    /// other files are copied when missing or older than the original.
    /// Shadow scripts without an original are removed, as they would
    /// otherwise be rewritten a second time.
    pub fn prepare(&self) -> UResult<()> {
        copy_tree(&self.original, &self.derived)?;

        for script in list_scripts(&self.derived)? {
            let Some(name) = script.file_name() else {
                continue;
            };
            if !self.original.join(name).is_file() {
                fs::remove_file(&script)
                    .map_err_context(|| format!("removing stale script {}", script.quote()))?;
            }
        }
        Ok(())
    }

    /// Return the scripts of the shadow directory, ready for rewriting.
    pub fn scripts(&self) -> UResult<Vec<DerivedScript>> {
        list_scripts(&self.derived)?
            .iter()
            .map(|path| DerivedScript::open(path))
            .collect()
    }

    /// Refresh the shadow copy and rewrite each of its scripts, returning
    /// the per-script transformation reports.
    pub fn convert(&self, rules: &RuleSet) -> UResult<Vec<(PathBuf, TransformReport)>> {
        self.prepare()?;

        let mut reports = Vec::new();
        for mut script in self.scripts()? {
            let report = script.transform(rules);
            script.write()?;
            reports.push((script.path().to_path_buf(), report));
        }
        Ok(reports)
    }
}

fn copy_tree(from: &Path, to: &Path) -> UResult<()> {
    fs::create_dir_all(to).map_err_context(|| format!("creating directory {}", to.quote()))?;

    let entries =
        fs::read_dir(from).map_err_context(|| format!("reading directory {}", from.quote()))?;
    for entry in entries {
        let entry = entry.map_err_context(|| format!("reading directory {}", from.quote()))?;
        let source = entry.path();
        let target = to.join(entry.file_name());

        if source.is_dir() {
            copy_tree(&source, &target)?;
        } else if is_script(&source) || is_stale(&source, &target) {
            fs::copy(&source, &target).map_err_context(|| {
                format!("copying {} to {}", source.quote(), target.quote())
            })?;
        }
    }
    Ok(())
}

// True if target is missing or older than source.
fn is_stale(source: &Path, target: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|m| m.modified()).ok();
    match (modified(source), modified(target)) {
        (Some(source_time), Some(target_time)) => source_time > target_time,
        _ => true,
    }
}
