// Discover the test cases under the harness root
//
// SPDX-License-Identifier: MIT
//
// This file is part of the dpregress package.
// It is licensed under the MIT License.
// For the full copyright and license information, please view the LICENSE
// file that was distributed with this source code.

use crate::case::{Category, TestCase};

use std::fs;
use std::path::Path;
use uucore::display::Quotable;
use uucore::error::{FromIo, UResult};

/// Return the classified test-case directories directly under root,
/// sorted by name. Unrecognized directories and plain files are skipped.
pub fn discover(root: &Path) -> UResult<Vec<TestCase>> {
    let context = || format!("reading test directory {}", root.quote());
    let entries = fs::read_dir(root).map_err_context(context)?;

    let mut cases = Vec::new();
    for entry in entries {
        let path = entry.map_err_context(context)?.path();
        if path.is_dir() {
            cases.extend(TestCase::from_dir(&path));
        }
    }
    cases.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(cases)
}

/// Return the cases of category, keeping their order.
pub fn select(cases: &[TestCase], category: Category) -> Vec<TestCase> {
    cases
        .iter()
        .filter(|case| case.category == category)
        .cloned()
        .collect()
}
