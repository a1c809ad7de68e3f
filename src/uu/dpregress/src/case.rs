// Definitions for test cases and the harness run configuration
//
// SPDX-License-Identifier: MIT
//
// This file is part of the dpregress package.
// It is licensed under the MIT License.
// For the full copyright and license information, please view the LICENSE
// file that was distributed with this source code.

use crate::golden::DisplacementTolerance;

use std::fmt;
use std::path::{Path, PathBuf};

/// Name prefix of shadow directories holding converted scripts
pub const DERIVED_PREFIX: &str = "or-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Test groupings recognized from directory names
pub enum Category {
    Simple,
    MultiHeight,
    LowUtil,
    Fence,
    EdgeType,
    Iccad17,
    ExternalTool, // Converted copies run through the external tool
}

// Directory name markers, checked in order after the derived prefix.
// The first marker found wins.
const MARKERS: [(&str, Category); 6] = [
    ("multi-height-test", Category::MultiHeight),
    ("simple-test", Category::Simple),
    ("low-util-test", Category::LowUtil),
    ("fence-test", Category::Fence),
    ("edge-type-test", Category::EdgeType),
    ("iccad17-test", Category::Iccad17),
];

impl Category {
    /// Classify a test-case directory by its name alone.
    pub fn classify(dir_name: &str) -> Option<Self> {
        if dir_name.starts_with(DERIVED_PREFIX) {
            return Some(Category::ExternalTool);
        }
        MARKERS
            .iter()
            .find(|(marker, _)| dir_name.contains(marker))
            .map(|(_, category)| *category)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Category::Simple => "simple",
            Category::MultiHeight => "multi-height",
            Category::LowUtil => "low-util",
            Category::Fence => "fence",
            Category::EdgeType => "edge-type",
            Category::Iccad17 => "iccad17",
            Category::ExternalTool => "external-tool",
        }
    }

    /// True for the groups whose scripts are converted into shadow copies
    pub fn is_convertible(&self) -> bool {
        CONVERTIBLE.contains(self)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Groups copied and rewritten by `convert`
pub const CONVERTIBLE: [Category; 6] = [
    Category::Iccad17,
    Category::MultiHeight,
    Category::Simple,
    Category::LowUtil,
    Category::Fence,
    Category::EdgeType,
];

#[derive(Debug, Clone, PartialEq, Eq)]
/// A test-case directory discovered under the harness root
pub struct TestCase {
    pub path: PathBuf,     // Directory path, as found under the root
    pub name: String,      // Directory name
    pub category: Category,
}

impl TestCase {
    /// Build a test case from a directory path, or None if its name is
    /// not a recognized test grouping.
    pub fn from_dir(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        let category = Category::classify(&name)?;
        Some(TestCase {
            path: path.to_path_buf(),
            name,
            category,
        })
    }

    /// Name of the shadow directory holding this case's converted scripts
    pub fn derived_name(&self) -> String {
        format!("{DERIVED_PREFIX}{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Which tool binary and test groupings a run exercises
pub enum RunMode {
    #[default]
    Opendp,
    Openroad,
}

impl RunMode {
    /// Tool invoked when no --tool is given, relative to the root.
    pub fn default_tool(&self) -> &'static str {
        match self {
            RunMode::Opendp => "./opendp",
            RunMode::Openroad => "./openroad",
        }
    }

    /// Groups run by this mode, in execution order.
    pub fn groups(&self) -> &'static [Category] {
        match self {
            RunMode::Opendp => &[
                Category::Simple,
                Category::Fence,
                Category::MultiHeight,
                Category::LowUtil,
                Category::EdgeType,
            ],
            RunMode::Openroad => &[Category::ExternalTool],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// What a run does after a golden comparison fails
pub enum FailurePolicy {
    #[default]
    HaltOnFirst,
    Collect,
}

// Run options provided through the command-line interface
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessContext {
    pub root: PathBuf,
    pub mode: RunMode,
    pub tool: Option<PathBuf>,
    pub tolerance: DisplacementTolerance,
    pub failure_policy: FailurePolicy,
    pub valgrind: bool,
    /// Refresh shadow copies before an openroad run
    pub convert_first: bool,
}

impl Default for HarnessContext {
    fn default() -> Self {
        HarnessContext {
            root: PathBuf::from("."),
            mode: RunMode::default(),
            tool: None,
            tolerance: DisplacementTolerance::default(),
            failure_policy: FailurePolicy::default(),
            valgrind: false,
            convert_first: false,
        }
    }
}

impl HarnessContext {
    /// The tool binary for this run
    pub fn tool(&self) -> PathBuf {
        self.tool
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.mode.default_tool()))
    }
}
