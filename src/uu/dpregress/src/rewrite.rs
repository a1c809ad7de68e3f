// Rewrite command scripts from the standalone vocabulary to the
// integrated one
//
// Each line is checked against an ordered table of rules; the first rule
// that matches fires. Afterwards every remaining bare reference to the
// placement handle is routed through the variable that captures it.
// Lines are never removed, so line-indexed logs stay valid.
//
// SPDX-License-Identifier: MIT
//
// This file is part of the dpregress package.
// It is licensed under the MIT License.
// For the full copyright and license information, please view the LICENSE
// file that was distributed with this source code.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

/// Name under which scripts refer to the placement engine
pub const HANDLE_NAME: &str = "odp";
/// Command returning a handle to the integrated placement engine
pub const HANDLE_CONSTRUCTOR: &str = "opendp_external";

// A global, immutable rule table, initialized on first access
static STANDARD_RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::new(
        SubsystemHandle::new(HANDLE_NAME, HANDLE_CONSTRUCTOR),
        build_rule_table(HANDLE_NAME, HANDLE_CONSTRUCTOR),
    )
});

// Matches name when it is neither part of a longer identifier nor
// already dereferenced. Group 1 holds the preceding character, if any.
fn bare_name_pattern(name: &str) -> String {
    format!(r"(^|[^\w$]){}\b", regex::escape(name))
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// What a rule does to a line it matches
pub enum RuleAction {
    /// Replace the matched invocation, keeping the rest of the line
    Rename(&'static str),
    /// Blank the line
    DeleteLine,
    /// Replace the line with an assignment of the owning directory name
    AssignDirectory,
    /// Replace the line with the handle's capturing assignment
    BindHandle,
}

#[derive(Debug)]
/// A named pattern and the action applied to lines it matches
pub struct RewriteRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub action: RuleAction,
}

impl RewriteRule {
    fn new(name: &'static str, pattern: &str, action: RuleAction) -> Self {
        RewriteRule {
            name,
            // Patterns are built from constants and escaped names.
            pattern: Regex::new(pattern).expect("rewrite rule pattern"),
            action,
        }
    }

    pub fn matches(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }
}

// Build the rules in priority order.
fn build_rule_table(handle: &str, constructor: &str) -> Vec<RewriteRule> {
    let bare = |rest: &str| format!(r"{}\s+{}\b", bare_name_pattern(handle), rest);

    vec![
        RewriteRule::new("import_lef", &bare("import_lef"), RuleAction::Rename("read_lef")),
        RewriteRule::new("import_def", &bare("import_def"), RuleAction::Rename("read_def")),
        RewriteRule::new("init_opendp", &bare("init_opendp"), RuleAction::DeleteLine),
        RewriteRule::new("legalize_place", &bare("legalize_place"), RuleAction::DeleteLine),
        RewriteRule::new("set_exp", r"^\s*set\s+exp(\s|$)", RuleAction::AssignDirectory),
        RewriteRule::new(
            "bind_handle",
            &format!(
                r"{}\s+{}\b|^\s*set\s+{}\s+\[{}\]",
                bare_name_pattern(constructor),
                regex::escape(handle),
                regex::escape(handle),
                regex::escape(constructor)
            ),
            RuleAction::BindHandle,
        ),
    ]
}

#[derive(Debug, Clone)]
/// The placement engine instance that converted commands are sent to
pub struct SubsystemHandle {
    name: String,
    constructor: String,
    bare: Regex,
}

impl SubsystemHandle {
    pub fn new(name: &str, constructor: &str) -> Self {
        SubsystemHandle {
            name: name.to_string(),
            constructor: constructor.to_string(),
            bare: Regex::new(&bare_name_pattern(name)).expect("handle name pattern"),
        }
    }

    /// The line capturing the handle in a variable
    pub fn binding(&self) -> String {
        format!("set {} [{}]", self.name, self.constructor)
    }

    /// A reference to the captured handle
    pub fn reference(&self) -> String {
        format!("${}", self.name)
    }

    /// Route every bare occurrence of the handle name through the
    /// captured variable. Returns Borrowed if nothing changed.
    pub fn route<'a>(&self, line: &'a str) -> Cow<'a, str> {
        let reference = self.reference();
        self.bare
            .replace_all(line, |caps: &Captures| format!("{}{}", &caps[1], reference))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The result of rewriting a single line
pub struct LineRewrite {
    pub text: String,
    pub rule: Option<&'static str>, // Rule that fired, if any
    pub routed: bool,               // True if the handle was routed
}

impl LineRewrite {
    pub fn is_binding(&self) -> bool {
        self.rule == Some("bind_handle")
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
/// Summary of a whole-script transformation
pub struct TransformReport {
    /// Zero-based indices of lines whose text changed
    pub changed_lines: Vec<usize>,
    /// Line where the handle was first captured
    pub bound_at: Option<usize>,
    /// Lines using the handle before it was captured
    pub routed_before_binding: Vec<usize>,
}

#[derive(Debug)]
/// An ordered rule table plus the handle the routing step targets
pub struct RuleSet {
    handle: SubsystemHandle,
    rules: Vec<RewriteRule>,
}

impl RuleSet {
    pub fn new(handle: SubsystemHandle, rules: Vec<RewriteRule>) -> Self {
        RuleSet { handle, rules }
    }

    /// The rules converting standalone opendp scripts to OpenROAD ones
    pub fn standard() -> &'static RuleSet {
        &STANDARD_RULES
    }

    pub fn handle(&self) -> &SubsystemHandle {
        &self.handle
    }

    /// Return the highest-priority rule matching line, if any.
    pub fn matching_rule(&self, line: &str) -> Option<&RewriteRule> {
        self.rules.iter().find(|rule| rule.matches(line))
    }

    /// Rewrite one line owned by the named directory.
    pub fn rewrite_line(&self, line: &str, directory: &str) -> LineRewrite {
        let Some(rule) = self.matching_rule(line) else {
            return self.route(line.to_string(), None);
        };

        let text = match rule.action {
            RuleAction::Rename(to) => rule
                .pattern
                .replace_all(line, |caps: &Captures| format!("{}{}", &caps[1], to))
                .into_owned(),
            RuleAction::DeleteLine => String::new(),
            RuleAction::AssignDirectory => format!("set exp {directory}"),
            RuleAction::BindHandle => {
                return LineRewrite {
                    text: self.handle.binding(),
                    rule: Some(rule.name),
                    routed: false,
                };
            }
        };
        self.route(text, Some(rule.name))
    }

    // Apply the routing step to the output of the rule step.
    fn route(&self, text: String, rule: Option<&'static str>) -> LineRewrite {
        let routed = match self.handle.route(&text) {
            Cow::Owned(routed) => Some(routed),
            Cow::Borrowed(_) => None,
        };
        match routed {
            Some(routed) => LineRewrite {
                text: routed,
                rule,
                routed: true,
            },
            None => LineRewrite {
                text,
                rule,
                routed: false,
            },
        }
    }

    /// Rewrite a whole script. The output has exactly as many lines as
    /// the input, including a trailing empty one.
    pub fn transform(&self, text: &str, directory: &str) -> (String, TransformReport) {
        let mut report = TransformReport::default();
        let mut output = Vec::new();

        for (index, line) in text.split('\n').enumerate() {
            let rewrite = self.rewrite_line(line, directory);
            if rewrite.is_binding() && report.bound_at.is_none() {
                report.bound_at = Some(index);
            }
            if rewrite.routed && report.bound_at.is_none() {
                report.routed_before_binding.push(index);
            }
            if rewrite.text != line {
                report.changed_lines.push(index);
            }
            output.push(rewrite.text);
        }

        (output.join("\n"), report)
    }
}
