// Construct the harness diagnostics and their exit codes
//
// SPDX-License-Identifier: MIT
//
// This file is part of the dpregress package.
// It is licensed under the MIT License.
// For the full copyright and license information, please view the LICENSE
// file that was distributed with this source code.

use crate::golden::ReportField;

use std::path::Path;
use uucore::display::Quotable;
use uucore::error::{UError, UResult, USimpleError};

/// Exit code of a run stopped by a golden comparison mismatch
pub const COMPARISON_FAILED: i32 = 1;
/// Exit code for unreadable or malformed report data
pub const MALFORMED_INPUT: i32 = 2;

/// Fail with msg as a malformed report at the specified field.
/// The error's exit code is 2.
pub fn malformed_field<T>(path: &Path, field: ReportField, msg: impl ToString) -> UResult<T> {
    Err(USimpleError::new(
        MALFORMED_INPUT,
        format!(
            "{}:{}: field `{}': error: {}",
            path.maybe_quote(),
            field.line_index() + 1,
            field,
            msg.to_string()
        ),
    ))
}

/// Fail with msg as a malformed report file.
/// The error's exit code is 2.
pub fn malformed_report<T>(path: &Path, msg: impl ToString) -> UResult<T> {
    Err(USimpleError::new(
        MALFORMED_INPUT,
        format!("{}: error: {}", path.maybe_quote(), msg.to_string()),
    ))
}

/// Error ending a run after a golden comparison mismatch.
pub fn comparison_failed(msg: impl ToString) -> Box<dyn UError> {
    USimpleError::new(COMPARISON_FAILED, msg.to_string())
}

/// Fail when asked to rewrite a script outside a shadow directory.
pub fn original_fixture<T>(path: &Path) -> UResult<T> {
    Err(USimpleError::new(
        MALFORMED_INPUT,
        format!(
            "refusing to rewrite {}: not inside a converted copy",
            path.quote()
        ),
    ))
}
