/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Shared helpers for converting an internal, crate-private `Error` type into
//! the small public error enum a component exposes to its embedder, with a
//! single place to decide whether that conversion should also log or report.
//!
//! Crates depending on this one define their own internal `thiserror::Error`
//! and implement `GetErrorHandling` for it; call sites then call
//! `.get_error_handling()` at the boundary where an internal error becomes a
//! public one (see `suggest::error` and `tracker_stats::error`).

mod handling;
mod redact;
mod reporting;

pub use handling::{convert_log_report_error, ErrorHandling, ErrorReporting, GetErrorHandling};
pub use redact::{redact_compact_jwe, redact_url};
pub use reporting::{
    report_breadcrumb, report_error_to_app, set_application_error_reporter,
    unset_application_error_reporter, ApplicationErrorReporter, ArcReporterAdapter,
    TestErrorReporter,
};

#[cfg(feature = "log-logging")]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
