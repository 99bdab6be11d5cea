//! Types shared by every `arpsweep` crate: scan configuration, the error
//! taxonomy, and the network model (targets, interfaces, bindings).

pub mod config;
pub mod error;
pub mod network;

#[doc(hidden)]
pub use tracing as __tracing;

/// Log target used for milestone messages that the terminal renders as successes.
pub const SUCCESS_TARGET: &str = "arpsweep::success";

/// Logs a successful milestone.
///
/// Emitted at `INFO` under [`SUCCESS_TARGET`] so formatters can style it apart
/// from plain informational output.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::__tracing::info!(target: "arpsweep::success", $($arg)*)
    };
}
