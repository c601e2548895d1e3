//! Invocation of resolved methods.
//!
//! The invoker runs a method exactly once and converts its outcome into a
//! single `Result`: the output on success, or a [`DispatchError`] carrying
//! either the domain error or a fault. A panic raised while the call runs,
//! including one from a payload's `Deserialize` or an output's `Serialize`
//! impl, is caught here and becomes a fault for the current request only.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::error;

use crate::error::DispatchError;

/// Tracing target for invocation events.
const INVOKE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::invoke");

/// Runs `call` once and folds its outcome into a dispatch result.
///
/// No retries and no timeout are applied. Deadlines are the callee's business
/// via the call context.
///
/// # Errors
///
/// Returns the call's own error converted into a [`DispatchError`], and
/// [`DispatchError::Fault`] when it panics.
pub fn invoke<O, E, F>(method: &str, call: F) -> Result<O, DispatchError>
where
    F: FnOnce() -> Result<O, E>,
    E: Into<DispatchError>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result.map_err(Into::into),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(
                target: INVOKE_TARGET,
                method,
                panic = %message,
                "method panicked"
            );
            Err(DispatchError::fault(method, message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        return (*text).to_owned();
    }
    if let Some(text) = payload.downcast_ref::<String>() {
        return text.clone();
    }
    "non-string panic payload".to_owned()
}
