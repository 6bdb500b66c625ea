use std::fmt::Write;

/// Logs errors that do not abort the current operation.
pub trait ResultOkLogExt<T, E> {
    /// Logs the error, with its chain of sources, and discards it.
    fn ok_log(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("{}", error_chain(&err));
                None
            }
        }
    }
}

/// Formats an error followed by each of its sources that adds information.
///
/// Variants that embed their source in their own message are not repeated.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !out.contains(&cause_msg) {
            let _ = write!(out, ": {cause_msg}");
        }
        source = cause.source();
    }
    out
}
