//! Turning a failed command into a message and an exit code
//!
//! Bundling errors carry a kind, and each kind gets its own exit code so a
//! wrapper script (or a watch loop) can tell "fix your files" apart from
//! "try again".

use cvx_bundler::{BundleError, ErrorKind};
use cvx_logger::{DiagnosticEvent, LogSink, Logger};

/// The project's files are wrong.
pub const EXIT_INVALID: i32 = 1;
/// Internal software error (sysexits `EX_SOFTWARE`).
pub const EXIT_FATAL: i32 = 70;
/// Temporary failure, retry (sysexits `EX_TEMPFAIL`).
pub const EXIT_TRANSIENT: i32 = 75;

pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<BundleError>().map(BundleError::kind) {
        Some(ErrorKind::InvalidFilesystemData) | None => EXIT_INVALID,
        Some(ErrorKind::Transient) => EXIT_TRANSIENT,
        Some(ErrorKind::Fatal) => EXIT_FATAL,
    }
}

/// Print `err` in the style its kind calls for and return the exit code.
pub fn report(logger: &Logger, err: &anyhow::Error) -> i32 {
    let Some(bundle_err) = err.downcast_ref::<BundleError>() else {
        logger.error(&format!("{err:#}"));
        return EXIT_INVALID;
    };

    match bundle_err.kind() {
        ErrorKind::InvalidFilesystemData => {
            logger.error(&format!("{err:#}"));
            if let Some(path) = bundle_err.path() {
                logger.info(&format!("While checking {}", path.display()));
            }
        }
        ErrorKind::Transient => {
            logger.warn(&format!("{err:#}"));
            logger.message("Files changed while bundling. Run the command again.");
        }
        ErrorKind::Fatal => {
            logger.error(&format!("Unexpected error: {err:#}"));
            logger.capture(DiagnosticEvent::error(bundle_err.to_string()));
            logger.show_log_path();
        }
    }
    exit_code(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_code_per_kind() {
        let invalid = anyhow::Error::from(BundleError::invalid("bad file"));
        let transient = anyhow::Error::from(BundleError::transient("changed"));
        let fatal = anyhow::Error::from(BundleError::fatal("broken"));
        assert_eq!(exit_code(&invalid), EXIT_INVALID);
        assert_eq!(exit_code(&transient), EXIT_TRANSIENT);
        assert_eq!(exit_code(&fatal), EXIT_FATAL);
    }

    #[test]
    fn test_exit_code_survives_context() {
        let err: anyhow::Result<()> =
            Err(BundleError::transient("changed")).context("Bundling failed");
        let err = err.unwrap_err();
        assert_eq!(exit_code(&err), EXIT_TRANSIENT);
    }

    #[test]
    fn test_other_errors_are_invalid_input() {
        let err = anyhow::anyhow!("cannot write payload");
        assert_eq!(exit_code(&err), EXIT_INVALID);
        let logger = Logger::new(0, true);
        assert_eq!(report(&logger, &err), EXIT_INVALID);
    }
}
