//! Best-effort progress reporting

use std::panic::{catch_unwind, AssertUnwindSafe};

/// Called with `(stage name, completion fraction in [0, 1])`
///
/// Runs synchronously on the workflow's path and may borrow from the caller.
/// Errors and panics are logged and otherwise ignored.
pub type ProgressCallback<'a> = dyn Fn(&str, f64) -> anyhow::Result<()> + Send + Sync + 'a;

pub(crate) fn report(callback: Option<&ProgressCallback<'_>>, stage: &str, fraction: f64) {
    let Some(callback) = callback else {
        return;
    };

    let fraction = fraction.clamp(0.0, 1.0);
    match catch_unwind(AssertUnwindSafe(|| callback(stage, fraction))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(stage, error = %e, "Progress callback failed"),
        Err(_) => tracing::warn!(stage, "Progress callback panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_report_clamps_and_forwards() {
        let seen = Mutex::new(Vec::new());
        let callback = |stage: &str, fraction: f64| -> anyhow::Result<()> {
            seen.lock().unwrap().push((stage.to_string(), fraction));
            Ok(())
        };

        report(Some(&callback), "IQ", 1.5);
        report(Some(&callback), "OQ", -0.1);
        report(None, "PQ", 0.5);

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen, vec![("IQ".to_string(), 1.0), ("OQ".to_string(), 0.0)]);
    }

    #[test]
    fn test_report_swallows_errors_and_panics() {
        let failing = |_: &str, _: f64| -> anyhow::Result<()> { anyhow::bail!("display gone") };
        report(Some(&failing), "IQ", 0.1);

        let panicking = |_: &str, _: f64| -> anyhow::Result<()> { panic!("widget destroyed") };
        report(Some(&panicking), "IQ", 0.2);
    }
}
