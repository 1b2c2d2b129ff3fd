use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

/// Installs the stderr subscriber: warnings always, everything down to debug with `verbose`.
pub fn init(verbose: bool) -> Result<()> {
    let _ = fmt()
        .with_max_level(max_level(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .try_init();
    Ok(())
}

fn max_level(verbose: bool) -> Level {
    if verbose { Level::DEBUG } else { Level::WARN }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_runs_still_report_warnings() {
        assert_eq!(max_level(false), Level::WARN);
        assert_eq!(max_level(true), Level::DEBUG);
    }
}
