use anyhow::Context;
use backup_monitor::cli::Args;
use backup_monitor::{
    EmailNotifier, LogNotifier, MonitorConfig, Notifier, RunCoordinator, TracingSink,
};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Backup monitor - version {}",
        env!("CARGO_PKG_VERSION")
    );

    let (path, config) = MonitorConfig::locate(args.config.as_deref())
        .context("Failed to load configuration")?;
    info!("Configuration taken from file '{}'", path.display());
    for line in config.summary_lines() {
        info!("{}", line);
    }

    let interval_minutes = config.update_interval_minutes;
    let mut coordinator = RunCoordinator::new(config);
    let mut sink = TracingSink;

    if args.once || interval_minutes == 0 {
        info!("Doing a single monitoring run");
        run_once(&mut coordinator, &mut sink);
        return Ok(());
    }

    info!(
        "Starting periodic monitoring every {} minutes. Press Ctrl-C to stop.",
        interval_minutes
    );
    let period = interval_minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .context("Update interval is too large")?;
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => run_once(&mut coordinator, &mut sink),
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping");
                break;
            }
        }
    }

    Ok(())
}

/// One blocking run with notifiers that live only for this run
fn run_once(coordinator: &mut RunCoordinator, sink: &mut TracingSink) {
    let mut notifiers = build_notifiers(coordinator.config());
    let report = coordinator.check(sink, &mut notifiers);

    for failed in report.failed_groups() {
        warn!(
            group = %failed.source_name,
            error = failed.error_detail().unwrap_or_default(),
            "group could not be checked"
        );
    }
}

fn build_notifiers(config: &MonitorConfig) -> Vec<Box<dyn Notifier>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = vec![Box::new(LogNotifier)];

    match &config.email {
        Some(settings) => notifiers.push(Box::new(EmailNotifier::new(settings.clone()))),
        None => info!("Email option is disabled. No email parameters are set."),
    }

    notifiers
}
