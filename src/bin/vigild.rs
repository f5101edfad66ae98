use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use vigil::{
    config::{Feature, Profile, read_config_file},
    registry::ProfileRegistry,
    reporter::Reporter,
    scheduler::Scheduler,
    sources::{MetricsSource, SyntheticSource, SystemSource},
    util,
};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Optional JSON file with additional profiles
    #[arg(short, long)]
    config: Option<String>,

    /// Profile selector (overrides VIGIL_PROFILE)
    #[arg(short, long)]
    profile: Option<String>,
}

fn init(profile: &Profile) {
    let level = if profile.has_feature(Feature::VerboseLogging) {
        LevelFilter::TRACE
    } else if profile.has_feature(Feature::DebugLogging) {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let filter = filter::Targets::new().with_targets(vec![("vigil", level), ("vigild", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut registry = ProfileRegistry::with_builtins();
    if let Some(path) = &args.config {
        let config = read_config_file(path)?;
        for profile in config.profiles {
            registry.register(profile)?;
        }
    }

    let selector = args
        .profile
        .clone()
        .unwrap_or_else(util::get_profile_selector);

    // Configuration failures abort before any scheduler starts; the error
    // lists the valid profile names for the operator.
    let profile = registry.resolve(&selector)?.clone();

    init(&profile);
    trace!("started with args: {args:?}");
    info!(
        profile = %profile.name,
        interval_ms = profile.interval_ms,
        threshold = profile.alert_threshold,
        "starting health monitoring"
    );

    let source: Arc<dyn MetricsSource> = if profile.has_feature(Feature::SyntheticSource) {
        Arc::new(SyntheticSource::new())
    } else {
        Arc::new(SystemSource::new())
    };
    debug!("sampling from {} source", source.name());

    let reporter = Arc::new(Reporter::with_console());
    let mut scheduler = Scheduler::new(profile, source, reporter.clone());

    scheduler.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested, draining");

    scheduler.stop();
    scheduler.drained().await;

    if reporter.sink_failures() > 0 {
        info!("{} sink emissions failed over this run", reporter.sink_failures());
    }

    Ok(())
}
