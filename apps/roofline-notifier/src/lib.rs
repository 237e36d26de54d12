use clap::Parser;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::EnvFilter;

use roofline_service::RooflineService;
use roofline_storage::db::Db;

/// Runs exactly one notification tick and exits. The recurrence lives in
/// whatever invokes this binary (cron, a queue consumer, an operator);
/// there is no internal timer loop.
#[derive(Debug, Parser)]
#[command(
	version = roofline_cli::VERSION,
	rename_all = "kebab",
	styles = roofline_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: std::path::PathBuf,
	/// Override the tick's notion of "now" (RFC3339), for drills and replays.
	#[arg(long, value_name = "TIMESTAMP")]
	pub now: Option<String>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = roofline_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let now = match args.now.as_deref() {
		Some(raw) => OffsetDateTime::parse(raw, &Rfc3339)
			.map_err(|err| color_eyre::eyre::eyre!("Failed to parse --now: {err}."))?,
		None => OffsetDateTime::now_utc(),
	};
	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let service = RooflineService::new(config, &db);
	let report = service
		.run_tick(now)
		.await
		.map_err(|err| color_eyre::eyre::eyre!("Tick failed: {err}"))?;

	tracing::info!(
		due = report.due,
		fired = report.fired,
		failed = report.failed,
		skipped = report.skipped,
		"Notifier run finished.",
	);

	Ok(())
}
