use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = roofline_notifier::Args::parse();

	roofline_notifier::run(args).await
}
