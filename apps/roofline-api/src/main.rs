use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = roofline_api::Args::parse();

	roofline_api::run(args).await
}
