// crates.io
use clap::Parser;
// self
use agora_cli::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	agora_cli::run(args).await
}
