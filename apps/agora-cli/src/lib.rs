//! Command-line surface over the derived forum views.

use std::path::PathBuf;

use clap::{
	Parser, Subcommand,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use agora_service::AgoraService;
use agora_storage::{db::Db, docstore::DocStore};

#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab", styles = styles())]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Topic view over forum threads.
	Topics {
		#[command(subcommand)]
		command: TopicsCommand,
	},
	/// Behavioral clustering of participants.
	Participants {
		#[command(subcommand)]
		command: ParticipantsCommand,
	},
	/// Nearest-neighbor search folded into thread results.
	Similar {
		#[command(subcommand)]
		command: SimilarCommand,
	},
}

#[derive(Debug, Subcommand)]
pub enum TopicsCommand {
	/// Force a full recompute of the topic view.
	Recompute,
	/// Aggregate statistics of the current topic view.
	Stats,
	/// One row per topic with name, keywords and message count.
	Table,
	/// Keywords and message previews for one topic.
	Details {
		#[arg(value_name = "TOPIC_ID")]
		topic_id: i32,
	},
}

#[derive(Debug, Subcommand)]
pub enum ParticipantsCommand {
	/// Force a full recompute of the participant clusters.
	Recompute {
		#[arg(long, short = 'k', value_name = "N")]
		k: Option<u32>,
	},
	/// Users most similar to the given user, within the user's cluster.
	Recommend {
		#[arg(value_name = "USER_ID")]
		user_id: String,
		#[arg(long, value_name = "N")]
		top_n: Option<u32>,
	},
	/// Most-followed courses per cluster.
	TopCourses {
		#[arg(long, value_name = "N")]
		top_n: Option<u32>,
	},
}

#[derive(Debug, Subcommand)]
pub enum SimilarCommand {
	/// Messages similar to an already-stored message.
	Document {
		#[arg(value_name = "ID")]
		id: String,
		#[arg(long, value_name = "N")]
		limit: Option<u32>,
	},
	/// Messages similar to a free-text query.
	Query {
		#[arg(value_name = "TEXT")]
		query: String,
		#[arg(long, value_name = "N")]
		limit: Option<u32>,
	},
}

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let cfg = agora_config::load(&args.config)?;
	let filter = EnvFilter::new(cfg.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&cfg.storage.postgres).await?;

	db.ensure_schema(cfg.storage.postgres.vector_dim).await?;

	let docs = DocStore::connect(&cfg.storage.mongo).await?;
	let service = AgoraService::new(cfg, db, docs);

	match args.command {
		Command::Topics { command } => match command {
			TopicsCommand::Recompute => {
				let view = service.force_reload_topics().await?;

				print_json(&view.stats)?;
			},
			TopicsCommand::Stats => print_json(&service.topic_stats().await?)?,
			TopicsCommand::Table => print_json(&service.topics_table().await?)?,
			TopicsCommand::Details { topic_id } => match service.topic_details(topic_id).await? {
				Some(details) => print_json(&details)?,
				None => println!("Topic {topic_id} not found."),
			},
		},
		Command::Participants { command } => match command {
			ParticipantsCommand::Recompute { k } => {
				let view = service.participant_view(k, true).await?;

				print_json(&view.summaries)?;
			},
			ParticipantsCommand::Recommend { user_id, top_n } =>
				print_json(&service.recommend_similar_users(&user_id, top_n).await?)?,
			ParticipantsCommand::TopCourses { top_n } =>
				print_json(&service.top_courses(top_n).await?)?,
		},
		Command::Similar { command } => match command {
			SimilarCommand::Document { id, limit } =>
				print_json(&service.find_similar_to_document(&id, limit).await?)?,
			SimilarCommand::Query { query, limit } =>
				print_json(&service.find_similar_to_query(&query, limit).await?)?,
		},
	}

	Ok(())
}

fn print_json<T>(value: &T) -> color_eyre::Result<()>
where
	T: Serialize,
{
	println!("{}", serde_json::to_string_pretty(value)?);

	Ok(())
}
