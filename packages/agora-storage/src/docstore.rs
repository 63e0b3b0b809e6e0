use std::collections::HashMap;

use bson::doc;
use futures::TryStreamExt;
use mongodb::{Client, Database};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{Result, models::ForumDocument};

/// Gateway to the document store. Thread roots live in one collection with
/// their content denormalized; the flat collection holds every message,
/// replies included, and is the one resolved by id.
pub struct DocStore {
	db: Database,
	threads: String,
	documents: String,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
	#[serde(rename = "_id")]
	id: String,
	#[serde(default)]
	thread_id: Option<String>,
	#[serde(default)]
	content: RawContent,
}

#[derive(Debug, Default, Deserialize)]
struct RawContent {
	#[serde(default)]
	title: String,
	#[serde(default)]
	body: String,
	#[serde(default, rename = "courseware_title")]
	category: String,
	#[serde(default)]
	user_id: Option<String>,
	#[serde(default)]
	course_id: Option<String>,
	#[serde(default)]
	votes: RawVotes,
	#[serde(default)]
	comments_count: i64,
	#[serde(default)]
	created_at: Option<bson::DateTime>,
	#[serde(default)]
	updated_at: Option<bson::DateTime>,
}

#[derive(Debug, Default, Deserialize)]
struct RawVotes {
	#[serde(default)]
	count: i64,
}

#[derive(Debug, Deserialize)]
struct RawBody {
	#[serde(rename = "_id")]
	id: String,
	#[serde(default)]
	content: RawBodyContent,
}

#[derive(Debug, Default, Deserialize)]
struct RawBodyContent {
	#[serde(default)]
	body: String,
}

impl DocStore {
	pub async fn connect(cfg: &agora_config::Mongo) -> Result<Self> {
		let client = Client::with_uri_str(&cfg.url).await?;

		Ok(Self {
			db: client.database(&cfg.database),
			threads: cfg.threads_collection.clone(),
			documents: cfg.documents_collection.clone(),
		})
	}

	pub async fn find_by_id(&self, id: &str) -> Result<Option<ForumDocument>> {
		let raw = self
			.db
			.collection::<RawDocument>(&self.documents)
			.find_one(doc! { "_id": id })
			.await?;

		Ok(raw.map(flatten))
	}

	pub async fn list_threads(&self) -> Result<Vec<ForumDocument>> {
		let raw: Vec<RawDocument> = self
			.db
			.collection::<RawDocument>(&self.threads)
			.find(doc! {})
			.await?
			.try_collect()
			.await?;

		Ok(raw.into_iter().map(flatten).collect())
	}

	/// Message bodies by thread id, fetched with a projection; used to
	/// hydrate topic previews without pulling full documents.
	pub async fn thread_bodies(&self) -> Result<HashMap<String, String>> {
		let raw: Vec<RawBody> = self
			.db
			.collection::<RawBody>(&self.threads)
			.find(doc! {})
			.projection(doc! { "_id": 1, "content.body": 1 })
			.await?
			.try_collect()
			.await?;

		Ok(raw.into_iter().map(|doc| (doc.id, doc.content.body)).collect())
	}
}

fn flatten(raw: RawDocument) -> ForumDocument {
	ForumDocument {
		id: raw.id,
		thread_id: raw.thread_id,
		user_id: raw.content.user_id,
		course_id: raw.content.course_id,
		title: raw.content.title,
		category: raw.content.category,
		body: raw.content.body,
		votes: raw.content.votes.count,
		comment_count: raw.content.comments_count,
		created_at: raw.content.created_at.map(to_offset),
		updated_at: raw.content.updated_at.map(to_offset),
	}
}

fn to_offset(ts: bson::DateTime) -> OffsetDateTime {
	OffsetDateTime::from_unix_timestamp_nanos(i128::from(ts.timestamp_millis()) * 1_000_000)
		.unwrap_or(OffsetDateTime::UNIX_EPOCH)
}
