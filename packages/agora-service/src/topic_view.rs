//! Topic view: the lazily cached partition of forum threads into topics.
//!
//! The view is expensive to build (embedding plus two partition calls), so
//! it is served from an in-memory slot, hydrated from the persisted tables
//! when they exist, and recomputed only on first use or forced reload.

use std::{
	collections::{HashMap, HashSet},
	sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::info;

use agora_domain::{features, presentation, stats};
use agora_storage::models::{TopicAssignment, TopicRecord};

use crate::{AgoraService, Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicStats {
	pub total_topics: usize,
	pub total_messages: i64,
	pub mean_messages_per_topic: f64,
	pub median_messages_per_topic: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicDetails {
	pub name: String,
	pub keywords: Vec<String>,
	pub count: i64,
	pub messages: Vec<String>,
}

/// Fully materialized topic view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicView {
	pub stats: TopicStats,
	pub topics: Vec<TopicRecord>,
	/// Keywords per topic, without the unassigned bucket.
	pub keywords: HashMap<i32, Vec<String>>,
	pub details: HashMap<i32, TopicDetails>,
}

/// One thread with its precomputed embedding, after the join between the
/// relational and document stores.
struct TopicRow {
	id: String,
	vector: Vec<f32>,
	title: String,
	category: String,
	body: String,
}

impl AgoraService {
	pub async fn topics(&self) -> Result<Arc<TopicView>> {
		self.reload_topics(false).await
	}

	pub async fn force_reload_topics(&self) -> Result<Arc<TopicView>> {
		self.reload_topics(true).await
	}

	pub async fn topic_stats(&self) -> Result<TopicStats> {
		Ok(self.topics().await?.stats.clone())
	}

	pub async fn topics_table(&self) -> Result<Vec<TopicRecord>> {
		Ok(self.topics().await?.topics.clone())
	}

	/// Unknown topic ids resolve to `None` rather than an error.
	pub async fn topic_details(&self, topic_id: i32) -> Result<Option<TopicDetails>> {
		Ok(self.topics().await?.details.get(&topic_id).cloned())
	}

	/// Single-flight reload. A non-forced call on a loaded slot returns the
	/// cached value untouched. A forced caller that queued behind another
	/// completed recompute adopts that result instead of running the
	/// pipeline again; a hydrate from the persisted tables does not count
	/// as a recompute, so a queued forced caller still runs the pipeline.
	async fn reload_topics(&self, force: bool) -> Result<Arc<TopicView>> {
		let observed = self.topic_cache.generation();
		let mut slot = self.topic_cache.lock().await;

		if let Some(view) = slot.as_ref() {
			if !force || self.topic_cache.generation() != observed {
				return Ok(view.clone());
			}
		}

		match self.load_or_compute_topics(force).await {
			Ok((view, recomputed)) => {
				let view = Arc::new(view);

				*slot = Some(view.clone());

				if recomputed {
					self.topic_cache.bump();
				}

				Ok(view)
			},
			Err(err) => {
				// The persisted tables keep their previous content; the next
				// read retries the whole reload.
				*slot = None;

				Err(err)
			},
		}
	}

	/// The boolean reports whether the pipeline ran, as opposed to a
	/// hydrate of previously persisted output.
	async fn load_or_compute_topics(&self, force: bool) -> Result<(TopicView, bool)> {
		if !force && self.relational.topic_tables_exist().await {
			let records = self.relational.load_topic_records().await;

			if !records.is_empty() {
				info!(topics = records.len(), "hydrating topic view from the persisted tables");

				let assignments = self.relational.load_topic_assignments().await;
				let bodies = self.documents.thread_bodies().await;

				return Ok((assemble_view(records, &assignments, &bodies), false));
			}
		}

		Ok((self.compute_topic_view().await?, true))
	}

	async fn compute_topic_view(&self) -> Result<TopicView> {
		let rows = self.load_topic_rows().await?;

		info!(threads = rows.len(), "recomputing topic view");

		let rows = self.exclude_presentations(rows).await?;
		let bodies = rows.iter().map(|row| row.body.clone()).collect::<Vec<_>>();
		let vectors = rows.iter().map(|row| row.vector.clone()).collect::<Vec<_>>();
		let outcome =
			self.providers.partition.partition(&self.cfg.providers.partition, &bodies, &vectors, None).await?;
		let assignments = rows
			.iter()
			.zip(&outcome.labels)
			.map(|(row, &label)| TopicAssignment { message_id: row.id.clone(), topic_id: label })
			.collect::<Vec<_>>();
		let records = build_topic_records(&outcome.groups, &assignments);

		self.relational.replace_topic_view(&records, &assignments).await?;

		let bodies_by_id =
			rows.into_iter().map(|row| (row.id, row.body)).collect::<HashMap<_, _>>();

		Ok(assemble_view(records, &assignments, &bodies_by_id))
	}

	/// Joins stored embeddings with thread documents and applies the
	/// title/body filter.
	async fn load_topic_rows(&self) -> Result<Vec<TopicRow>> {
		let embeddings = self.relational.load_embeddings().await;

		if embeddings.is_empty() {
			return Err(Error::IncompleteData {
				message: "No embeddings are available in the relational store.".into(),
			});
		}

		let threads = self
			.documents
			.list_threads()
			.await
			.into_iter()
			.map(|doc| (doc.id.clone(), doc))
			.collect::<HashMap<_, _>>();
		let rows = embeddings
			.into_iter()
			.filter_map(|embedding| {
				let doc = threads.get(&embedding.id)?;

				Some(TopicRow {
					id: embedding.id,
					vector: embedding.vector,
					title: doc.title.clone(),
					category: doc.category.clone(),
					body: doc.body.clone(),
				})
			})
			.filter(|row| !row.title.is_empty() && !row.body.is_empty())
			.collect::<Vec<_>>();

		if rows.is_empty() {
			return Err(Error::IncompleteData {
				message: "No thread has both a non-empty title and a non-empty body.".into(),
			});
		}

		Ok(rows)
	}

	/// Two-way split on title+category vectors over the rows that carry a
	/// category; the side labeled as presentation is dropped, rows without
	/// a category are kept unconditionally.
	async fn exclude_presentations(&self, rows: Vec<TopicRow>) -> Result<Vec<TopicRow>> {
		let categorized =
			rows.iter()
				.enumerate()
				.filter(|(_, row)| !row.category.is_empty())
				.map(|(index, _)| index)
				.collect::<Vec<_>>();

		if categorized.len() < 2 {
			return Ok(rows);
		}

		let titles =
			categorized.iter().map(|&index| rows[index].title.clone()).collect::<Vec<_>>();
		let categories =
			categorized.iter().map(|&index| rows[index].category.clone()).collect::<Vec<_>>();
		let title_vectors =
			self.providers.embedding.embed(&self.cfg.providers.embedding, &titles).await?;
		let category_vectors =
			self.providers.embedding.embed(&self.cfg.providers.embedding, &categories).await?;
		let mut matrix = features::hstack(&title_vectors, &category_vectors);

		features::standard_scale(&mut matrix);

		let outcome = self
			.providers
			.partition
			.partition(&self.cfg.providers.partition, &titles, &matrix, Some(2))
			.await?;
		let excluded = categorized
			.iter()
			.zip(&outcome.labels)
			.filter(|&(_, &label)| presentation::is_presentation(label))
			.map(|(&index, _)| index)
			.collect::<HashSet<_>>();

		info!(presentations = excluded.len(), "excluding presentation threads");

		Ok(rows
			.into_iter()
			.enumerate()
			.filter(|(index, _)| !excluded.contains(index))
			.map(|(_, row)| row)
			.collect())
	}
}

/// Topic records come from the partition's group metadata; any label that
/// shows up in the assignments without metadata still gets a bare record so
/// the foreign key holds.
fn build_topic_records(
	groups: &[agora_providers::partition::PartitionGroup],
	assignments: &[TopicAssignment],
) -> Vec<TopicRecord> {
	let mut records = groups
		.iter()
		.map(|group| TopicRecord {
			topic_id: group.label,
			name: group.name.clone(),
			keywords: group.keywords.clone(),
			message_count: group.size,
		})
		.collect::<Vec<_>>();
	let known = records.iter().map(|record| record.topic_id).collect::<HashSet<_>>();
	let mut missing = HashMap::<i32, i64>::new();

	for assignment in assignments {
		if !known.contains(&assignment.topic_id) {
			*missing.entry(assignment.topic_id).or_default() += 1;
		}
	}

	for (topic_id, message_count) in missing {
		records.push(TopicRecord {
			topic_id,
			name: topic_id.to_string(),
			keywords: Vec::new(),
			message_count,
		});
	}

	records.sort_by_key(|record| record.topic_id);

	records
}

fn assemble_view(
	records: Vec<TopicRecord>,
	assignments: &[TopicAssignment],
	bodies: &HashMap<String, String>,
) -> TopicView {
	let counts = records.iter().map(|record| record.message_count).collect::<Vec<_>>();
	let stats = TopicStats {
		total_topics: records.len(),
		total_messages: counts.iter().sum(),
		mean_messages_per_topic: stats::mean(&counts),
		median_messages_per_topic: stats::median(&counts),
	};
	let keywords = records
		.iter()
		.filter(|record| record.topic_id != -1)
		.map(|record| (record.topic_id, record.keywords.clone()))
		.collect::<HashMap<_, _>>();
	let mut messages_by_topic = HashMap::<i32, Vec<String>>::new();

	for assignment in assignments {
		// A body missing from the document store still occupies a slot, so
		// preview lengths stay aligned with the assignment count.
		let body = bodies.get(&assignment.message_id).cloned().unwrap_or_default();

		messages_by_topic.entry(assignment.topic_id).or_default().push(body);
	}

	let details = records
		.iter()
		.map(|record| {
			(record.topic_id, TopicDetails {
				name: record.name.clone(),
				keywords: record.keywords.clone(),
				count: record.message_count,
				messages: messages_by_topic.remove(&record.topic_id).unwrap_or_default(),
			})
		})
		.collect::<HashMap<_, _>>();

	TopicView { stats, topics: records, keywords, details }
}
