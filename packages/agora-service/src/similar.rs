//! Reconciliation of flat nearest-neighbor hits into thread-level results.
//!
//! Hits arrive as bare message ids ranked by similarity. A hit may be a
//! thread or a reply; replies are folded into their parent thread so the
//! caller only ever sees thread objects.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{AgoraService, Result};

/// One ranked nearest-neighbor hit, request-scoped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityHit {
	pub id: String,
	pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildMatch {
	pub id: String,
	pub similarity_score: f64,
}

/// Thread-level result shape. A thread either matched directly or was
/// synthesized from reply hits, in which case `similar_messages` carries
/// the replies that pulled it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
	pub id: String,
	pub title: String,
	pub similarity_score: f64,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub similar_messages: Vec<ChildMatch>,
}

impl AgoraService {
	/// Nearest neighbors of an already-embedded message, folded into
	/// thread results. `limit` defaults to the configured value.
	pub async fn find_similar_to_document(
		&self,
		id: &str,
		limit: Option<u32>,
	) -> Result<Vec<AggregatedResult>> {
		let limit = limit.unwrap_or(self.cfg.views.similar_limit);
		let hits = self.relational.similar_to_document(id, limit as i64).await;

		self.aggregate_similar(&hits).await
	}

	/// Embeds a free-text query and folds its nearest neighbors into
	/// thread results.
	pub async fn find_similar_to_query(
		&self,
		query: &str,
		limit: Option<u32>,
	) -> Result<Vec<AggregatedResult>> {
		let limit = limit.unwrap_or(self.cfg.views.similar_limit);
		let vectors =
			self.providers.embedding.embed(&self.cfg.providers.embedding, &[query.to_owned()]).await?;
		let Some(vector) = vectors.first() else {
			return Ok(Vec::new());
		};
		let hits = self.relational.similar_to_vector(vector, limit as i64).await;

		self.aggregate_similar(&hits).await
	}

	/// Merges ranked hits with the document hierarchy.
	///
	/// `(id, title)` is the uniqueness key throughout; id alone is not
	/// enough because parents and replies can share an id convention.
	/// Directly matched threads come first in rank order; threads
	/// synthesized from reply buckets are appended in the order their
	/// bucket was first populated.
	pub async fn aggregate_similar(&self, hits: &[SimilarityHit]) -> Result<Vec<AggregatedResult>> {
		let mut seen = HashSet::new();
		let mut results = Vec::new();
		// Insertion-ordered buckets of reply matches keyed by thread id.
		let mut buckets: Vec<(String, Vec<ChildMatch>)> = Vec::new();

		for hit in hits {
			let Some(document) = self.documents.find_by_id(&hit.id).await else {
				continue;
			};

			if !seen.insert((document.id.clone(), document.title.clone())) {
				continue;
			}

			if !document.title.is_empty() {
				results.push(AggregatedResult {
					id: document.id,
					title: document.title,
					similarity_score: hit.score,
					similar_messages: Vec::new(),
				});

				continue;
			}

			let Some(thread_id) = document.thread_id else {
				continue;
			};
			let child = ChildMatch { id: document.id, similarity_score: hit.score };

			match buckets.iter_mut().find(|(id, _)| *id == thread_id) {
				Some((_, children)) => children.push(child),
				None => buckets.push((thread_id, vec![child])),
			}
		}

		for (thread_id, children) in buckets {
			let Some(thread) = self.documents.find_by_id(&thread_id).await else {
				warn!(thread_id, "parent thread missing from document store");

				continue;
			};
			// The first reply's stored similarity to the thread stands in
			// for the whole bucket.
			let first = &children[0];
			let similarity_score = match self.relational.similarity_between(&thread.id, &first.id).await
			{
				Some(score) => score,
				None => {
					warn!(
						thread_id = thread.id,
						child_id = first.id,
						"no stored similarity between thread and reply; using the reply's own score"
					);

					first.similarity_score
				},
			};

			if seen.insert((thread.id.clone(), thread.title.clone())) {
				results.push(AggregatedResult {
					id: thread.id,
					title: thread.title,
					similarity_score,
					similar_messages: children,
				});
			} else if let Some(existing) =
				results.iter_mut().find(|entry| entry.id == thread.id && entry.title == thread.title)
			{
				// The thread also matched directly; fold the replies into
				// that entry rather than emitting a duplicate.
				existing.similarity_score = similarity_score;
				existing.similar_messages = children;
			}
		}

		Ok(results)
	}
}
