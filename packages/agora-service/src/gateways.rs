//! Gateway impls over the real stores.
//!
//! Reads soften connection failures to empty results here, with a warning;
//! the caller sees "view unavailable", never an error. Writes propagate so
//! a broken recompute aborts before it can half-persist anything.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::warn;

use agora_storage::{
	db::Db,
	docstore::DocStore,
	models::{
		ClusterSummary, ForumDocument, ParticipantAssignment, StoredEmbedding, TopicAssignment,
		TopicRecord,
	},
	queries,
};

use crate::{DocumentGateway, RelationalGateway, Result, similar::SimilarityHit};

#[async_trait]
impl RelationalGateway for Db {
	async fn load_embeddings(&self) -> Vec<StoredEmbedding> {
		match queries::load_embeddings(self).await {
			Ok(embeddings) => embeddings,
			Err(err) => {
				warn!(error = %err, "failed to load embeddings");

				Vec::new()
			},
		}
	}

	async fn similarity_between(&self, first: &str, second: &str) -> Option<f64> {
		match queries::similarity_between(self, first, second).await {
			Ok(similarity) => similarity,
			Err(err) => {
				warn!(error = %err, first, second, "failed to query stored similarity");

				None
			},
		}
	}

	async fn similar_to_document(&self, id: &str, limit: i64) -> Vec<SimilarityHit> {
		match queries::similar_to_document(self, id, limit).await {
			Ok(rows) =>
				rows.into_iter().map(|(id, score)| SimilarityHit { id, score }).collect(),
			Err(err) => {
				warn!(error = %err, id, "nearest-neighbor query failed");

				Vec::new()
			},
		}
	}

	async fn similar_to_vector(&self, vector: &[f32], limit: i64) -> Vec<SimilarityHit> {
		match queries::similar_to_vector(self, vector, limit).await {
			Ok(rows) =>
				rows.into_iter().map(|(id, score)| SimilarityHit { id, score }).collect(),
			Err(err) => {
				warn!(error = %err, "nearest-neighbor query failed");

				Vec::new()
			},
		}
	}

	async fn topic_tables_exist(&self) -> bool {
		match self.table_exists("topic_messages").await {
			Ok(exists) => exists,
			Err(err) => {
				warn!(error = %err, "table-existence check failed");

				false
			},
		}
	}

	async fn replace_topic_view(
		&self,
		records: &[TopicRecord],
		assignments: &[TopicAssignment],
	) -> Result<()> {
		Ok(queries::replace_topic_view(self, records, assignments).await?)
	}

	async fn load_topic_records(&self) -> Vec<TopicRecord> {
		match queries::load_topic_records(self).await {
			Ok(records) => records,
			Err(err) => {
				warn!(error = %err, "failed to load topic records");

				Vec::new()
			},
		}
	}

	async fn load_topic_assignments(&self) -> Vec<TopicAssignment> {
		match queries::load_topic_assignments(self).await {
			Ok(assignments) => assignments,
			Err(err) => {
				warn!(error = %err, "failed to load topic assignments");

				Vec::new()
			},
		}
	}

	async fn replace_participant_view(
		&self,
		assignments: &[ParticipantAssignment],
		summaries: &[ClusterSummary],
	) -> Result<()> {
		Ok(queries::replace_participant_view(self, assignments, summaries).await?)
	}

	async fn load_participant_assignments(&self) -> Vec<ParticipantAssignment> {
		match queries::load_participant_assignments(self).await {
			Ok(assignments) => assignments,
			Err(err) => {
				warn!(error = %err, "failed to load participant assignments");

				Vec::new()
			},
		}
	}
}

#[async_trait]
impl DocumentGateway for DocStore {
	async fn find_by_id(&self, id: &str) -> Option<ForumDocument> {
		match DocStore::find_by_id(self, id).await {
			Ok(document) => document,
			Err(err) => {
				warn!(error = %err, id, "document lookup failed");

				None
			},
		}
	}

	async fn list_threads(&self) -> Vec<ForumDocument> {
		match DocStore::list_threads(self).await {
			Ok(documents) => documents,
			Err(err) => {
				warn!(error = %err, "thread listing failed");

				Vec::new()
			},
		}
	}

	async fn thread_bodies(&self) -> HashMap<String, String> {
		match DocStore::thread_bodies(self).await {
			Ok(bodies) => bodies,
			Err(err) => {
				warn!(error = %err, "thread body projection failed");

				HashMap::new()
			},
		}
	}
}
