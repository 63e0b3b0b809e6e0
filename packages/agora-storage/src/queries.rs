use sqlx::Row;

use crate::{
	Result,
	db::Db,
	models::{
		ClusterSummary, ParticipantAssignment, StoredEmbedding, TopicAssignment, TopicRecord,
		join_keywords, split_keywords,
	},
	vector::{parse_pg_vector, vector_to_pg},
};

pub async fn load_embeddings(db: &Db) -> Result<Vec<StoredEmbedding>> {
	let rows: Vec<(String, String, Option<String>)> =
		sqlx::query_as("SELECT id, vector::text, thread_id FROM embedding")
			.fetch_all(&db.pool)
			.await?;

	rows.into_iter()
		.map(|(id, vector, thread_id)| {
			Ok(StoredEmbedding { id, vector: parse_pg_vector(&vector)?, thread_id })
		})
		.collect()
}

/// Stored cosine similarity between two embedded messages, straight from the
/// pgvector distance operator.
pub async fn similarity_between(db: &Db, first: &str, second: &str) -> Result<Option<f64>> {
	let similarity: Option<f64> = sqlx::query_scalar(
		"\
SELECT 1 - (vector <=> (SELECT vector FROM embedding e2 WHERE id = $1)) AS similarity
FROM embedding e
WHERE id = $2",
	)
	.bind(second)
	.bind(first)
	.fetch_optional(&db.pool)
	.await?;

	Ok(similarity)
}

pub async fn similar_to_document(db: &Db, id: &str, limit: i64) -> Result<Vec<(String, f64)>> {
	let rows: Vec<(String, f64)> = sqlx::query_as(
		"\
SELECT id, 1 - (vector <=> (SELECT vector FROM embedding e2 WHERE id = $1)) AS similarity
FROM embedding e
WHERE id != $1
ORDER BY similarity DESC
LIMIT $2",
	)
	.bind(id)
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn similar_to_vector(db: &Db, vector: &[f32], limit: i64) -> Result<Vec<(String, f64)>> {
	let rows: Vec<(String, f64)> = sqlx::query_as(
		"\
SELECT id, 1 - (vector <=> $1::vector) AS similarity
FROM embedding e
ORDER BY similarity DESC
LIMIT $2",
	)
	.bind(vector_to_pg(vector))
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Truncate-and-reinsert of both topic tables in one transaction; a failed
/// recompute leaves the previous persisted view intact.
pub async fn replace_topic_view(
	db: &Db,
	records: &[TopicRecord],
	assignments: &[TopicAssignment],
) -> Result<()> {
	let mut tx = db.pool.begin().await?;

	sqlx::query("DELETE FROM topic_messages").execute(&mut *tx).await?;
	sqlx::query("DELETE FROM topic_info").execute(&mut *tx).await?;

	for record in records {
		sqlx::query(
			"\
INSERT INTO topic_info (topic_id, topic_name, topic_keywords, count)
VALUES ($1, $2, $3, $4)",
		)
		.bind(record.topic_id)
		.bind(&record.name)
		.bind(join_keywords(&record.keywords))
		.bind(record.message_count as i32)
		.execute(&mut *tx)
		.await?;
	}

	for assignment in assignments {
		sqlx::query("INSERT INTO topic_messages (id, topic_id) VALUES ($1, $2)")
			.bind(&assignment.message_id)
			.bind(assignment.topic_id)
			.execute(&mut *tx)
			.await?;
	}

	tx.commit().await?;

	Ok(())
}

pub async fn load_topic_records(db: &Db) -> Result<Vec<TopicRecord>> {
	let rows: Vec<(i32, String, String, i32)> =
		sqlx::query_as("SELECT topic_id, topic_name, topic_keywords, count FROM topic_info")
			.fetch_all(&db.pool)
			.await?;

	Ok(rows
		.into_iter()
		.map(|(topic_id, name, keywords, message_count)| TopicRecord {
			topic_id,
			name,
			keywords: split_keywords(&keywords),
			message_count: message_count as i64,
		})
		.collect())
}

pub async fn load_topic_assignments(db: &Db) -> Result<Vec<TopicAssignment>> {
	let rows: Vec<(String, i32)> =
		sqlx::query_as("SELECT id, topic_id FROM topic_messages").fetch_all(&db.pool).await?;

	Ok(rows.into_iter().map(|(message_id, topic_id)| TopicAssignment { message_id, topic_id }).collect())
}

pub async fn replace_participant_view(
	db: &Db,
	assignments: &[ParticipantAssignment],
	summaries: &[ClusterSummary],
) -> Result<()> {
	let mut tx = db.pool.begin().await?;

	sqlx::query("DELETE FROM participant_clusters").execute(&mut *tx).await?;
	sqlx::query("DELETE FROM participant_cluster_info").execute(&mut *tx).await?;

	for assignment in assignments {
		sqlx::query(
			"\
INSERT INTO participant_clusters (
	user_id, cluster, engagement_score, nb_messages, nb_votes, nb_commentaires, cours, vector
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
		)
		.bind(&assignment.user_id)
		.bind(assignment.cluster_id)
		.bind(assignment.engagement_score)
		.bind(assignment.message_count as i32)
		.bind(assignment.vote_count as i32)
		.bind(assignment.comment_count as i32)
		.bind(assignment.course_ids.join(","))
		.bind(&assignment.feature_vector)
		.execute(&mut *tx)
		.await?;
	}

	for summary in summaries {
		sqlx::query(
			"\
INSERT INTO participant_cluster_info (
	cluster, nb_utilisateurs, engagement_score, nb_messages, nb_votes, nb_commentaires
)
VALUES ($1, $2, $3, $4, $5, $6)",
		)
		.bind(summary.cluster_id)
		.bind(summary.member_count as i32)
		.bind(summary.mean_engagement_score)
		.bind(summary.mean_message_count)
		.bind(summary.mean_vote_count)
		.bind(summary.mean_comment_count)
		.execute(&mut *tx)
		.await?;
	}

	tx.commit().await?;

	Ok(())
}

pub async fn load_participant_assignments(db: &Db) -> Result<Vec<ParticipantAssignment>> {
	let rows = sqlx::query(
		"\
SELECT user_id, cluster, engagement_score, nb_messages, nb_votes, nb_commentaires, cours, vector
FROM participant_clusters",
	)
	.fetch_all(&db.pool)
	.await?;

	rows.into_iter()
		.map(|row| {
			let cours: String = row.try_get("cours")?;

			Ok(ParticipantAssignment {
				user_id: row.try_get("user_id")?,
				cluster_id: row.try_get("cluster")?,
				engagement_score: row.try_get("engagement_score")?,
				message_count: row.try_get::<i32, _>("nb_messages")? as i64,
				vote_count: row.try_get::<i32, _>("nb_votes")? as i64,
				comment_count: row.try_get::<i32, _>("nb_commentaires")? as i64,
				course_ids: cours
					.split(',')
					.filter(|part| !part.is_empty())
					.map(String::from)
					.collect(),
				feature_vector: row.try_get("vector")?,
			})
		})
		.collect()
}
