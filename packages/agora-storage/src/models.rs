use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One row of the `embedding` table; the pgvector column is read back as
/// text and parsed.
#[derive(Debug, Clone)]
pub struct StoredEmbedding {
	pub id: String,
	pub vector: Vec<f32>,
	pub thread_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
	pub topic_id: i32,
	pub name: String,
	pub keywords: Vec<String>,
	pub message_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicAssignment {
	pub message_id: String,
	pub topic_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantAssignment {
	pub user_id: String,
	pub cluster_id: i32,
	pub engagement_score: f64,
	pub message_count: i64,
	pub vote_count: i64,
	pub comment_count: i64,
	pub course_ids: Vec<String>,
	/// The exact vector the user was clustered with, persisted so similarity
	/// queries reproduce the clustering space bit-for-bit.
	pub feature_vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
	pub cluster_id: i32,
	pub member_count: i64,
	pub mean_engagement_score: f64,
	pub mean_message_count: f64,
	pub mean_vote_count: f64,
	pub mean_comment_count: f64,
}

/// Denormalized document-store record. `title` is empty for replies;
/// `thread_id` is set only on replies; `category` is the courseware title.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForumDocument {
	pub id: String,
	pub thread_id: Option<String>,
	pub user_id: Option<String>,
	pub course_id: Option<String>,
	pub title: String,
	pub category: String,
	pub body: String,
	pub votes: i64,
	pub comment_count: i64,
	pub created_at: Option<OffsetDateTime>,
	pub updated_at: Option<OffsetDateTime>,
}

pub const KEYWORD_SEPARATOR: &str = ", ";

pub fn join_keywords(keywords: &[String]) -> String {
	keywords.join(KEYWORD_SEPARATOR)
}

pub fn split_keywords(raw: &str) -> Vec<String> {
	raw.split(',').map(str::trim).filter(|part| !part.is_empty()).map(String::from).collect()
}
