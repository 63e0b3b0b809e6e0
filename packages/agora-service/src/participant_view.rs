//! Participant view: behavioral clustering of forum users.
//!
//! Per-user engagement statistics and mean message embeddings are combined
//! into one feature matrix, partitioned into `k` clusters, and persisted.
//! Unlike the topic view this view has no in-memory layer; reads go to the
//! persisted table and a recompute gate keeps the rewrite single-flight.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use agora_domain::{engagement, features, similarity, stats};
use agora_storage::models::{ClusterSummary, ForumDocument, ParticipantAssignment};

use crate::{AgoraService, Error, Result};

/// Per-user aggregate over all of the user's documents. Rebuilt from the
/// source stores on every pipeline run, never persisted as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
	pub user_id: String,
	pub course_ids: Vec<String>,
	pub concatenated_body: String,
	pub concatenated_titles: String,
	pub vote_count: i64,
	pub comment_count: i64,
	pub message_count: i64,
	pub created_at_min: Option<OffsetDateTime>,
	pub updated_at_max: Option<OffsetDateTime>,
	pub engagement_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantView {
	pub assignments: Vec<ParticipantAssignment>,
	pub summaries: Vec<ClusterSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecommendation {
	pub user_id: String,
	pub cluster_id: i32,
	pub similarity: f64,
	pub engagement_score: f64,
	pub message_count: i64,
	pub vote_count: i64,
	pub comment_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseCount {
	pub course_id: String,
	pub user_count: i64,
}

impl AgoraService {
	/// Load-or-compute gate. A non-forced call serves the persisted
	/// assignments when they exist; a forced caller that queued behind
	/// another forced recompute adopts that run's output instead of
	/// rewriting the table again.
	pub async fn participant_view(&self, k: Option<u32>, force: bool) -> Result<ParticipantView> {
		let observed = self.participant_gate.generation();
		let _gate = self.participant_gate.lock().await;

		if !force || self.participant_gate.generation() != observed {
			let assignments = self.relational.load_participant_assignments().await;

			if !assignments.is_empty() {
				return Ok(ParticipantView { summaries: summarize(&assignments), assignments });
			}
		}

		let view = self.compute_participant_view(k).await?;

		self.participant_gate.bump();

		Ok(view)
	}

	/// Nearest neighbors of a user inside the user's own cluster, by cosine
	/// similarity over the persisted feature vectors. An unknown user gets
	/// an empty result, not an error.
	pub async fn recommend_similar_users(
		&self,
		user_id: &str,
		top_n: Option<u32>,
	) -> Result<Vec<UserRecommendation>> {
		let top_n = top_n.unwrap_or(self.cfg.views.similar_limit) as usize;
		let view = self.participant_view(None, false).await?;
		let Some(target) = view.assignments.iter().find(|a| a.user_id == user_id) else {
			return Ok(Vec::new());
		};
		let mut recommendations = view
			.assignments
			.iter()
			.filter(|candidate| {
				candidate.cluster_id == target.cluster_id && candidate.user_id != target.user_id
			})
			.map(|candidate| UserRecommendation {
				user_id: candidate.user_id.clone(),
				cluster_id: candidate.cluster_id,
				similarity: similarity::cosine(&target.feature_vector, &candidate.feature_vector)
					as f64,
				engagement_score: candidate.engagement_score,
				message_count: candidate.message_count,
				vote_count: candidate.vote_count,
				comment_count: candidate.comment_count,
			})
			.collect::<Vec<_>>();

		recommendations
			.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
		recommendations.truncate(top_n);

		Ok(recommendations)
	}

	/// Most-followed courses per cluster, by distinct member count.
	pub async fn top_courses(&self, top_n: Option<u32>) -> Result<HashMap<i32, Vec<CourseCount>>> {
		let top_n = top_n.unwrap_or(self.cfg.views.similar_limit) as usize;
		let view = self.participant_view(None, false).await?;
		let mut counts = HashMap::<i32, HashMap<String, i64>>::new();

		for assignment in &view.assignments {
			let cluster = counts.entry(assignment.cluster_id).or_default();

			for course_id in &assignment.course_ids {
				*cluster.entry(course_id.clone()).or_default() += 1;
			}
		}

		Ok(counts
			.into_iter()
			.map(|(cluster_id, by_course)| {
				let mut ranked = by_course
					.into_iter()
					.map(|(course_id, user_count)| CourseCount { course_id, user_count })
					.collect::<Vec<_>>();

				ranked.sort_by(|a, b| {
					b.user_count.cmp(&a.user_count).then_with(|| a.course_id.cmp(&b.course_id))
				});
				ranked.truncate(top_n);

				(cluster_id, ranked)
			})
			.collect())
	}

	async fn compute_participant_view(&self, k: Option<u32>) -> Result<ParticipantView> {
		let documents = self.documents.list_threads().await;

		if documents.is_empty() {
			return Err(Error::IncompleteData {
				message: "No documents are available to build participant profiles.".into(),
			});
		}

		let profiles = build_user_profiles(&documents);
		let user_embeddings = self.build_user_embeddings(&documents).await;
		// Users lacking either side of the join are dropped, not zero-filled.
		let cohort = profiles
			.into_values()
			.filter(|profile| user_embeddings.contains_key(&profile.user_id))
			.collect::<Vec<_>>();

		if cohort.is_empty() {
			return Err(Error::IncompleteData {
				message: "No user has both a profile and an embedding.".into(),
			});
		}

		info!(users = cohort.len(), "recomputing participant view");

		let embedding_rows = cohort
			.iter()
			.map(|profile| user_embeddings[&profile.user_id].clone())
			.collect::<Vec<_>>();
		let mut engagement_rows = cohort
			.iter()
			.map(|profile| {
				vec![
					profile.vote_count as f32,
					profile.comment_count as f32,
					profile.message_count as f32,
				]
			})
			.collect::<Vec<_>>();

		features::standard_scale(&mut engagement_rows);
		features::scale(&mut engagement_rows, features::ENGAGEMENT_FEATURE_WEIGHT);

		let matrix = features::hstack(&embedding_rows, &engagement_rows);
		let user_ids = cohort.iter().map(|profile| profile.user_id.clone()).collect::<Vec<_>>();
		let k = k.unwrap_or(self.cfg.views.participant_cluster_count);
		let outcome = self
			.providers
			.partition
			.partition(&self.cfg.providers.partition, &user_ids, &matrix, Some(k))
			.await?;
		let assignments = cohort
			.iter()
			.zip(&outcome.labels)
			.zip(&matrix)
			.map(|((profile, &label), feature_vector)| ParticipantAssignment {
				user_id: profile.user_id.clone(),
				cluster_id: label,
				engagement_score: profile.engagement_score,
				message_count: profile.message_count,
				vote_count: profile.vote_count,
				comment_count: profile.comment_count,
				course_ids: profile.course_ids.clone(),
				feature_vector: feature_vector.clone(),
			})
			.collect::<Vec<_>>();
		let summaries = summarize(&assignments);

		self.relational.replace_participant_view(&assignments, &summaries).await?;

		Ok(ParticipantView { assignments, summaries })
	}

	/// Maps each stored vector back to a user through its document or the
	/// document's parent thread, then averages per user.
	async fn build_user_embeddings(
		&self,
		documents: &[ForumDocument],
	) -> HashMap<String, Vec<f32>> {
		let users_by_document = documents
			.iter()
			.filter_map(|doc| Some((doc.id.clone(), doc.user_id.clone()?)))
			.collect::<HashMap<_, _>>();
		let mut vectors_by_user = HashMap::<String, Vec<Vec<f32>>>::new();

		for embedding in self.relational.load_embeddings().await {
			let owner = users_by_document
				.get(&embedding.id)
				.or_else(|| embedding.thread_id.as_ref().and_then(|id| users_by_document.get(id)));

			if let Some(user_id) = owner {
				vectors_by_user.entry(user_id.clone()).or_default().push(embedding.vector);
			}
		}

		vectors_by_user
			.into_iter()
			.filter_map(|(user_id, vectors)| Some((user_id, features::mean_vector(&vectors)?)))
			.collect()
	}
}

/// Groups documents by user. `BTreeMap` keeps the cohort ordering
/// deterministic across runs.
fn build_user_profiles(documents: &[ForumDocument]) -> BTreeMap<String, UserProfile> {
	let mut profiles = BTreeMap::<String, UserProfile>::new();

	for doc in documents {
		let Some(user_id) = &doc.user_id else {
			continue;
		};
		let profile = profiles.entry(user_id.clone()).or_insert_with(|| UserProfile {
			user_id: user_id.clone(),
			course_ids: Vec::new(),
			concatenated_body: String::new(),
			concatenated_titles: String::new(),
			vote_count: 0,
			comment_count: 0,
			message_count: 0,
			created_at_min: None,
			updated_at_max: None,
			engagement_score: 0.,
		});

		if let Some(course_id) = &doc.course_id {
			if !profile.course_ids.contains(course_id) {
				profile.course_ids.push(course_id.clone());
			}
		}
		if !doc.body.is_empty() {
			if !profile.concatenated_body.is_empty() {
				profile.concatenated_body.push(' ');
			}

			profile.concatenated_body.push_str(&doc.body);
		}
		if !doc.title.is_empty() {
			if !profile.concatenated_titles.is_empty() {
				profile.concatenated_titles.push(' ');
			}

			profile.concatenated_titles.push_str(&doc.title);
		}

		profile.vote_count += doc.votes;
		profile.comment_count += doc.comment_count;
		profile.message_count += 1;
		profile.created_at_min = match (profile.created_at_min, doc.created_at) {
			(Some(current), Some(new)) => Some(current.min(new)),
			(current, new) => current.or(new),
		};
		profile.updated_at_max = match (profile.updated_at_max, doc.updated_at) {
			(Some(current), Some(new)) => Some(current.max(new)),
			(current, new) => current.or(new),
		};
	}

	for profile in profiles.values_mut() {
		profile.course_ids.sort();
		profile.engagement_score = engagement::engagement_score(
			profile.vote_count,
			profile.comment_count,
			profile.message_count,
		);
	}

	profiles
}

fn summarize(assignments: &[ParticipantAssignment]) -> Vec<ClusterSummary> {
	let mut by_cluster = BTreeMap::<i32, Vec<&ParticipantAssignment>>::new();

	for assignment in assignments {
		by_cluster.entry(assignment.cluster_id).or_default().push(assignment);
	}

	by_cluster
		.into_iter()
		.map(|(cluster_id, members)| {
			let scores = members.iter().map(|m| m.engagement_score).collect::<Vec<_>>();
			let messages = members.iter().map(|m| m.message_count).collect::<Vec<_>>();
			let votes = members.iter().map(|m| m.vote_count).collect::<Vec<_>>();
			let comments = members.iter().map(|m| m.comment_count).collect::<Vec<_>>();

			ClusterSummary {
				cluster_id,
				member_count: members.len() as i64,
				mean_engagement_score: stats::mean_f64(&scores),
				mean_message_count: stats::mean(&messages),
				mean_vote_count: stats::mean(&votes),
				mean_comment_count: stats::mean(&comments),
			}
		})
		.collect()
}
