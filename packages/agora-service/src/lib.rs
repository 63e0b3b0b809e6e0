pub mod cache;
pub mod participant_view;
pub mod similar;
pub mod topic_view;

mod error;
mod gateways;

pub use error::{Error, Result};
pub use participant_view::{ParticipantView, UserProfile, UserRecommendation};
pub use similar::{AggregatedResult, ChildMatch, SimilarityHit};
pub use topic_view::{TopicDetails, TopicStats, TopicView};

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use async_trait::async_trait;

use agora_config::{Config, EmbeddingProviderConfig, PartitionProviderConfig};
use agora_providers::{embedding, partition, partition::PartitionOutcome};
use agora_storage::{
	db::Db,
	docstore::DocStore,
	models::{
		ClusterSummary, ForumDocument, ParticipantAssignment, StoredEmbedding, TopicAssignment,
		TopicRecord,
	},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// `Embed(text) -> vector`, delegated to an external capability.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

/// `Partition(items, vectors, k?) -> assignment`, delegated to an external
/// capability. `k` fixed for behavioral clustering, model-selected for
/// topic assignment.
pub trait PartitionProvider
where
	Self: Send + Sync,
{
	fn partition<'a>(
		&'a self,
		cfg: &'a PartitionProviderConfig,
		items: &'a [String],
		vectors: &'a [Vec<f32>],
		k: Option<u32>,
	) -> BoxFuture<'a, color_eyre::Result<PartitionOutcome>>;
}

/// Read/write seam over the relational backing store. Reads soften
/// connection failures to empty results at this boundary (the caller treats
/// an empty load as "view unavailable", not "view empty"); writes propagate
/// errors so a failed recompute aborts loudly.
#[async_trait]
pub trait RelationalGateway
where
	Self: Send + Sync,
{
	async fn load_embeddings(&self) -> Vec<StoredEmbedding>;
	async fn similarity_between(&self, first: &str, second: &str) -> Option<f64>;
	async fn similar_to_document(&self, id: &str, limit: i64) -> Vec<SimilarityHit>;
	async fn similar_to_vector(&self, vector: &[f32], limit: i64) -> Vec<SimilarityHit>;
	async fn topic_tables_exist(&self) -> bool;
	async fn replace_topic_view(
		&self,
		records: &[TopicRecord],
		assignments: &[TopicAssignment],
	) -> Result<()>;
	async fn load_topic_records(&self) -> Vec<TopicRecord>;
	async fn load_topic_assignments(&self) -> Vec<TopicAssignment>;
	async fn replace_participant_view(
		&self,
		assignments: &[ParticipantAssignment],
		summaries: &[ClusterSummary],
	) -> Result<()>;
	async fn load_participant_assignments(&self) -> Vec<ParticipantAssignment>;
}

/// Read seam over the document store, same softening contract as
/// [`RelationalGateway`].
#[async_trait]
pub trait DocumentGateway
where
	Self: Send + Sync,
{
	async fn find_by_id(&self, id: &str) -> Option<ForumDocument>;
	async fn list_threads(&self) -> Vec<ForumDocument>;
	async fn thread_bodies(&self) -> HashMap<String, String>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub partition: Arc<dyn PartitionProvider>,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl PartitionProvider for DefaultProviders {
	fn partition<'a>(
		&'a self,
		cfg: &'a PartitionProviderConfig,
		items: &'a [String],
		vectors: &'a [Vec<f32>],
		k: Option<u32>,
	) -> BoxFuture<'a, color_eyre::Result<PartitionOutcome>> {
		Box::pin(partition::partition(cfg, items, vectors, k))
	}
}

impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, partition: Arc<dyn PartitionProvider>) -> Self {
		Self { embedding, partition }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), partition: provider }
	}
}

/// Owns the derived-view contract: the gateways, the external capabilities,
/// and one single-flight guard per derived view. Constructed once at
/// startup and shared; no ambient global.
pub struct AgoraService {
	pub cfg: Config,
	pub relational: Arc<dyn RelationalGateway>,
	pub documents: Arc<dyn DocumentGateway>,
	pub providers: Providers,
	pub(crate) topic_cache: cache::ViewSlot<TopicView>,
	pub(crate) participant_gate: cache::RecomputeGate,
}

impl AgoraService {
	pub fn new(cfg: Config, db: Db, docs: DocStore) -> Self {
		Self::with_parts(cfg, Arc::new(db), Arc::new(docs), Providers::default())
	}

	pub fn with_parts(
		cfg: Config,
		relational: Arc<dyn RelationalGateway>,
		documents: Arc<dyn DocumentGateway>,
		providers: Providers,
	) -> Self {
		Self {
			cfg,
			relational,
			documents,
			providers,
			topic_cache: cache::ViewSlot::new(),
			participant_gate: cache::RecomputeGate::new(),
		}
	}
}
