use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub views: Views,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub mongo: Mongo,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
	/// Dimension of the pgvector column on the `embedding` table.
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Mongo {
	pub url: String,
	pub database: String,
	#[serde(default = "default_threads_collection")]
	pub threads_collection: String,
	#[serde(default = "default_documents_collection")]
	pub documents_collection: String,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub partition: PartitionProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct PartitionProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Views {
	/// Default number of behavioral clusters for the participant view.
	#[serde(default = "default_participant_clusters")]
	pub participant_cluster_count: u32,
	/// Default result count for nearest-neighbor searches.
	#[serde(default = "default_similar_limit")]
	pub similar_limit: u32,
}

impl Default for Views {
	fn default() -> Self {
		Self {
			participant_cluster_count: default_participant_clusters(),
			similar_limit: default_similar_limit(),
		}
	}
}

fn default_threads_collection() -> String {
	"threads".to_string()
}

fn default_documents_collection() -> String {
	"documents".to_string()
}

fn default_participant_clusters() -> u32 {
	5
}

fn default_similar_limit() -> u32 {
	5
}
