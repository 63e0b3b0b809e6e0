use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// Outcome of one unsupervised partitioning call: a label per input item,
/// plus per-group metadata. Label -1 denotes unassigned/noise.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PartitionOutcome {
	pub labels: Vec<i32>,
	pub groups: Vec<PartitionGroup>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PartitionGroup {
	pub label: i32,
	pub name: String,
	pub keywords: Vec<String>,
	pub size: i64,
}

/// Groups `items` (one per `vectors` row) into `k` clusters, or lets the
/// model pick the cluster count when `k` is absent.
pub async fn partition(
	cfg: &agora_config::PartitionProviderConfig,
	items: &[String],
	vectors: &[Vec<f32>],
	k: Option<u32>,
) -> Result<PartitionOutcome> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"items": items,
		"vectors": vectors,
		"k": k,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_partition_response(json, items.len())
}

fn parse_partition_response(json: Value, item_count: usize) -> Result<PartitionOutcome> {
	let labels = json
		.get("labels")
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Partition response is missing labels array."))?
		.iter()
		.map(|value| {
			value
				.as_i64()
				.map(|label| label as i32)
				.ok_or_else(|| eyre::eyre!("Partition label must be an integer."))
		})
		.collect::<Result<Vec<i32>>>()?;

	if labels.len() != item_count {
		return Err(eyre::eyre!(
			"Partition response returned {} labels for {item_count} items.",
			labels.len()
		));
	}

	let groups = match json.get("groups") {
		Some(value) => serde_json::from_value(value.clone())
			.map_err(|err| eyre::eyre!("Partition groups are malformed: {err}."))?,
		None => Vec::new(),
	};

	Ok(PartitionOutcome { labels, groups })
}
