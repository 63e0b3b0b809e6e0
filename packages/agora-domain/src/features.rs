//! Feature-matrix construction for the partitioning capabilities.

/// Downweights the standardized engagement block relative to the semantic
/// embedding when both are stacked into one feature matrix.
pub const ENGAGEMENT_FEATURE_WEIGHT: f32 = 0.5;

/// Column-wise standardization to zero mean and unit variance, fitted on the
/// rows it receives. Constant columns are zeroed rather than divided by a
/// zero deviation.
pub fn standard_scale(rows: &mut [Vec<f32>]) {
	let Some(width) = rows.first().map(Vec::len) else {
		return;
	};
	let count = rows.len() as f32;

	for column in 0..width {
		let mean = rows.iter().map(|row| row[column]).sum::<f32>() / count;
		let variance =
			rows.iter().map(|row| (row[column] - mean).powi(2)).sum::<f32>() / count;
		let deviation = variance.sqrt();

		for row in rows.iter_mut() {
			row[column] = if deviation > 0.0 { (row[column] - mean) / deviation } else { 0.0 };
		}
	}
}

/// Horizontal concatenation of two row-aligned matrices.
pub fn hstack(left: &[Vec<f32>], right: &[Vec<f32>]) -> Vec<Vec<f32>> {
	left.iter()
		.zip(right)
		.map(|(a, b)| {
			let mut row = Vec::with_capacity(a.len() + b.len());

			row.extend_from_slice(a);
			row.extend_from_slice(b);

			row
		})
		.collect()
}

pub fn scale(rows: &mut [Vec<f32>], weight: f32) {
	for row in rows {
		for value in row {
			*value *= weight;
		}
	}
}

/// Element-wise mean of a non-empty set of equal-length vectors.
pub fn mean_vector(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
	let first = vectors.first()?;
	let mut sum = vec![0.0_f32; first.len()];

	for vector in vectors {
		for (acc, value) in sum.iter_mut().zip(vector) {
			*acc += value;
		}
	}

	let count = vectors.len() as f32;

	Some(sum.into_iter().map(|value| value / count).collect())
}
