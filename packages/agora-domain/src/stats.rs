pub fn mean(values: &[i64]) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	values.iter().sum::<i64>() as f64 / values.len() as f64
}

pub fn median(values: &[i64]) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	let mut sorted = values.to_vec();

	sorted.sort_unstable();

	let middle = sorted.len() / 2;

	if sorted.len() % 2 == 0 {
		(sorted[middle - 1] + sorted[middle]) as f64 / 2.0
	} else {
		sorted[middle] as f64
	}
}

pub fn mean_f64(values: &[f64]) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	values.iter().sum::<f64>() / values.len() as f64
}
