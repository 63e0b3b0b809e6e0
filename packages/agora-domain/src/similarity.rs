pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
	let dot = a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
	let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
	let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

	if norm_a == 0.0 || norm_b == 0.0 { 0.0 } else { dot / (norm_a * norm_b) }
}
