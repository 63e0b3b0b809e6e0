//! Fixed engagement weighting. The weights are a documented product
//! convention, not learned parameters.

pub const VOTE_WEIGHT: i64 = 1;
pub const COMMENT_WEIGHT: i64 = 2;
pub const MESSAGE_WEIGHT: i64 = 3;

pub fn engagement_score(vote_count: i64, comment_count: i64, message_count: i64) -> f64 {
	(vote_count * VOTE_WEIGHT + comment_count * COMMENT_WEIGHT + message_count * MESSAGE_WEIGHT)
		as f64
}
