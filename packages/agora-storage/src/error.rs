#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error(transparent)]
	Mongo(#[from] Box<mongodb::error::Error>),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
}
impl From<mongodb::error::Error> for Error {
	fn from(err: mongodb::error::Error) -> Self {
		Self::Mongo(Box::new(err))
	}
}
