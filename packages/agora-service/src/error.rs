pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	/// The source data cannot support a full recompute; the run aborts
	/// before anything is persisted.
	#[error("Incomplete data: {message}")]
	IncompleteData { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}

impl From<agora_storage::Error> for Error {
	fn from(err: agora_storage::Error) -> Self {
		match err {
			agora_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
