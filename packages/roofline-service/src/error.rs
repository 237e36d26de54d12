use roofline_domain::filter::FilterError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Invalid filter: {0}")]
	InvalidFilter(#[from] FilterError),
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Delivery error: {message}")]
	Delivery { message: String },
	#[error("Delta computation exceeded {timeout_ms} ms.")]
	ComputeTimeout { timeout_ms: u64 },
}
impl From<roofline_storage::Error> for Error {
	fn from(err: roofline_storage::Error) -> Self {
		match err {
			roofline_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			roofline_storage::Error::InvalidArgument(message) =>
				Self::InvalidRequest { message },
			roofline_storage::Error::NotFound(message) => Self::NotFound { message },
		}
	}
}

impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Delivery { message: err.to_string() }
	}
}
