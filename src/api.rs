//! Typed client for the drinks service plus the envelope shapes it answers with.
//!
//! The service wraps every payload. Successes carry `{"success": true, "drinks": …}`
//! (deletions carry the removed id instead of a drink), failures carry
//! `{"success": false, "error": <status>, "message": <text>}`. [`ShopClient`]
//! decodes both and turns failure envelopes into typed errors.

#[cfg(feature = "reqwest")] pub mod catalog;
#[cfg(feature = "reqwest")] pub mod manage;

// crates.io
#[cfg(feature = "reqwest")] use reqwest::{RequestBuilder, Response};
// self
#[cfg(feature = "reqwest")]
use crate::{
	env::Environment,
	error::{ConfigError, TransientError, TransportError},
	http::{self, ApiHttpClient},
};
use crate::_prelude::*;

/// Rejections answered by the drinks service.
///
/// Transient conditions (429, 5xx) are deliberately not represented here; those
/// surface as [`TransientError::ApiEndpoint`](crate::error::TransientError) so
/// retry loops can treat them uniformly with the other upstream endpoints.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ApiError {
	/// Service answered 404.
	#[error("Drinks service has no such resource: {message}.")]
	NotFound {
		/// Reason taken from the failure envelope.
		message: String,
	},
	/// Service answered 422.
	#[error("Drinks service could not process the payload: {message}.")]
	Unprocessable {
		/// Reason taken from the failure envelope.
		message: String,
	},
	/// Service answered 401 or 403.
	#[error("Drinks service rejected the credential: {message}.")]
	Unauthorized {
		/// Exact status the service answered with.
		status: u16,
		/// Reason taken from the failure envelope.
		message: String,
	},
	/// Service answered a status this client has no mapping for.
	#[error("Drinks service answered with HTTP status {status}: {message}.")]
	Unexpected {
		/// Exact status the service answered with.
		status: u16,
		/// Reason taken from the failure envelope, or the raw body.
		message: String,
	},
}

/// Success envelope wrapping drink payloads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrinksEnvelope<T> {
	/// Always `true` on this path.
	pub success: bool,
	/// Payload under the service's `drinks` key; a list for reads, one object for writes.
	pub drinks: T,
}

/// Success envelope answered by deletions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteEnvelope {
	/// Always `true` on this path.
	pub success: bool,
	/// Identifier of the removed drink.
	pub delete: i64,
}

/// Failure envelope carried by every error status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
	/// Always `false` on this path.
	pub success: bool,
	/// HTTP status repeated inside the body.
	pub error: u16,
	/// Human-readable reason.
	pub message: String,
}

/// Typed client for the drinks service, rooted at the environment's API server URL.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ShopClient {
	/// Underlying HTTP client; exposed so embedders can reuse its endpoint builder.
	pub http_client: ApiHttpClient,
}
#[cfg(feature = "reqwest")]
impl ShopClient {
	/// Builds a client for the environment's API server.
	pub fn new(environment: &Environment) -> Self {
		Self { http_client: ApiHttpClient::new(environment.api_server_url.clone()) }
	}

	/// Builds a client around a caller-supplied HTTP client.
	pub fn with_http_client(http_client: ApiHttpClient) -> Self {
		Self { http_client }
	}

	pub(crate) async fn send_and_decode<T>(&self, request: RequestBuilder) -> Result<T>
	where
		T: serde::de::DeserializeOwned,
	{
		let response = request.send().await.map_err(map_send_error)?;

		decode_response(response).await
	}
}

#[cfg(feature = "reqwest")]
async fn decode_response<T>(response: Response) -> Result<T>
where
	T: serde::de::DeserializeOwned,
{
	let status = response.status().as_u16();
	let retry_after = http::parse_retry_after(response.headers());
	let bytes = response.bytes().await.map_err(map_send_error)?;

	if (200..300).contains(&status) {
		parse_json(&bytes, status)
	} else {
		Err(error_from_response(status, retry_after, &bytes))
	}
}

#[cfg(feature = "reqwest")]
fn parse_json<T>(bytes: &[u8], status: u16) -> Result<T>
where
	T: serde::de::DeserializeOwned,
{
	let deserializer = &mut serde_json::Deserializer::from_slice(bytes);

	serde_path_to_error::deserialize(deserializer)
		.map_err(|e| TransientError::ResponseParse { source: e, status: Some(status) }.into())
}

#[cfg(feature = "reqwest")]
fn error_from_response(status: u16, retry_after: Option<Duration>, bytes: &[u8]) -> Error {
	let message = match serde_json::from_slice::<ErrorEnvelope>(bytes) {
		Ok(envelope) => envelope.message,
		Err(_) => String::from_utf8_lossy(bytes).trim().to_string(),
	};
	let message = if message.is_empty() {
		format!("the service answered with HTTP status {status}")
	} else {
		message
	};

	match status {
		401 | 403 => ApiError::Unauthorized { status, message }.into(),
		404 => ApiError::NotFound { message }.into(),
		422 => ApiError::Unprocessable { message }.into(),
		429 | 500..=599 =>
			TransientError::ApiEndpoint { message, status: Some(status), retry_after }.into(),
		_ => ApiError::Unexpected { status, message }.into(),
	}
}

#[cfg(feature = "reqwest")]
fn map_send_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::ApiEndpoint {
			message: "Request timed out while calling the drinks service.".into(),
			status: err.status().map(|code| code.as_u16()),
			retry_after: None,
		}
		.into();
	}

	TransportError::from(err).into()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::menu::DrinkSummary;

	#[test]
	fn success_envelopes_decode_lists_and_deletions() {
		let list: DrinksEnvelope<Vec<DrinkSummary>> = serde_json::from_str(
			r#"{"success": true, "drinks": [{"id": 1, "title": "water", "recipe": [{"color": "blue", "parts": 1}]}]}"#,
		)
		.expect("Failed to decode the list envelope.");

		assert!(list.success);
		assert_eq!(list.drinks.len(), 1);
		assert_eq!(list.drinks[0].title, "water");

		let deletion: DeleteEnvelope = serde_json::from_str(r#"{"success": true, "delete": 7}"#)
			.expect("Failed to decode the delete envelope.");

		assert_eq!(deletion.delete, 7);
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn failure_envelopes_classify_by_status() {
		let not_found = error_from_response(
			404,
			None,
			br#"{"success": false, "error": 404, "message": "drink not found"}"#,
		);

		assert!(matches!(
			not_found,
			Error::Api(ApiError::NotFound { ref message }) if message == "drink not found"
		));

		let unprocessable = error_from_response(
			422,
			None,
			br#"{"success": false, "error": 422, "message": "Missing values"}"#,
		);

		assert!(matches!(
			unprocessable,
			Error::Api(ApiError::Unprocessable { ref message }) if message == "Missing values"
		));

		let unauthorized = error_from_response(
			401,
			None,
			br#"{"success": false, "error": 401, "message": "Token has expired."}"#,
		);

		assert!(matches!(unauthorized, Error::Api(ApiError::Unauthorized { status: 401, .. })));

		let unavailable = error_from_response(503, Some(Duration::seconds(30)), b"downstream down");

		assert!(matches!(
			unavailable,
			Error::Transient(TransientError::ApiEndpoint {
				status: Some(503),
				retry_after: Some(retry),
				..
			}) if retry == Duration::seconds(30)
		));
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn malformed_success_bodies_surface_the_json_path() {
		let result: Result<DrinksEnvelope<Vec<DrinkSummary>>> =
			parse_json(br#"{"success": true, "drinks": [{"id": "not-a-number"}]}"#, 200);
		let err = result.expect_err("Decoding accepted a malformed envelope.");

		assert!(matches!(
			err,
			Error::Transient(TransientError::ResponseParse { status: Some(200), .. })
		));
	}
}
