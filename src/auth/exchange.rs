//! Internal OAuth client facade and transport error mapping for the code
//! exchange.

pub use oauth2;

// crates.io
use oauth2::{
	AuthUrl, AuthorizationCode, ClientId, EndpointNotSet, EndpointSet, HttpClientError,
	PkceCodeVerifier, RedirectUrl, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicErrorResponseType, BasicRequestTokenError},
};
// self
#[cfg(feature = "reqwest")] use crate::error::TransportError;
use crate::{
	_prelude::*,
	auth::{AccessToken, AuthError, Authenticator, LoginSession, TokenSecret},
	env::AuthParams,
	error::{ConfigError, TransientError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	obs::{self, OpKind},
};

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeTokenResponse = oauth2::basic::BasicTokenResponse;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Maps HTTP transport failures into SDK [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into an SDK error.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(meta, message),
			_ => map_unknown_transport_error(meta),
		}
	}
}

impl<C, M> Authenticator<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges an authorization code for an access token and persists the
	/// resulting session.
	///
	/// The session must come from [`Authenticator::start_login`] with
	/// [`ResponseType::Code`](crate::auth::ResponseType::Code); its PKCE
	/// verifier accompanies the code. Callers driving this directly are
	/// responsible for [`LoginSession::validate_state`] first;
	/// [`Authenticator::complete_login`] does both.
	pub async fn exchange_code(&self, session: &LoginSession, code: &str) -> Result<AccessToken> {
		obs::run_op(OpKind::Exchange, "exchange_code", async {
			let verifier = session.pkce_verifier().ok_or(ConfigError::ResponseTypeMismatch)?;
			let facade = TokenFacade::<C, M>::from_params(
				&self.params,
				Arc::clone(&self.http_client),
				Arc::clone(&self.transport_mapper),
			)?;
			let token = facade.exchange_authorization_code(code, verifier).await?;

			self.persist_session(&token).await?;

			Ok(token)
		})
		.await
	}
}

pub(crate) struct TokenFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> TokenFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	// The browser client is a public client; PKCE stands in for a client
	// secret, so none is ever configured.
	pub(super) fn from_params(
		params: &AuthParams,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let auth_url = AuthUrl::new(params.domain.authorize_endpoint()?.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let token_url = TokenUrl::new(params.domain.token_endpoint()?.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let redirect_url = RedirectUrl::new(params.callback_url.to_string())
			.map_err(|source| ConfigError::InvalidRedirect { source })?;
		let oauth_client = BasicClient::new(ClientId::new(params.client_id.clone()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_redirect_uri(redirect_url);

		Ok(Self {
			oauth_client,
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
		})
	}

	pub(super) fn exchange_authorization_code<'a>(
		&'a self,
		code: &'a str,
		pkce_verifier: &'a str,
	) -> FacadeFuture<'a, AccessToken> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let request = self
				.oauth_client
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_owned()));
			let response = request
				.request_async(&instrumented)
				.await
				.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;

			map_token_response(response)
		})
	}
}

fn map_token_response(response: FacadeTokenResponse) -> Result<AccessToken> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	Ok(AccessToken::new(
		TokenSecret::new(response.access_token().secret().to_owned()),
		OffsetDateTime::now_utc(),
		Duration::seconds(expires_in),
	))
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response_error(response, meta_ref),
		RequestTokenError::Request(error) => mapper.map_transport_error(meta_ref, error),
		RequestTokenError::Parse(error, _body) => TransientError::ResponseParse {
			source: error,
			status: meta_status(meta_ref),
		}
		.into(),
		RequestTokenError::Other(message) => TransientError::TokenEndpoint {
			message: format!("Token endpoint returned an unexpected response: {message}."),
			status: meta_status(meta_ref),
			retry_after: meta_retry_after(meta_ref),
		}
		.into(),
	}
}

fn map_server_response_error(
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let message = if let Some(description) = response.error_description() {
		format!("Token endpoint returned an OAuth error: {description}.")
	} else {
		format!("Token endpoint returned an OAuth error: {}.", response.error().as_ref())
	};

	match response.error() {
		BasicErrorResponseType::InvalidGrant => AuthError::GrantRejected { reason: message }.into(),
		BasicErrorResponseType::InvalidClient | BasicErrorResponseType::UnauthorizedClient =>
			AuthError::ClientRejected { reason: message }.into(),
		BasicErrorResponseType::Extension(code) if code == "access_denied" =>
			AuthError::Denied { reason: message }.into(),
		_ => TransientError::TokenEndpoint {
			message,
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::TokenEndpoint {
			message: "Request timed out while calling the token endpoint.".into(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
			retry_after: meta_retry_after(meta),
		}
		.into();
	}

	TransportError::from(err).into()
}

#[cfg(feature = "reqwest")]
fn map_generic_transport_error(meta: Option<&ResponseMetadata>, message: impl Display) -> Error {
	TransientError::TokenEndpoint {
		message: format!("HTTP client error occurred while calling the token endpoint: {message}."),
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
	.into()
}

#[cfg(feature = "reqwest")]
fn map_unknown_transport_error(meta: Option<&ResponseMetadata>) -> Error {
	TransientError::TokenEndpoint {
		message: "HTTP client error occurred while calling the token endpoint.".into(),
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn oauth_error(body: serde_json::Value) -> BasicErrorResponse {
		serde_json::from_value(body).expect("Error response fixture should deserialize.")
	}

	#[test]
	fn oauth_errors_classify_by_code() {
		let rejected = map_server_response_error(
			oauth_error(serde_json::json!({ "error": "invalid_grant" })),
			None,
		);
		let client = map_server_response_error(
			oauth_error(serde_json::json!({ "error": "invalid_client" })),
			None,
		);
		let denied = map_server_response_error(
			oauth_error(serde_json::json!({
				"error": "access_denied",
				"error_description": "the user closed the consent screen",
			})),
			None,
		);
		let transient = map_server_response_error(
			oauth_error(serde_json::json!({ "error": "temporarily_unavailable" })),
			None,
		);

		assert!(matches!(rejected, Error::Auth(AuthError::GrantRejected { .. })));
		assert!(matches!(client, Error::Auth(AuthError::ClientRejected { .. })));
		assert!(matches!(
			denied,
			Error::Auth(AuthError::Denied { ref reason })
				if reason.contains("the user closed the consent screen"),
		));
		assert!(matches!(transient, Error::Transient(TransientError::TokenEndpoint { .. })));
	}

	#[test]
	fn token_response_requires_a_positive_expiry() {
		let ok: FacadeTokenResponse = serde_json::from_value(serde_json::json!({
			"access_token": "abc.def.ghi",
			"token_type": "bearer",
			"expires_in": 28_800,
		}))
		.expect("Token response fixture should deserialize.");
		let token = map_token_response(ok).expect("A positive expiry should map cleanly.");

		assert_eq!(token.secret.expose(), "abc.def.ghi");
		assert_eq!(token.expires_at - token.issued_at, Duration::seconds(28_800));

		let missing: FacadeTokenResponse = serde_json::from_value(serde_json::json!({
			"access_token": "abc.def.ghi",
			"token_type": "bearer",
		}))
		.expect("Token response fixture should deserialize.");

		assert!(matches!(
			map_token_response(missing),
			Err(Error::Config(ConfigError::MissingExpiresIn)),
		));
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn facade_builds_a_public_client_from_params() {
		// self
		use crate::http::ReqwestHttpClient;

		let params = crate::env::Environment::local().auth;
		let facade = TokenFacade::<ReqwestHttpClient, ReqwestTransportErrorMapper>::from_params(
			&params,
			Arc::new(ReqwestHttpClient::default()),
			Arc::new(ReqwestTransportErrorMapper),
		);

		assert!(facade.is_ok());
	}
}
