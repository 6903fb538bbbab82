//! Login sessions and the authenticator that drives them.

// std
use std::borrow::Cow;
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
use url::form_urlencoded;
// self
#[cfg(feature = "reqwest")]
use crate::{auth::exchange::ReqwestTransportErrorMapper, http::ReqwestHttpClient};
use crate::{
	_prelude::*,
	auth::{AccessToken, AuthError, TokenSecret, exchange::TransportErrorMapper},
	env::AuthParams,
	error::ConfigError,
	http::TokenHttpClient,
	obs::{self, OpKind},
	store::{SessionKey, SessionRecord, SessionStore},
};

const STATE_LEN: usize = 32;
const NONCE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Response types the provider supports for browser-style logins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
	/// Implicit flow; the token arrives in the redirect's URL fragment.
	Token,
	/// Authorization-code flow; the code is exchanged with PKCE.
	Code,
}
impl ResponseType {
	/// Value used for the authorize URL's `response_type` parameter.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Token => "token",
			Self::Code => "code",
		}
	}
}
impl Display for ResponseType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Supported PKCE challenge methods surfaced via [`LoginSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub const fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// Login handshake metadata returned by [`Authenticator::start_login`].
#[derive(Clone)]
pub struct LoginSession {
	/// Response type the session was started for.
	pub response_type: ResponseType,
	/// Opaque state value that must round-trip via the redirect.
	pub state: String,
	/// Nonce appended to implicit-login authorize URLs.
	pub nonce: Option<String>,
	/// Redirect URI supplied when constructing the authorize URL.
	pub redirect_uri: Url,
	/// Fully-formed authorize URL that callers should send end-users to.
	pub authorize_url: Url,
	pkce: Option<PkcePair>,
}
impl LoginSession {
	/// PKCE code challenge, present on code sessions.
	pub fn code_challenge(&self) -> Option<&str> {
		self.pkce.as_ref().map(|pkce| pkce.challenge.as_str())
	}

	/// PKCE challenge method, present on code sessions.
	pub fn code_challenge_method(&self) -> Option<PkceCodeChallengeMethod> {
		self.pkce.as_ref().map(|pkce| pkce.method)
	}

	/// Validates the returned `state` parameter after the authorization redirect.
	pub fn validate_state(&self, returned_state: &str) -> Result<(), AuthError> {
		if returned_state == self.state {
			Ok(())
		} else {
			Err(AuthError::StateMismatch)
		}
	}

	pub(super) fn pkce_verifier(&self) -> Option<&str> {
		self.pkce.as_ref().map(|pkce| pkce.verifier.as_str())
	}
}
impl Debug for LoginSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginSession")
			.field("response_type", &self.response_type)
			.field("state", &self.state)
			.field("nonce", &self.nonce)
			.field("redirect_uri", &self.redirect_uri)
			.field("authorize_url", &self.authorize_url)
			.field("code_challenge", &self.code_challenge())
			.finish()
	}
}

/// Parameters extracted from the URL a provider redirected back to.
///
/// Fragment-delivered values ([`ResponseType::Token`]) and query-delivered
/// values ([`ResponseType::Code`]) share this shape; parameters that are absent
/// or unparseable stay [`None`] so callers can raise precise errors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthorizationCallback {
	/// Authorization code, on code responses.
	pub code: Option<String>,
	/// Access token, on implicit responses.
	pub access_token: Option<TokenSecret>,
	/// Token type accompanying an implicit response.
	pub token_type: Option<String>,
	/// Token lifetime in seconds, on implicit responses.
	pub expires_in: Option<i64>,
	/// Round-tripped state value.
	pub state: Option<String>,
	/// Error code, when the provider rejected the request.
	pub error: Option<String>,
	/// Human-readable error description, when provided.
	pub error_description: Option<String>,
}
impl AuthorizationCallback {
	/// Parses callback parameters from the URL's fragment.
	pub fn from_fragment(url: &Url) -> Self {
		let fragment = url.fragment().unwrap_or_default();

		Self::from_pairs(form_urlencoded::parse(fragment.as_bytes()))
	}

	/// Parses callback parameters from the URL's query string.
	pub fn from_query(url: &Url) -> Self {
		Self::from_pairs(url.query_pairs())
	}

	/// Errors out when the provider redirected back with an error.
	pub fn reject_provider_error(&self) -> Result<(), AuthError> {
		if let Some(error) = &self.error {
			let reason = self.error_description.clone().unwrap_or_else(|| error.clone());

			return Err(AuthError::Denied { reason });
		}

		Ok(())
	}

	fn from_pairs<'p>(pairs: impl Iterator<Item = (Cow<'p, str>, Cow<'p, str>)>) -> Self {
		let mut this = Self::default();

		for (key, value) in pairs {
			match key.as_ref() {
				"code" => this.code = Some(value.into_owned()),
				"access_token" => this.access_token = Some(TokenSecret::new(value.into_owned())),
				"token_type" => this.token_type = Some(value.into_owned()),
				"expires_in" => this.expires_in = value.parse().ok(),
				"state" => this.state = Some(value.into_owned()),
				"error" => this.error = Some(value.into_owned()),
				"error_description" => this.error_description = Some(value.into_owned()),
				_ => {},
			}
		}

		this
	}
}

/// Authenticator specialized for the crate's default reqwest transport stack.
#[cfg(feature = "reqwest")]
pub type ReqwestAuthenticator = Authenticator<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Drives browser-style logins against the environment's identity provider.
///
/// The authenticator owns the HTTP client, the session store, and the provider
/// parameters from the environment record, so the individual operations can
/// focus on protocol work (state + nonce + PKCE generation, callback parsing,
/// code exchange). Tokens it obtains are filed under a key derived from the
/// provider host and client id.
#[derive(Clone)]
pub struct Authenticator<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for token-endpoint requests.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Session store that persists obtained tokens.
	pub store: Arc<dyn SessionStore>,
	/// Identity-provider parameters from the environment record.
	pub params: AuthParams,
}
impl<C, M> Authenticator<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an authenticator that reuses the caller-provided transport +
	/// mapper pair.
	pub fn with_http_client(
		store: Arc<dyn SessionStore>,
		params: AuthParams,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self { http_client: http_client.into(), transport_mapper: mapper.into(), store, params }
	}

	/// Starts a login and returns the session with its ready-made authorize URL.
	///
	/// The URL carries the environment record's audience, client id, and
	/// callback URL untouched, plus a fresh `state`. Implicit sessions add a
	/// `nonce`; code sessions add the PKCE challenge pair.
	pub fn start_login(&self, response_type: ResponseType) -> Result<LoginSession> {
		let state = random_string(STATE_LEN);
		let (nonce, pkce) = match response_type {
			ResponseType::Token => (Some(random_string(NONCE_LEN)), None),
			ResponseType::Code => (None, Some(PkcePair::generate())),
		};
		let authorize_url = build_authorize_url(
			&self.params,
			response_type,
			&state,
			nonce.as_deref(),
			pkce.as_ref(),
		)?;

		Ok(LoginSession {
			response_type,
			state,
			nonce,
			redirect_uri: self.params.callback_url.clone(),
			authorize_url,
			pkce,
		})
	}

	/// Completes a login from the URL the provider redirected back to.
	///
	/// Rejects provider-signalled errors, validates the round-tripped state,
	/// and then either adopts the fragment token (implicit sessions) or
	/// exchanges the code (code sessions). The obtained token is persisted
	/// before being returned.
	pub async fn complete_login(
		&self,
		session: &LoginSession,
		redirected_url: &Url,
	) -> Result<AccessToken> {
		obs::run_op(OpKind::Login, "complete_login", async {
			let callback = match session.response_type {
				ResponseType::Token => AuthorizationCallback::from_fragment(redirected_url),
				ResponseType::Code => AuthorizationCallback::from_query(redirected_url),
			};

			callback.reject_provider_error()?;

			let returned_state =
				callback.state.as_deref().ok_or(AuthError::MalformedCallback { param: "state" })?;

			session.validate_state(returned_state)?;

			match session.response_type {
				ResponseType::Token => {
					let token = adopt_fragment_token(&callback)?;

					self.persist_session(&token).await?;

					Ok(token)
				},
				ResponseType::Code => {
					let code = callback
						.code
						.as_deref()
						.ok_or(AuthError::MalformedCallback { param: "code" })?;

					self.exchange_code(session, code).await
				},
			}
		})
		.await
	}

	/// Returns the stored token, provided it is still active.
	///
	/// Expired or future-dated tokens are reported as absent but stay in the
	/// store untouched.
	pub async fn current_session(&self) -> Result<Option<AccessToken>> {
		let record = self.store.load(&self.session_key()).await?;

		Ok(record.map(|record| record.token).filter(AccessToken::is_active))
	}

	/// Drops the stored session, returning the token it held.
	pub async fn forget_session(&self) -> Result<Option<AccessToken>> {
		let record = self.store.clear(&self.session_key()).await?;

		Ok(record.map(|record| record.token))
	}

	/// Store key this authenticator files its session under.
	pub fn session_key(&self) -> SessionKey {
		SessionKey { host: self.params.domain.host(), client_id: self.params.client_id.clone() }
	}

	pub(super) async fn persist_session(&self, token: &AccessToken) -> Result<()> {
		let record = SessionRecord {
			key: self.session_key(),
			audience: self.params.audience.clone(),
			token: token.clone(),
		};

		Ok(self.store.save(record).await?)
	}
}
#[cfg(feature = "reqwest")]
impl Authenticator<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates an authenticator with the crate's default reqwest transport.
	///
	/// Use [`Authenticator::with_http_client`] to supply a custom transport or
	/// error mapper instead.
	pub fn new(store: Arc<dyn SessionStore>, params: AuthParams) -> Self {
		Self::with_http_client(
			store,
			params,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Debug for Authenticator<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Authenticator").field("params", &self.params).finish()
	}
}

#[derive(Clone)]
struct PkcePair {
	verifier: String,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}
}

fn adopt_fragment_token(callback: &AuthorizationCallback) -> Result<AccessToken> {
	let secret = callback
		.access_token
		.clone()
		.ok_or(AuthError::MalformedCallback { param: "access_token" })?;

	if let Some(token_type) = &callback.token_type {
		if !token_type.eq_ignore_ascii_case("bearer") {
			return Err(AuthError::MalformedCallback { param: "token_type" }.into());
		}
	}

	let expires_in = callback.expires_in.ok_or(ConfigError::MissingExpiresIn)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	Ok(AccessToken::new(secret, OffsetDateTime::now_utc(), Duration::seconds(expires_in)))
}

fn build_authorize_url(
	params: &AuthParams,
	response_type: ResponseType,
	state: &str,
	nonce: Option<&str>,
	pkce: Option<&PkcePair>,
) -> Result<Url> {
	let mut url = params.domain.authorize_endpoint()?;
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("audience", &params.audience);
	pairs.append_pair("response_type", response_type.as_str());
	pairs.append_pair("client_id", &params.client_id);
	pairs.append_pair("redirect_uri", params.callback_url.as_str());
	pairs.append_pair("state", state);

	if let Some(nonce) = nonce {
		pairs.append_pair("nonce", nonce);
	}
	if let Some(pkce) = pkce {
		pairs.append_pair("code_challenge", &pkce.challenge);
		pairs.append_pair("code_challenge_method", pkce.method.as_str());
	}

	drop(pairs);

	Ok(url)
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let digest = Sha256::digest(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::HashMap;
	// self
	use super::*;
	use crate::env::Environment;

	fn query_map(url: &Url) -> HashMap<String, String> {
		url.query_pairs().into_owned().collect()
	}

	#[test]
	fn authorize_url_carries_the_record_values_verbatim() {
		let params = Environment::local().auth;
		let pkce = PkcePair::generate();
		let url = build_authorize_url(&params, ResponseType::Code, "state-123", None, Some(&pkce))
			.unwrap();
		let pairs = query_map(&url);

		assert!(url.as_str().starts_with("https://srtkoolice.auth0.com/authorize?"));
		assert_eq!(pairs["audience"], "udacity-coffee-shop");
		assert_eq!(pairs["response_type"], "code");
		assert_eq!(pairs["client_id"], "BW64Ne4bk6iWSQaPbAvFMD8xU8QvXUYW");
		assert_eq!(pairs["redirect_uri"], "http://localhost:8100/");
		assert_eq!(pairs["state"], "state-123");
		assert_eq!(pairs["code_challenge_method"], "S256");
		assert!(pairs.contains_key("code_challenge"));
		assert!(!pairs.contains_key("nonce"));
	}

	#[test]
	fn implicit_sessions_carry_a_nonce_instead_of_pkce() {
		let params = Environment::local().auth;
		let url =
			build_authorize_url(&params, ResponseType::Token, "state-abc", Some("nonce-xyz"), None)
				.unwrap();
		let pairs = query_map(&url);

		assert_eq!(pairs["response_type"], "token");
		assert_eq!(pairs["nonce"], "nonce-xyz");
		assert!(!pairs.contains_key("code_challenge"));
		assert!(!pairs.contains_key("code_challenge_method"));
	}

	#[test]
	fn pkce_challenge_matches_the_rfc_7636_vector() {
		assert_eq!(
			compute_pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
			"E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM",
		);
		assert_eq!(PkcePair::generate().verifier.len(), PKCE_VERIFIER_LEN);
	}

	#[test]
	fn state_validation_errors_on_mismatch() {
		let session = LoginSession {
			response_type: ResponseType::Code,
			state: "expected".into(),
			nonce: None,
			redirect_uri: Url::parse("http://localhost:8100").unwrap(),
			authorize_url: Url::parse("https://example.com/authorize").unwrap(),
			pkce: Some(PkcePair::generate()),
		};

		assert!(session.validate_state("expected").is_ok());
		assert_eq!(session.validate_state("other"), Err(AuthError::StateMismatch));
	}

	#[test]
	fn fragment_callbacks_parse_token_parameters() {
		let url = Url::parse(
			"http://localhost:8100/#access_token=abc.def.ghi&token_type=Bearer&expires_in=28800&state=s1",
		)
		.unwrap();
		let callback = AuthorizationCallback::from_fragment(&url);

		assert_eq!(callback.access_token, Some(TokenSecret::new("abc.def.ghi")));
		assert_eq!(callback.token_type.as_deref(), Some("Bearer"));
		assert_eq!(callback.expires_in, Some(28_800));
		assert_eq!(callback.state.as_deref(), Some("s1"));
		assert_eq!(callback.code, None);
	}

	#[test]
	fn query_callbacks_parse_code_and_error_parameters() {
		let ok = Url::parse("http://localhost:8100/?code=SplxlOBeZQQYbYS6WxSbIA&state=s2").unwrap();
		let denied = Url::parse(
			"http://localhost:8100/?error=access_denied&error_description=user%20cancelled&state=s2",
		)
		.unwrap();
		let callback = AuthorizationCallback::from_query(&ok);

		assert_eq!(callback.code.as_deref(), Some("SplxlOBeZQQYbYS6WxSbIA"));
		assert!(callback.reject_provider_error().is_ok());

		let callback = AuthorizationCallback::from_query(&denied);

		assert!(matches!(
			callback.reject_provider_error(),
			Err(AuthError::Denied { ref reason }) if reason == "user cancelled",
		));
	}

	#[test]
	fn fragment_adoption_requires_bearer_and_positive_expiry() {
		let good = AuthorizationCallback {
			access_token: Some(TokenSecret::new("jwt")),
			token_type: Some("Bearer".into()),
			expires_in: Some(7_200),
			..Default::default()
		};
		let token = adopt_fragment_token(&good).unwrap();

		assert_eq!(token.secret.expose(), "jwt");
		assert_eq!(token.expires_at - token.issued_at, Duration::seconds(7_200));

		let wrong_type = AuthorizationCallback { token_type: Some("mac".into()), ..good.clone() };

		assert!(matches!(
			adopt_fragment_token(&wrong_type),
			Err(Error::Auth(AuthError::MalformedCallback { param: "token_type" })),
		));

		let non_positive = AuthorizationCallback { expires_in: Some(0), ..good.clone() };

		assert!(matches!(
			adopt_fragment_token(&non_positive),
			Err(Error::Config(ConfigError::NonPositiveExpiresIn)),
		));

		let missing = AuthorizationCallback { access_token: None, ..good };

		assert!(matches!(
			adopt_fragment_token(&missing),
			Err(Error::Auth(AuthError::MalformedCallback { param: "access_token" })),
		));
	}
}
