//! RS256 verification against the tenant's published signing keys.
//!
//! [`verify_with_keys`] is the pure core: it checks one compact token against a
//! [`KeyRing`] plus the expected audience and issuer. [`Verifier`] wraps that core
//! with a cached JWKS fetch so long-running processes pick up rotated provider
//! keys without restarting.

// crates.io
use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
// self
#[cfg(feature = "reqwest")]
use crate::{
	env::AuthParams,
	error::{ConfigError, TransientError, TransportError},
	http,
	obs::{self, OpKind},
};
use crate::{
	_prelude::*,
	auth::{AuthError, Claims},
};

/// Floor on how often the key set may be re-fetched, even under unknown-kid pressure.
#[cfg(feature = "reqwest")]
pub const KEY_REFRESH_INTERVAL: Duration = Duration::minutes(10);

/// One key from the provider's published key set.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Jwk {
	/// Key type; only `RSA` entries participate in verification.
	pub kty: String,
	/// Key id tokens reference through their header.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kid: Option<String>,
	/// Intended use, `sig` for signing keys.
	#[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
	pub usage: Option<String>,
	/// Algorithm the key signs with.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub alg: Option<String>,
	/// RSA modulus, base64url.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub n: Option<String>,
	/// RSA exponent, base64url.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub e: Option<String>,
}

/// Document served at the tenant's JWKS endpoint.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct JwkSet {
	/// Published keys, in the provider's order.
	#[serde(default)]
	pub keys: Vec<Jwk>,
}

/// Verification keys indexed by key id.
///
/// Construction is lenient: entries that are not RSA keys, or that lack the fields
/// needed to rebuild one, are skipped instead of failing the whole set.
#[derive(Default)]
pub struct KeyRing {
	keys: HashMap<String, DecodingKey>,
}
impl KeyRing {
	/// Builds a ring from a published key set, skipping unusable entries.
	pub fn from_jwks(set: &JwkSet) -> Self {
		let mut keys = HashMap::new();

		for jwk in &set.keys {
			if jwk.kty != "RSA" {
				continue;
			}

			let (Some(kid), Some(n), Some(e)) = (&jwk.kid, &jwk.n, &jwk.e) else {
				continue;
			};

			if let Ok(key) = DecodingKey::from_rsa_components(n, e) {
				keys.insert(kid.clone(), key);
			}
		}

		Self { keys }
	}

	/// Looks up the verification key for a key id.
	pub fn key(&self, kid: &str) -> Option<&DecodingKey> {
		self.keys.get(kid)
	}

	/// Number of usable keys in the ring.
	pub fn len(&self) -> usize {
		self.keys.len()
	}

	/// Whether the ring holds no usable keys.
	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}
}
impl Debug for KeyRing {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut kids = self.keys.keys().collect::<Vec<_>>();

		kids.sort();

		f.debug_struct("KeyRing").field("kids", &kids).finish()
	}
}

/// Verifies one compact token against a key ring, enforcing RS256 plus the expected
/// audience and issuer.
pub fn verify_with_keys(
	ring: &KeyRing,
	token: &str,
	audience: &str,
	issuer: &str,
) -> Result<Claims, AuthError> {
	let header = jsonwebtoken::decode_header(token)
		.map_err(|e| AuthError::MalformedToken { reason: e.to_string() })?;
	let kid = header.kid.ok_or_else(|| AuthError::MalformedToken {
		reason: "the header names no key id".into(),
	})?;
	let Some(key) = ring.key(&kid) else {
		return Err(AuthError::UnknownKey { kid });
	};
	let mut validation = Validation::new(Algorithm::RS256);

	validation.set_audience(&[audience]);
	validation.set_issuer(&[issuer]);

	let data = jsonwebtoken::decode::<Claims>(token, key, &validation).map_err(|e| match e.kind() {
		ErrorKind::ExpiredSignature => AuthError::Expired,
		ErrorKind::InvalidAudience | ErrorKind::InvalidIssuer | ErrorKind::ImmatureSignature =>
			AuthError::ClaimsMismatch,
		_ => AuthError::Unverifiable { reason: e.to_string() },
	})?;

	Ok(data.claims)
}

/// Cached key ring plus the instant it was fetched.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
struct CachedRing {
	ring: Arc<KeyRing>,
	fetched_at: OffsetDateTime,
}

/// Verifies bearer tokens against the tenant's published key set.
///
/// The key set is fetched lazily and cached. A token naming an unknown key id
/// triggers at most one refresh per [`KEY_REFRESH_INTERVAL`], so rotated provider
/// keys are picked up while forged kids cannot turn into a fetch per request.
#[cfg(feature = "reqwest")]
pub struct Verifier {
	audience: String,
	issuer: Url,
	jwks_url: Url,
	http_client: ReqwestClient,
	refresh_interval: Duration,
	cache: RwLock<Option<CachedRing>>,
	refresh_guard: AsyncMutex<()>,
}
#[cfg(feature = "reqwest")]
impl Verifier {
	/// Builds a verifier from the environment's auth parameters.
	pub fn from_params(params: &AuthParams) -> Result<Self> {
		Ok(Self {
			audience: params.audience.clone(),
			issuer: params.domain.issuer()?,
			jwks_url: params.domain.jwks_endpoint()?,
			http_client: ReqwestClient::default(),
			refresh_interval: KEY_REFRESH_INTERVAL,
			cache: RwLock::new(None),
			refresh_guard: AsyncMutex::new(()),
		})
	}

	/// Replaces the HTTP client used to fetch the key set.
	pub fn with_http_client(mut self, client: ReqwestClient) -> Self {
		self.http_client = client;

		self
	}

	/// Points the verifier at a non-standard key set URL.
	pub fn with_jwks_url(mut self, url: Url) -> Self {
		self.jwks_url = url;

		self
	}

	/// Overrides how often the key set may be re-fetched.
	pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
		self.refresh_interval = interval;

		self
	}

	/// Verifies a bearer token and returns its claims.
	///
	/// An unknown key id triggers one key set refresh before the token is rejected.
	pub async fn verify(&self, token: &str) -> Result<Claims> {
		obs::run_op(OpKind::Verify, "verify", async move {
			let ring = self.current_ring().await?;

			match verify_with_keys(&ring, token, &self.audience, self.issuer.as_str()) {
				Err(AuthError::UnknownKey { .. }) => {
					let ring = self.refresh_ring().await?;

					Ok(verify_with_keys(&ring, token, &self.audience, self.issuer.as_str())?)
				},
				outcome => Ok(outcome?),
			}
		})
		.await
	}

	/// Verifies a bearer token and additionally checks one permission.
	pub async fn require(&self, token: &str, permission: &str) -> Result<Claims> {
		let claims = self.verify(token).await?;

		if !claims.allows(permission) {
			return Err(AuthError::MissingPermission { permission: permission.into() }.into());
		}

		Ok(claims)
	}

	async fn current_ring(&self) -> Result<Arc<KeyRing>> {
		if let Some(cached) = self.cache.read().as_ref() {
			return Ok(cached.ring.clone());
		}

		self.refresh_ring().await
	}

	async fn refresh_ring(&self) -> Result<Arc<KeyRing>> {
		let _singleflight = self.refresh_guard.lock().await;

		// Another task may have refreshed while this one waited on the guard, and
		// repeated unknown-kid tokens must not be able to force a fetch per request.
		if let Some(cached) = self.cache.read().as_ref() {
			if OffsetDateTime::now_utc() - cached.fetched_at < self.refresh_interval {
				return Ok(cached.ring.clone());
			}
		}

		let ring = Arc::new(self.fetch_ring().await?);

		*self.cache.write() =
			Some(CachedRing { ring: ring.clone(), fetched_at: OffsetDateTime::now_utc() });

		Ok(ring)
	}

	async fn fetch_ring(&self) -> Result<KeyRing> {
		let response =
			self.http_client.get(self.jwks_url.clone()).send().await.map_err(map_fetch_error)?;
		let status = response.status();
		let retry_after = http::parse_retry_after(response.headers());
		let bytes = response.bytes().await.map_err(map_fetch_error)?;

		if !status.is_success() {
			return Err(TransientError::JwksEndpoint {
				message: format!("Key set endpoint answered with HTTP status {}.", status.as_u16()),
				status: Some(status.as_u16()),
				retry_after,
			}
			.into());
		}

		let deserializer = &mut serde_json::Deserializer::from_slice(&bytes);
		let set: JwkSet = serde_path_to_error::deserialize(deserializer).map_err(|e| {
			TransientError::ResponseParse { source: e, status: Some(status.as_u16()) }
		})?;

		Ok(KeyRing::from_jwks(&set))
	}
}
#[cfg(feature = "reqwest")]
impl Debug for Verifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Verifier")
			.field("audience", &self.audience)
			.field("issuer", &self.issuer)
			.field("jwks_url", &self.jwks_url)
			.field("refresh_interval", &self.refresh_interval)
			.finish()
	}
}

#[cfg(feature = "reqwest")]
fn map_fetch_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::JwksEndpoint {
			message: "Request timed out while fetching the signing keys.".into(),
			status: err.status().map(|code| code.as_u16()),
			retry_after: None,
		}
		.into();
	}

	TransportError::from(err).into()
}
