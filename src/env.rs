//! Environment record data structures and helpers shared by every collaborator.
//!
//! The module exposes the immutable deployment record, its builder utilities, and
//! the tenant-domain helpers that derive provider endpoints so the HTTP and auth
//! collaborators can be wired from plain configuration data.

/// Builder API for assembling environment records.
pub mod builder;

pub use builder::*;

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, error::ConfigError};

/// Public provider suffix appended to bare tenant prefixes.
pub const TENANT_DOMAIN_SUFFIX: &str = "auth0.com";

const TENANT_DOMAIN_MAX_LEN: usize = 253;

/// Error returned when tenant-domain validation fails.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum DomainError {
	/// The domain was empty.
	#[error("Tenant domain cannot be empty.")]
	Empty,
	/// The domain contains whitespace characters.
	#[error("Tenant domain contains whitespace.")]
	ContainsWhitespace,
	/// The domain carries a URL scheme; only hosts and prefixes are accepted.
	#[error("Tenant domain must not carry a scheme.")]
	ContainsScheme,
	/// The domain contains a path separator.
	#[error("Tenant domain must not contain a path.")]
	ContainsPath,
	/// The domain exceeded the allowed character count.
	#[error("Tenant domain exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Identity-provider tenant identifier.
///
/// Accepts either a bare tenant prefix (`srtkoolice`) or a full host
/// (`srtkoolice.auth0.com`); values without a dot are expanded against
/// [`TENANT_DOMAIN_SUFFIX`] when endpoints are derived.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantDomain(String);
impl TenantDomain {
	/// Creates a new tenant domain after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, DomainError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Returns the canonical provider host, expanding bare prefixes.
	pub fn host(&self) -> String {
		if self.0.contains('.') {
			self.0.clone()
		} else {
			format!("{}.{TENANT_DOMAIN_SUFFIX}", self.0)
		}
	}

	/// Returns the token issuer URL; the trailing slash is significant for claim checks.
	pub fn issuer(&self) -> Result<Url, ConfigError> {
		parse_endpoint(format!("https://{}/", self.host()))
	}

	/// Returns the authorization endpoint used to start logins.
	pub fn authorize_endpoint(&self) -> Result<Url, ConfigError> {
		parse_endpoint(format!("https://{}/authorize", self.host()))
	}

	/// Returns the token endpoint used for code exchanges.
	pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
		parse_endpoint(format!("https://{}/oauth/token", self.host()))
	}

	/// Returns the JWKS document endpoint used for signature verification.
	pub fn jwks_endpoint(&self) -> Result<Url, ConfigError> {
		parse_endpoint(format!("https://{}/.well-known/jwks.json", self.host()))
	}
}
impl Deref for TenantDomain {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for TenantDomain {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<TenantDomain> for String {
	fn from(value: TenantDomain) -> Self {
		value.0
	}
}
impl TryFrom<String> for TenantDomain {
	type Error = DomainError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Debug for TenantDomain {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TenantDomain({})", self.0)
	}
}
impl Display for TenantDomain {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for TenantDomain {
	type Err = DomainError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

/// Identity-provider slice of the environment record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthParams {
	/// Provider tenant domain; serialized as `url` to match the record's wire shape.
	#[serde(rename = "url")]
	pub domain: TenantDomain,
	/// Identifier of the protected API that issued tokens must target.
	pub audience: String,
	/// Public identifier of the registered client application.
	pub client_id: String,
	/// Redirect target the provider sends the browser back to after login.
	#[serde(rename = "callbackURL")]
	pub callback_url: Url,
}
impl AuthParams {
	/// Creates a new builder for the auth slice.
	pub fn builder() -> AuthParamsBuilder {
		AuthParamsBuilder::new()
	}
}

/// Immutable environment record consumed by the SDK's collaborators.
///
/// The record is fully populated at construction and never mutated afterwards;
/// any number of tasks may read it concurrently without synchronization. Hold
/// one value per deployment environment for the lifetime of the process and
/// hand collaborators the slices they need.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
	/// Build-variant flag; toggling it never changes the shape of the record.
	pub production: bool,
	/// Base address of the drinks API server.
	pub api_server_url: Url,
	/// Identity-provider parameters consumed by login and verification.
	#[serde(alias = "auth0")]
	pub auth: AuthParams,
}
impl Environment {
	/// Creates a new builder for the record.
	pub fn builder() -> EnvironmentBuilder {
		EnvironmentBuilder::new()
	}

	/// Sample record for local development against the bundled drinks server.
	pub fn local() -> Self {
		// TODO: replace the registration values below with your own tenant's before shipping.
		let api_server_url =
			Url::parse("http://127.0.0.1:5000").expect("The bundled API base URL is well-formed.");
		let callback_url =
			Url::parse("http://localhost:8100").expect("The bundled callback URL is well-formed.");
		let domain =
			TenantDomain::new("srtkoolice").expect("The bundled tenant prefix is well-formed.");

		Self {
			production: false,
			api_server_url,
			auth: AuthParams {
				domain,
				audience: "udacity-coffee-shop".into(),
				client_id: "BW64Ne4bk6iWSQaPbAvFMD8xU8QvXUYW".into(),
				callback_url,
			},
		}
	}
}

fn parse_endpoint(raw: String) -> Result<Url, ConfigError> {
	Url::parse(&raw).map_err(|source| ConfigError::InvalidEndpoint { source })
}

fn validate_view(view: &str) -> Result<(), DomainError> {
	if view.is_empty() {
		return Err(DomainError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(DomainError::ContainsWhitespace);
	}
	if view.contains("://") {
		return Err(DomainError::ContainsScheme);
	}
	if view.contains('/') {
		return Err(DomainError::ContainsPath);
	}
	if view.len() > TENANT_DOMAIN_MAX_LEN {
		return Err(DomainError::TooLong { max: TENANT_DOMAIN_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// std
	use std::thread;
	// self
	use super::*;

	#[test]
	fn local_record_is_fully_populated() {
		let environment = Environment::local();

		assert!(!environment.production);
		assert_eq!(environment.api_server_url.as_str(), "http://127.0.0.1:5000/");
		assert_eq!(environment.auth.domain.as_ref(), "srtkoolice");
		assert_eq!(environment.auth.audience, "udacity-coffee-shop");
		assert_eq!(environment.auth.client_id, "BW64Ne4bk6iWSQaPbAvFMD8xU8QvXUYW");
		assert_eq!(environment.auth.callback_url.as_str(), "http://localhost:8100/");
	}

	#[test]
	fn shared_reads_see_the_same_record_instance() {
		let environment = Arc::new(Environment::local());
		let readers: Vec<_> = (0..4)
			.map(|_| {
				let view = environment.clone();

				thread::spawn(move || {
					assert_eq!(view.auth.audience, "udacity-coffee-shop");

					view
				})
			})
			.collect();

		for reader in readers {
			let view = reader.join().expect("A reader thread should finish.");

			assert!(Arc::ptr_eq(&view, &environment));
		}
	}

	#[test]
	fn production_toggle_changes_nothing_else() {
		let development = Environment::local();
		let production = Environment { production: true, ..development.clone() };

		assert!(production.production);
		assert_eq!(production.api_server_url, development.api_server_url);
		assert_eq!(production.auth, development.auth);
	}

	#[test]
	fn record_deserializes_from_the_original_wire_shape() {
		let payload = r#"{
			"production": false,
			"apiServerUrl": "http://127.0.0.1:5000",
			"auth0": {
				"url": "srtkoolice",
				"audience": "udacity-coffee-shop",
				"clientId": "BW64Ne4bk6iWSQaPbAvFMD8xU8QvXUYW",
				"callbackURL": "http://localhost:8100"
			}
		}"#;
		let environment: Environment =
			serde_json::from_str(payload).expect("The original record should deserialize.");

		assert_eq!(environment, Environment::local());
	}

	#[test]
	fn record_serializes_with_camel_case_keys() {
		let value = serde_json::to_value(Environment::local())
			.expect("The sample record should serialize.");

		assert_eq!(value["production"], serde_json::json!(false));
		assert_eq!(value["apiServerUrl"], serde_json::json!("http://127.0.0.1:5000/"));
		assert_eq!(value["auth"]["url"], serde_json::json!("srtkoolice"));
		assert_eq!(value["auth"]["audience"], serde_json::json!("udacity-coffee-shop"));
		assert_eq!(
			value["auth"]["clientId"],
			serde_json::json!("BW64Ne4bk6iWSQaPbAvFMD8xU8QvXUYW")
		);
		assert_eq!(value["auth"]["callbackURL"], serde_json::json!("http://localhost:8100/"));
	}

	#[test]
	fn bare_prefixes_expand_against_the_public_suffix() {
		let domain = TenantDomain::new("srtkoolice").expect("Prefix fixture should be valid.");

		assert_eq!(domain.host(), "srtkoolice.auth0.com");
		assert_eq!(
			domain.issuer().expect("Issuer should derive.").as_str(),
			"https://srtkoolice.auth0.com/"
		);
		assert_eq!(
			domain.authorize_endpoint().expect("Authorize endpoint should derive.").as_str(),
			"https://srtkoolice.auth0.com/authorize"
		);
		assert_eq!(
			domain.token_endpoint().expect("Token endpoint should derive.").as_str(),
			"https://srtkoolice.auth0.com/oauth/token"
		);
		assert_eq!(
			domain.jwks_endpoint().expect("JWKS endpoint should derive.").as_str(),
			"https://srtkoolice.auth0.com/.well-known/jwks.json"
		);
	}

	#[test]
	fn full_hosts_pass_through_unchanged() {
		let domain =
			TenantDomain::new("login.example.coffee").expect("Host fixture should be valid.");

		assert_eq!(domain.host(), "login.example.coffee");
		assert_eq!(
			domain.issuer().expect("Issuer should derive.").as_str(),
			"https://login.example.coffee/"
		);
	}

	#[test]
	fn domain_validation_rejects_schemes_paths_and_whitespace() {
		assert_eq!(TenantDomain::new(""), Err(DomainError::Empty));
		assert_eq!(TenantDomain::new("srt koolice"), Err(DomainError::ContainsWhitespace));
		assert_eq!(TenantDomain::new("https://srtkoolice"), Err(DomainError::ContainsScheme));
		assert_eq!(TenantDomain::new("srtkoolice.auth0.com/login"), Err(DomainError::ContainsPath));
		assert!(serde_json::from_str::<TenantDomain>("\"srt koolice\"").is_err());
	}
}
