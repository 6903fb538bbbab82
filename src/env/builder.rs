// self
use crate::{
	_prelude::*,
	env::{AuthParams, Environment, TenantDomain},
};

/// Errors raised while assembling environment records.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum EnvironmentBuildError {
	/// API server base URL is mandatory.
	#[error("Missing API server URL.")]
	MissingApiServerUrl,
	/// Identity-provider parameters are mandatory.
	#[error("Missing auth parameters.")]
	MissingAuth,
}

/// Errors raised while assembling the auth slice.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum AuthParamsBuildError {
	/// Tenant domain is mandatory.
	#[error("Missing tenant domain.")]
	MissingDomain,
	/// Audience is mandatory.
	#[error("Missing audience.")]
	MissingAudience,
	/// Client identifier is mandatory.
	#[error("Missing client identifier.")]
	MissingClientId,
	/// Callback URL is mandatory.
	#[error("Missing callback URL.")]
	MissingCallbackUrl,
}

/// Builder for [`Environment`] values.
///
/// The builder only assembles; it performs no value validation (HTTPS
/// enforcement, placeholder detection, and environment selection stay with the
/// embedding application).
#[derive(Debug, Default)]
pub struct EnvironmentBuilder {
	/// Build-variant flag; defaults to `false`.
	pub production: bool,
	/// Base address of the drinks API server.
	pub api_server_url: Option<Url>,
	/// Identity-provider parameters.
	pub auth: Option<AuthParams>,
}
impl EnvironmentBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the build-variant flag.
	pub fn production(mut self, production: bool) -> Self {
		self.production = production;

		self
	}

	/// Sets the API server base URL.
	pub fn api_server_url(mut self, url: Url) -> Self {
		self.api_server_url = Some(url);

		self
	}

	/// Sets the identity-provider parameters.
	pub fn auth(mut self, auth: AuthParams) -> Self {
		self.auth = Some(auth);

		self
	}

	/// Consumes the builder and assembles the record.
	pub fn build(self) -> Result<Environment, EnvironmentBuildError> {
		let api_server_url =
			self.api_server_url.ok_or(EnvironmentBuildError::MissingApiServerUrl)?;
		let auth = self.auth.ok_or(EnvironmentBuildError::MissingAuth)?;

		Ok(Environment { production: self.production, api_server_url, auth })
	}
}

/// Builder for [`AuthParams`] values.
#[derive(Debug, Default)]
pub struct AuthParamsBuilder {
	/// Provider tenant domain.
	pub domain: Option<TenantDomain>,
	/// Identifier of the protected API.
	pub audience: Option<String>,
	/// Public client identifier.
	pub client_id: Option<String>,
	/// Post-login redirect target.
	pub callback_url: Option<Url>,
}
impl AuthParamsBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the tenant domain.
	pub fn domain(mut self, domain: TenantDomain) -> Self {
		self.domain = Some(domain);

		self
	}

	/// Sets the audience.
	pub fn audience(mut self, audience: impl Into<String>) -> Self {
		self.audience = Some(audience.into());

		self
	}

	/// Sets the client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the callback URL.
	pub fn callback_url(mut self, url: Url) -> Self {
		self.callback_url = Some(url);

		self
	}

	/// Consumes the builder and assembles the auth slice.
	pub fn build(self) -> Result<AuthParams, AuthParamsBuildError> {
		let domain = self.domain.ok_or(AuthParamsBuildError::MissingDomain)?;
		let audience = self.audience.ok_or(AuthParamsBuildError::MissingAudience)?;
		let client_id = self.client_id.ok_or(AuthParamsBuildError::MissingClientId)?;
		let callback_url = self.callback_url.ok_or(AuthParamsBuildError::MissingCallbackUrl)?;

		Ok(AuthParams { domain, audience, client_id, callback_url })
	}
}
