//! Login sessions, bearer tokens, permission checks, and signature verification.

pub mod exchange;
pub mod permission;
pub mod session;
pub mod token;
pub mod verify;

pub use exchange::*;
pub use permission::*;
pub use session::*;
pub use token::*;
pub use verify::*;

// self
use crate::_prelude::*;

/// Authentication and authorization failures.
///
/// Every variant maps onto the HTTP status the drinks service answers with for
/// the same condition, so embedders that gate their own endpoints can reuse
/// [`AuthError::http_status`] verbatim.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthError {
	/// Authorization header was absent.
	#[error("Authorization header is missing.")]
	MissingAuthorization,
	/// Authorization header does not use the bearer scheme.
	#[error("Authorization header must use the bearer scheme.")]
	NotBearer,
	/// Authorization header is not exactly `Bearer <token>`.
	#[error("Authorization header must carry exactly one bearer token.")]
	MalformedHeader,
	/// Token segments could not be read, e.g. the header names no key id.
	#[error("Token is malformed: {reason}.")]
	MalformedToken {
		/// What exactly could not be read.
		reason: String,
	},
	/// Token's expiry lies in the past.
	#[error("Token has expired.")]
	Expired,
	/// Token was minted for a different audience or issuer.
	#[error("Token audience or issuer does not match the environment.")]
	ClaimsMismatch,
	/// Signature or payload could not be verified at all.
	#[error("Unable to verify the token: {reason}.")]
	Unverifiable {
		/// Decoder error rendered for humans.
		reason: String,
	},
	/// Token names a signing key the provider's key set does not contain.
	#[error("Unable to find a signing key for kid \"{kid}\".")]
	UnknownKey {
		/// Key id taken from the token header.
		kid: String,
	},
	/// Token verified fine but does not carry the required permission.
	#[error("Token does not carry the required permission \"{permission}\".")]
	MissingPermission {
		/// Permission the caller asked for.
		permission: String,
	},
	/// State returned by the provider does not match the login session.
	#[error("Returned state does not match the login session.")]
	StateMismatch,
	/// Provider redirected back with an error instead of a credential.
	#[error("Provider denied the authorization: {reason}.")]
	Denied {
		/// Error description from the redirect, or the bare error code.
		reason: String,
	},
	/// Redirect landed without a parameter the flow cannot proceed without.
	#[error("Authorization callback is missing or carries an invalid \"{param}\" parameter.")]
	MalformedCallback {
		/// Name of the offending parameter.
		param: &'static str,
	},
	/// Token endpoint rejected the authorization grant.
	#[error("Provider rejected the authorization grant: {reason}.")]
	GrantRejected {
		/// Human-readable reason from the provider.
		reason: String,
	},
	/// Token endpoint rejected the client itself.
	#[error("Provider rejected the client credentials: {reason}.")]
	ClientRejected {
		/// Human-readable reason from the provider.
		reason: String,
	},
}
impl AuthError {
	/// HTTP status the drinks service pairs with this failure.
	pub const fn http_status(&self) -> u16 {
		match self {
			Self::Unverifiable { .. } | Self::UnknownKey { .. } | Self::MalformedCallback { .. } =>
				400,
			_ => 401,
		}
	}
}

/// Extracts the bearer token from an `Authorization` header value.
///
/// Applies the same checks the drinks service applies before verifying a
/// request, i.e. a case-insensitive `Bearer` scheme followed by exactly one
/// token.
pub fn bearer_token(header: &str) -> Result<&str, AuthError> {
	let mut parts = header.split_whitespace();
	let scheme = parts.next().ok_or(AuthError::MissingAuthorization)?;

	if !scheme.eq_ignore_ascii_case("bearer") {
		return Err(AuthError::NotBearer);
	}

	let token = parts.next().ok_or(AuthError::MalformedHeader)?;

	if parts.next().is_some() {
		return Err(AuthError::MalformedHeader);
	}

	Ok(token)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn bearer_token_accepts_any_scheme_casing() {
		for header in ["Bearer abc.def.ghi", "bearer abc.def.ghi", "BEARER abc.def.ghi"] {
			assert_eq!(bearer_token(header).unwrap(), "abc.def.ghi");
		}
	}

	#[test]
	fn bearer_token_rejects_malformed_headers() {
		assert_eq!(bearer_token(""), Err(AuthError::MissingAuthorization));
		assert_eq!(bearer_token("Token abc"), Err(AuthError::NotBearer));
		assert_eq!(bearer_token("Bearer"), Err(AuthError::MalformedHeader));
		assert_eq!(bearer_token("Bearer abc def"), Err(AuthError::MalformedHeader));
	}

	#[test]
	fn statuses_match_the_service_contract() {
		assert_eq!(AuthError::MissingAuthorization.http_status(), 401);
		assert_eq!(AuthError::Expired.http_status(), 401);
		assert_eq!(
			AuthError::MissingPermission { permission: "post:drinks".into() }.http_status(),
			401
		);
		assert_eq!(AuthError::UnknownKey { kid: "k-1".into() }.http_status(), 400);
		assert_eq!(AuthError::Unverifiable { reason: "bad signature".into() }.http_status(), 400);
	}
}
