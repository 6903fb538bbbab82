//! Access-token records, their claims, and the secret wrapper that keeps raw
//! token material out of logs.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{
	_prelude::*,
	auth::{AuthError, PermissionSet},
};

/// Opaque wrapper for sensitive token strings.
///
/// [`Debug`] prints a redaction marker instead of the value, so the wrapper can
/// sit inside records that derive [`Debug`] without leaking credentials into
/// logs. Call [`TokenSecret::expose`] where the raw value is genuinely needed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a raw secret string.
	pub fn new<S>(secret: S) -> Self
	where
		S: Into<String>,
	{
		Self(secret.into())
	}

	/// Reveals the raw secret.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenSecret(\"<redacted>\")")
	}
}
impl From<String> for TokenSecret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl From<&str> for TokenSecret {
	fn from(value: &str) -> Self {
		Self(value.into())
	}
}

/// Lifecycle state of an access token at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
	/// Issued-at lies in the future, e.g. clocks disagree.
	Pending,
	/// Token is currently valid.
	Active,
	/// Token's expiry has passed.
	Expired,
}
impl TokenStatus {
	/// Stable textual form.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Active => "active",
			Self::Expired => "expired",
		}
	}
}
impl Display for TokenStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// A bearer access token together with its validity window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
	/// Raw token material.
	pub secret: TokenSecret,
	/// When the token was obtained.
	#[serde(with = "time::serde::rfc3339")]
	pub issued_at: OffsetDateTime,
	/// When the token stops being valid.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Builds a token that is valid for `expires_in` starting at `issued_at`.
	pub fn new(secret: TokenSecret, issued_at: OffsetDateTime, expires_in: Duration) -> Self {
		Self { secret, issued_at, expires_at: issued_at + expires_in }
	}

	/// Status of the token right now.
	pub fn status(&self) -> TokenStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Status of the token at the given instant.
	///
	/// A token is [`TokenStatus::Expired`] from the exact expiry instant on.
	pub fn status_at(&self, now: OffsetDateTime) -> TokenStatus {
		if self.issued_at > now {
			TokenStatus::Pending
		} else if self.expires_at <= now {
			TokenStatus::Expired
		} else {
			TokenStatus::Active
		}
	}

	/// Whether the token is usable right now.
	pub fn is_active(&self) -> bool {
		matches!(self.status(), TokenStatus::Active)
	}

	/// Time left until expiry, negative once the token has expired.
	pub fn remaining(&self) -> Duration {
		self.expires_at - OffsetDateTime::now_utc()
	}

	/// Value for an `Authorization` header.
	pub fn authorization_header(&self) -> String {
		format!("Bearer {}", self.secret.expose())
	}

	/// Decodes the token's claims without verifying the signature.
	pub fn claims(&self) -> Result<Claims, AuthError> {
		decode_claims_unverified(self.secret.expose())
	}
}

/// Audience claim, which providers serialize as a string or an array.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
	/// Single audience.
	One(String),
	/// Multiple audiences.
	Many(Vec<String>),
}
impl Audience {
	/// Whether the expected audience is among the claimed ones.
	pub fn contains(&self, expected: &str) -> bool {
		match self {
			Self::One(aud) => aud == expected,
			Self::Many(auds) => auds.iter().any(|aud| aud == expected),
		}
	}
}

/// Claims carried by the service's access tokens.
///
/// Every field is optional because unverified decoding must accept whatever the
/// token actually carries; claims the model does not name are preserved in
/// [`Claims::extra`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
	/// Issuer, the tenant's base URL with its trailing slash.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iss: Option<String>,
	/// Subject, the provider's id for the end-user.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sub: Option<String>,
	/// Audience(s) the token was minted for.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub aud: Option<Audience>,
	/// Issued-at, in unix seconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iat: Option<i64>,
	/// Expiry, in unix seconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub exp: Option<i64>,
	/// Permissions granted to the subject.
	#[serde(default, skip_serializing_if = "PermissionSet::is_empty")]
	pub permissions: PermissionSet,
	/// Claims this model does not name.
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}
impl Claims {
	/// Whether the claims grant the given permission.
	pub fn allows(&self, permission: &str) -> bool {
		self.permissions.contains(permission)
	}

	/// Expiry as a timestamp, when the claim is present and in range.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.exp.and_then(|exp| OffsetDateTime::from_unix_timestamp(exp).ok())
	}

	/// Issued-at as a timestamp, when the claim is present and in range.
	pub fn issued_at(&self) -> Option<OffsetDateTime> {
		self.iat.and_then(|iat| OffsetDateTime::from_unix_timestamp(iat).ok())
	}
}

/// Decodes a token's claims without verifying the signature.
///
/// This is what a browser client does to show who is logged in. Never feed the
/// result into an authorization decision; that is [`crate::auth::verify`]'s
/// job.
pub fn decode_claims_unverified(token: &str) -> Result<Claims, AuthError> {
	let mut segments = token.split('.');
	let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
		(Some(_), Some(payload), Some(_), None) => payload,
		_ => {
			return Err(AuthError::MalformedToken {
				reason: "expected three dot-separated segments".into(),
			});
		},
	};
	let bytes = URL_SAFE_NO_PAD
		.decode(payload)
		.map_err(|e| AuthError::MalformedToken { reason: e.to_string() })?;

	serde_json::from_slice(&bytes).map_err(|e| AuthError::MalformedToken { reason: e.to_string() })
}
