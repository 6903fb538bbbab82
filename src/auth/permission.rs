//! Validated permissions and the normalized permission sets tokens carry.

// std
use std::{collections::BTreeSet, ops::Deref, sync::OnceLock};
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use serde::{Deserializer, Serializer};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const PERMISSION_MAX_LEN: usize = 128;

/// Reasons a permission string fails validation.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum PermissionError {
	/// Value was empty.
	#[error("Permission must not be empty.")]
	Empty,
	/// Value contained whitespace.
	#[error("Permission must not contain whitespace.")]
	ContainsWhitespace,
	/// Value exceeded the maximum accepted length.
	#[error("Permission must not exceed {max} characters.")]
	TooLong {
		/// Maximum accepted length.
		max: usize,
	},
}

/// A single validated permission, e.g. `post:drinks`.
///
/// The service grants permissions as `action:resource` pairs, but nothing here
/// requires that shape; [`Permission::action`] and [`Permission::resource`]
/// simply return [`None`] when the colon is absent.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission(String);
impl Permission {
	/// Validates and wraps a permission string.
	pub fn new<S>(value: S) -> Result<Self, PermissionError>
	where
		S: Into<String>,
	{
		let value = value.into();

		if value.is_empty() {
			return Err(PermissionError::Empty);
		}
		if value.chars().any(char::is_whitespace) {
			return Err(PermissionError::ContainsWhitespace);
		}
		if value.len() > PERMISSION_MAX_LEN {
			return Err(PermissionError::TooLong { max: PERMISSION_MAX_LEN });
		}

		Ok(Self(value))
	}

	/// Borrows the permission as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Part before the first colon, e.g. `post` of `post:drinks`.
	pub fn action(&self) -> Option<&str> {
		self.0.split_once(':').map(|(action, _)| action)
	}

	/// Part after the first colon, e.g. `drinks` of `post:drinks`.
	pub fn resource(&self) -> Option<&str> {
		self.0.split_once(':').map(|(_, resource)| resource)
	}
}
impl Deref for Permission {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for Permission {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Display for Permission {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for Permission {
	type Err = PermissionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl TryFrom<String> for Permission {
	type Error = PermissionError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl From<Permission> for String {
	fn from(value: Permission) -> Self {
		value.0
	}
}

/// Normalized, deduplicated set of permissions.
///
/// The provider delivers permissions as a JSON array inside the access token's
/// claims. Order and duplicates there are meaningless, so the set sorts and
/// dedupes on construction; two sets built from differently ordered arrays
/// compare equal and share a fingerprint.
#[derive(Clone, Debug, Default)]
pub struct PermissionSet {
	values: Arc<[Permission]>,
	fingerprint_cache: OnceLock<String>,
}
impl PermissionSet {
	/// Validates, sorts, and dedupes the given permission strings.
	pub fn new<I, S>(values: I) -> Result<Self, PermissionError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let values =
			values.into_iter().map(Permission::new).collect::<Result<BTreeSet<_>, _>>()?;

		Ok(Self { values: values.into_iter().collect(), fingerprint_cache: OnceLock::new() })
	}

	/// Whether the set carries the given permission string.
	pub fn contains(&self, permission: &str) -> bool {
		self.values.iter().any(|p| p.as_str() == permission)
	}

	/// Number of permissions in the set.
	pub fn len(&self) -> usize {
		self.values.len()
	}

	/// Whether the set is empty.
	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Iterates the permissions in their normalized order.
	pub fn iter(&self) -> impl Iterator<Item = &Permission> {
		self.values.iter()
	}

	/// Joins the permissions with the given separator.
	pub fn join(&self, separator: &str) -> String {
		self.values.iter().map(Permission::as_str).collect::<Vec<_>>().join(separator)
	}

	/// Stable digest of the normalized set, usable as a cache key.
	///
	/// Computed once per set and cached.
	pub fn fingerprint(&self) -> &str {
		self.fingerprint_cache.get_or_init(|| {
			let digest = Sha256::digest(self.join(" ").as_bytes());

			STANDARD_NO_PAD.encode(digest)
		})
	}
}
impl PartialEq for PermissionSet {
	fn eq(&self, other: &Self) -> bool {
		self.values == other.values
	}
}
impl Eq for PermissionSet {}
impl FromIterator<Permission> for PermissionSet {
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = Permission>,
	{
		let values = iter.into_iter().collect::<BTreeSet<_>>();

		Self { values: values.into_iter().collect(), fingerprint_cache: OnceLock::new() }
	}
}
impl Serialize for PermissionSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.collect_seq(self.values.iter().map(Permission::as_str))
	}
}
impl<'de> Deserialize<'de> for PermissionSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = Vec::<String>::deserialize(deserializer)?;

		Self::new(values).map_err(serde::de::Error::custom)
	}
}
