//! Client SDK for the cafe drinks service - one crate for the environment record, menu API calls,
//! and provider-aware login, token storage, and RS256 verification.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod env;
pub mod error;
pub mod http;
pub mod menu;
pub mod obs;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{Authenticator, ReqwestAuthenticator, exchange::ReqwestTransportErrorMapper},
		env::{AuthParams, Environment},
		http::ReqwestHttpClient,
		store::{MemoryStore, SessionStore},
	};

	/// Authentication parameters matching the bundled sample record; handy for pointing flows at
	/// mock providers.
	pub fn test_auth_params() -> AuthParams {
		Environment::local().auth
	}

	/// Builds an environment whose API base points at a caller-supplied test server.
	pub fn test_environment(api_base: &str) -> Environment {
		let api_server_url = Url::parse(api_base).expect("Failed to parse the test API base URL.");

		Environment::builder()
			.api_server_url(api_server_url)
			.auth(test_auth_params())
			.build()
			.expect("Failed to build the test environment.")
	}

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs an [`Authenticator`] backed by an in-memory store and the insecure reqwest
	/// transport used across integration tests.
	pub fn build_test_authenticator(
		params: AuthParams,
	) -> (ReqwestAuthenticator, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn SessionStore> = store_backend.clone();
		let authenticator = Authenticator::with_http_client(
			store,
			params,
			test_reqwest_http_client(),
			ReqwestTransportErrorMapper,
		);

		(authenticator, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
