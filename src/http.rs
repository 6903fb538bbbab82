//! Transport primitives for the drinks API and the provider's token endpoint.
//!
//! [`ApiHttpClient`] resolves every route against the environment's API base
//! URL; that join is the only place the base URL is applied, so request URLs
//! always begin with the configured value. The remaining types serve the
//! token-exchange path: [`TokenHttpClient`] abstracts the transport `oauth2`
//! drives, and [`ResponseMetadataSlot`] carries HTTP statuses and retry hints
//! out of the transport so error mapping can classify failures.

// std
use std::ops::Deref;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError};
#[cfg(feature = "reqwest")] use oauth2::{HttpRequest, HttpResponse};
#[cfg(feature = "reqwest")] use reqwest::{
	Method, RequestBuilder,
	header::{HeaderMap, RETRY_AFTER},
};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
#[cfg(feature = "reqwest")] use crate::error::ConfigError;
use crate::_prelude::*;

/// HTTP client for the drinks service.
///
/// Wraps a [`ReqwestClient`] together with the environment's API base URL and
/// prefixes every request with it. Routes are resolved relative to the base, so
/// path segments the base itself carries survive the join.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ApiHttpClient {
	client: ReqwestClient,
	base: Url,
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient {
	/// Builds a client over the given API base URL with a default [`ReqwestClient`].
	pub fn new(base: Url) -> Self {
		Self { client: ReqwestClient::default(), base }
	}

	/// Builds a client that reuses an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient, base: Url) -> Self {
		Self { client, base }
	}

	/// API base URL every route is resolved against.
	pub fn base(&self) -> &Url {
		&self.base
	}

	/// Resolves a route against the base URL.
	///
	/// A base of `http://host/api` resolves `drinks` to `http://host/api/drinks`
	/// whether or not the base or the route carry their slashes.
	pub fn endpoint(&self, route: &str) -> Result<Url, ConfigError> {
		let mut base = self.base.clone();

		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		base.join(route.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidEndpoint { source })
	}

	/// Starts a request against the given route.
	pub fn request(&self, method: Method, route: &str) -> Result<RequestBuilder, ConfigError> {
		Ok(self.client.request(method, self.endpoint(route)?))
	}
}

/// Abstraction over HTTP transports capable of executing token exchanges.
///
/// This trait is the authenticator's only dependency on an HTTP stack. Callers
/// provide an implementation (typically behind `Arc<T>`) and the authenticator
/// requests short-lived [`AsyncHttpClient`] handles, each carrying a clone of a
/// [`ResponseMetadataSlot`]. Handles must own whatever state their request
/// futures need so those futures stay `Send` for the lifetime of the in-flight
/// exchange.
pub trait TokenHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle that records response outcomes in `slot`.
	///
	/// Implementations must call [`ResponseMetadataSlot::take`] before
	/// dispatching a request so stale information never leaks across retries,
	/// and [`ResponseMetadataSlot::store`] once a status or retry hint is known.
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Metadata captured from the most recent HTTP response, for error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if available.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between the transport and
/// the error-mapping layer.
///
/// The authenticator creates a fresh slot per token request and reads the
/// captured metadata immediately after `oauth2` resolves.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Thin wrapper around [`ReqwestClient`] for token-endpoint traffic.
///
/// Token requests should not follow redirects; configure any custom
/// [`ReqwestClient`] accordingly, because this client is handed to the `oauth2`
/// crate when the exchange facade is built.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds an instrumented handle that captures response metadata.
	pub(crate) fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle::new(self.0.clone(), slot)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

#[cfg(feature = "reqwest")]
/// Instrumented adapter that implements [`AsyncHttpClient`] for reqwest.
pub(crate) struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
#[cfg(feature = "reqwest")]
impl InstrumentedHttpClient {
	fn new(client: ReqwestClient, slot: ResponseMetadataSlot) -> Self {
		Self { client, slot }
	}
}

#[cfg(feature = "reqwest")]
/// Handle returned by [`ReqwestHttpClient`] that satisfies [`TokenHttpClient`].
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
#[cfg(feature = "reqwest")]
impl InstrumentedHandle {
	fn new(client: ReqwestClient, slot: ResponseMetadataSlot) -> Self {
		Self(Arc::new(InstrumentedHttpClient::new(client, slot)))
	}
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let retry_after = parse_retry_after(&headers);

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()), retry_after });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
#[cfg(feature = "reqwest")]
impl TokenHttpClient for ReqwestHttpClient {
	type Handle = InstrumentedHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		self.instrumented(slot)
	}
}

#[cfg(feature = "reqwest")]
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(secs as i64));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
