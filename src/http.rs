//! Transport primitives for the session client.
//!
//! The module exposes [`SessionTransport`] alongside [`TransportRequest`] and
//! [`SessionResponse`] so downstream crates can integrate custom HTTP stacks. The
//! transport contract is intentionally non-throwing for HTTP statuses: a 401 (or any
//! other status) arrives as an `Ok` response, so the client's recovery logic observes
//! every status uniformly and only genuine network/IO failures surface as errors.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError, request::Method};

/// Boxed future returned by [`SessionTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<SessionResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing session requests.
///
/// The trait is the client's only dependency on an HTTP implementation. Implementations
/// must be `Send + Sync` so one client can be shared across tasks, and must never map
/// HTTP error statuses to `Err` — that classification belongs to the session layer.
pub trait SessionTransport
where
	Self: Send + Sync,
{
	/// Executes a fully resolved request and returns the owned response.
	fn execute(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// A fully resolved request handed to the transport: absolute URL, verb, headers, body.
#[derive(Clone, Debug)]
pub struct TransportRequest {
	/// Request verb.
	pub method: Method,
	/// Absolute URL including query parameters.
	pub url: Url,
	/// Header name/value pairs in insertion order.
	pub headers: Vec<(String, String)>,
	/// JSON-encoded body bytes, if any.
	pub body: Option<Vec<u8>>,
}

/// Owned response snapshot returned by every transport.
#[derive(Clone, Debug)]
pub struct SessionResponse {
	status: u16,
	headers: Vec<(String, String)>,
	body: Vec<u8>,
}
impl SessionResponse {
	/// Builds a response snapshot; used by transports and test fakes.
	pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
		Self { status, headers, body }
	}

	/// Returns the HTTP status code.
	pub fn status(&self) -> u16 {
		self.status
	}

	/// Returns whether the status is in the 2xx range.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns the first header value stored under the (case-insensitive) name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(existing, _)| existing.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Returns the raw body bytes.
	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Returns the body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}

	/// Decodes the body as JSON into the requested type.
	pub fn json<T>(&self) -> Result<T>
	where
		T: for<'de> Deserialize<'de>,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::Decode { source, status: self.status })
	}

	/// Decodes the body as a JSON value, falling back to `Null` for empty or non-JSON bodies.
	pub(crate) fn json_value_or_null(&self) -> serde_json::Value {
		if self.body.is_empty() {
			return serde_json::Value::Null;
		}

		serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
	}

	/// Returns a truncated body preview suitable for error messages and logs.
	pub(crate) fn body_preview(&self) -> String {
		const PREVIEW_LIMIT: usize = 2048;

		let text = self.text();

		match text.char_indices().nth(PREVIEW_LIMIT) {
			Some((boundary, _)) => text[..boundary].to_owned(),
			None => text.into_owned(),
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The wrapper performs no status-based error mapping and follows whatever redirect
/// policy the inner client was built with; pass a custom [`ReqwestClient`] through
/// [`ReqwestTransport::with_client`] to adjust timeouts, proxies, or TLS settings.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl SessionTransport for ReqwestTransport {
	fn execute(&self, request: TransportRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client.request(reqwest_method(request.method), request.url.clone());

			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder =
					builder.header(reqwest::header::CONTENT_TYPE, "application/json").body(body);
			}

			let response = builder.send().await.map_err(|e| {
				if e.is_builder() {
					TransportError::Build { message: e.to_string() }
				} else {
					TransportError::from(e)
				}
			})?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.to_string(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(SessionResponse::new(status, headers, body))
		})
	}
}

#[cfg(feature = "reqwest")]
fn reqwest_method(method: Method) -> reqwest::Method {
	match method {
		Method::Get => reqwest::Method::GET,
		Method::Post => reqwest::Method::POST,
		Method::Put => reqwest::Method::PUT,
		Method::Patch => reqwest::Method::PATCH,
		Method::Delete => reqwest::Method::DELETE,
	}
}
