//! Request descriptors passed through the session client's dispatch pipeline.

// self
use crate::_prelude::*;

/// HTTP verbs exposed by the session client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// HTTP GET.
	Get,
	/// HTTP POST.
	Post,
	/// HTTP PUT.
	Put,
	/// HTTP PATCH.
	Patch,
	/// HTTP DELETE.
	Delete,
}
impl Method {
	/// Returns the canonical wire representation of the verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// A request about to be sent: verb, path, headers, query, and JSON body.
///
/// The internal `retried` flag records that the call already went through one
/// refresh-and-replay cycle; a descriptor is never retried twice.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
	method: Method,
	path: String,
	headers: Vec<(String, String)>,
	query: Vec<(String, String)>,
	body: Option<serde_json::Value>,
	retried: bool,
}
impl RequestDescriptor {
	/// Creates a descriptor for the provided verb and path (relative to the client's base URL).
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: Vec::new(), query: Vec::new(), body: None, retried: false }
	}

	/// Appends a request header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Appends a query parameter.
	pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));

		self
	}

	/// Attaches a JSON body serialized from the provided value.
	pub fn json<B>(mut self, body: &B) -> Result<Self>
	where
		B: ?Sized + Serialize,
	{
		self.body =
			Some(serde_json::to_value(body).map_err(crate::error::ConfigError::InvalidBody)?);

		Ok(self)
	}

	/// Attaches an already-built JSON body.
	pub fn json_value(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Returns the request verb.
	pub fn method(&self) -> Method {
		self.method
	}

	/// Returns the request path.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Returns the accumulated headers.
	pub fn headers(&self) -> &[(String, String)] {
		&self.headers
	}

	/// Returns the accumulated query parameters.
	pub fn query_pairs(&self) -> &[(String, String)] {
		&self.query
	}

	/// Returns the JSON body, if any.
	pub fn body(&self) -> Option<&serde_json::Value> {
		self.body.as_ref()
	}

	/// Returns whether this call already consumed its single refresh-and-replay cycle.
	pub fn retried(&self) -> bool {
		self.retried
	}

	pub(crate) fn mark_retried(&mut self) {
		self.retried = true;
	}

	/// Sets a header, replacing any existing value under the same (case-insensitive) name.
	pub(crate) fn set_header(&mut self, name: &str, value: impl Into<String>) {
		self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
		self.headers.push((name.to_owned(), value.into()));
	}
}
