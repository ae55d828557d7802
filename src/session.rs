//! The authenticated-session client: public verbs, tenant header injection, and
//! transparent 401 recovery.
//!
//! Every outgoing request reads the persisted auth blob and attaches the active
//! school's `X-School-Id` header. When a response comes back 401 from anything other
//! than the refresh endpoint, the client coordinates one shared `POST /auth/refresh`
//! across all concurrently failing calls and replays each of them exactly once; see
//! [`refresh`] for the single-flight mechanics.

pub mod refresh;

pub use refresh::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{SessionResponse, SessionTransport, TransportRequest},
	obs::{self, RequestOutcome, RequestPhase, RequestSpan},
	request::{Method, RequestDescriptor},
	session::refresh::{RefreshGate, RefreshOutcome, RefreshTicket},
	store::{AUTH_STATE_KEY, AuthStateStore, PersistedAuthState},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Header carrying the active school identifier on every request.
pub const TENANT_HEADER: &str = "X-School-Id";
/// Default path of the session refresh endpoint.
pub const REFRESH_PATH: &str = "/auth/refresh";

const STATUS_UNAUTHORIZED: u16 = 401;

#[cfg(feature = "reqwest")]
/// Session client specialized for the crate's default reqwest transport.
pub type ReqwestSessionClient = SessionClient<ReqwestTransport>;

/// Tagged outcome returned by [`SessionClient::safe`].
///
/// `ok` mirrors "status in the 2xx range"; `data` is the JSON body (or `Null` when the
/// body is empty or not JSON). HTTP error statuses never turn into an `Err` on this
/// surface — only transport and configuration failures do.
#[derive(Clone, Debug)]
pub struct SafeResponse {
	/// Whether the final status was a success.
	pub ok: bool,
	/// Final HTTP status observed for the call.
	pub status: u16,
	/// Decoded JSON body.
	pub data: serde_json::Value,
}
impl SafeResponse {
	/// Decodes `data` into the requested type.
	pub fn data_as<T>(&self) -> Result<T>
	where
		T: for<'de> Deserialize<'de>,
	{
		serde_path_to_error::deserialize(self.data.clone())
			.map_err(|source| Error::Decode { source, status: self.status })
	}
}

/// Coordinates authenticated requests against one console API server.
///
/// The client owns the transport, the persisted auth-state store, and the single-flight
/// refresh gate. Cloning is cheap and clones share all three, so a whole application can
/// pass one client around by value.
pub struct SessionClient<T>
where
	T: ?Sized + SessionTransport,
{
	/// Transport used for every outbound request, including the refresh call.
	pub transport: Arc<T>,
	/// Persistent store holding the console's auth blob.
	pub store: Arc<dyn AuthStateStore>,
	/// Base URL all request paths are resolved against.
	pub base_url: Url,
	/// Shared counters for refresh cycles.
	pub refresh_metrics: Arc<RefreshMetrics>,
	refresh_path: String,
	default_headers: Vec<(String, String)>,
	gate: RefreshGate,
}
impl<T> SessionClient<T>
where
	T: ?Sized + SessionTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		base_url: Url,
		store: Arc<dyn AuthStateStore>,
		transport: impl Into<Arc<T>>,
	) -> Result<Self> {
		if base_url.cannot_be_a_base() {
			return Err(ConfigError::InvalidBaseUrl { base: base_url.to_string() }.into());
		}

		Ok(Self {
			transport: transport.into(),
			store,
			base_url,
			refresh_metrics: Default::default(),
			refresh_path: REFRESH_PATH.into(),
			default_headers: Vec::new(),
			gate: RefreshGate::default(),
		})
	}

	/// Overrides the refresh endpoint path (defaults to [`REFRESH_PATH`]).
	pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Adds a header attached to every outgoing request.
	pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.default_headers.push((name.into(), value.into()));

		self
	}

	/// Issues a GET request; non-2xx statuses become [`Error::Http`] after recovery.
	pub async fn get(&self, path: &str) -> Result<SessionResponse> {
		self.request(RequestDescriptor::new(Method::Get, path)).await
	}

	/// Issues a DELETE request; non-2xx statuses become [`Error::Http`] after recovery.
	pub async fn delete(&self, path: &str) -> Result<SessionResponse> {
		self.request(RequestDescriptor::new(Method::Delete, path)).await
	}

	/// Issues a POST request with a JSON body.
	pub async fn post<B>(&self, path: &str, body: &B) -> Result<SessionResponse>
	where
		B: ?Sized + Serialize,
	{
		self.request(RequestDescriptor::new(Method::Post, path).json(body)?).await
	}

	/// Issues a PUT request with a JSON body.
	pub async fn put<B>(&self, path: &str, body: &B) -> Result<SessionResponse>
	where
		B: ?Sized + Serialize,
	{
		self.request(RequestDescriptor::new(Method::Put, path).json(body)?).await
	}

	/// Issues a PATCH request with a JSON body.
	pub async fn patch<B>(&self, path: &str, body: &B) -> Result<SessionResponse>
	where
		B: ?Sized + Serialize,
	{
		self.request(RequestDescriptor::new(Method::Patch, path).json(body)?).await
	}

	/// Issues a fully configured request; non-2xx statuses become [`Error::Http`].
	///
	/// A 401 goes through one shared refresh-and-replay cycle before the final status is
	/// classified, so a renewed session makes the expiry invisible to the caller.
	pub async fn request(&self, descriptor: RequestDescriptor) -> Result<SessionResponse> {
		let span = RequestSpan::new(RequestPhase::Dispatch, "request");

		obs::record_request_outcome(RequestPhase::Dispatch, RequestOutcome::Attempt);

		let result = span
			.instrument(async move {
				let (url, response) = self.dispatch(descriptor).await?;

				if response.is_success() {
					Ok(response)
				} else {
					Err(Error::Http {
						status: response.status(),
						url: url.to_string(),
						body: response.body_preview(),
					})
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_request_outcome(RequestPhase::Dispatch, RequestOutcome::Success),
			Err(_) => obs::record_request_outcome(RequestPhase::Dispatch, RequestOutcome::Failure),
		}

		result
	}

	/// Issues a request whose HTTP outcome is captured instead of thrown.
	///
	/// Recovery runs exactly as for [`request`](SessionClient::request); only the final
	/// representation differs. Non-2xx outcomes additionally emit a diagnostic log event
	/// with status, URL, and body preview.
	pub async fn safe(&self, descriptor: RequestDescriptor) -> Result<SafeResponse> {
		let span = RequestSpan::new(RequestPhase::Dispatch, "safe");

		obs::record_request_outcome(RequestPhase::Dispatch, RequestOutcome::Attempt);

		let result = span
			.instrument(async move {
				let (url, response) = self.dispatch(descriptor).await?;
				let ok = response.is_success();

				if !ok {
					obs::log_http_failure(
						response.status(),
						url.as_str(),
						&response.body_preview(),
					);
				}

				Ok(SafeResponse {
					ok,
					status: response.status(),
					data: response.json_value_or_null(),
				})
			})
			.await;

		match &result {
			Ok(_) => obs::record_request_outcome(RequestPhase::Dispatch, RequestOutcome::Success),
			Err(_) => obs::record_request_outcome(RequestPhase::Dispatch, RequestOutcome::Failure),
		}

		result
	}

	/// Runs one request through header injection, dispatch, and 401 recovery.
	async fn dispatch(
		&self,
		mut descriptor: RequestDescriptor,
	) -> Result<(Url, SessionResponse)> {
		self.inject_tenant_header(&mut descriptor).await;

		let url = self.resolve_url(&descriptor)?;
		let response = self.execute(&descriptor, url.clone()).await?;

		if response.status() != STATUS_UNAUTHORIZED
			|| descriptor.retried()
			|| self.targets_refresh(&descriptor)
		{
			return Ok((url, response));
		}

		// One refresh-and-replay per logical call.
		descriptor.mark_retried();

		let outcome = match self.gate.join().await {
			RefreshTicket::Leader(permit) => {
				let outcome = self.perform_refresh().await;

				permit.settle(outcome);

				outcome
			},
			RefreshTicket::Follower(outcome) => outcome,
		};

		match outcome {
			RefreshOutcome::Renewed => {
				// Fresh store read: the active school may have changed mid-flight.
				self.inject_tenant_header(&mut descriptor).await;

				let replayed = self.execute(&descriptor, url.clone()).await?;

				obs::record_request_outcome(
					RequestPhase::Replay,
					if replayed.is_success() {
						RequestOutcome::Success
					} else {
						RequestOutcome::Failure
					},
				);

				Ok((url, replayed))
			},
			// The original 401 surfaces unchanged when recovery fails.
			RefreshOutcome::Failed => Ok((url, response)),
		}
	}

	/// Performs the shared refresh call; any failure maps to [`RefreshOutcome::Failed`].
	async fn perform_refresh(&self) -> RefreshOutcome {
		let span = RequestSpan::new(RequestPhase::Refresh, "perform_refresh");

		obs::record_request_outcome(RequestPhase::Refresh, RequestOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let outcome = span
			.instrument(async {
				let mut descriptor = RequestDescriptor::new(Method::Post, self.refresh_path.clone());

				// The refresh request itself is exempt from recovery.
				descriptor.mark_retried();
				self.inject_tenant_header(&mut descriptor).await;

				let url = match self.resolve_url(&descriptor) {
					Ok(url) => url,
					Err(_) => return RefreshOutcome::Failed,
				};

				match self.execute(&descriptor, url).await {
					Ok(response) if response.is_success() => RefreshOutcome::Renewed,
					Ok(_) | Err(_) => RefreshOutcome::Failed,
				}
			})
			.await;

		match outcome {
			RefreshOutcome::Renewed => {
				obs::record_request_outcome(RequestPhase::Refresh, RequestOutcome::Success);
				self.refresh_metrics.record_success();
			},
			RefreshOutcome::Failed => {
				obs::record_request_outcome(RequestPhase::Refresh, RequestOutcome::Failure);
				self.refresh_metrics.record_failure();
			},
		}

		outcome
	}

	/// Reads the persisted auth blob and sets the tenant header on the descriptor.
	///
	/// This path never fails a request: storage errors, a missing blob, malformed JSON,
	/// and an absent tenant id all leave the descriptor headerless.
	async fn inject_tenant_header(&self, descriptor: &mut RequestDescriptor) {
		let blob = match self.store.load(AUTH_STATE_KEY).await {
			Ok(Some(blob)) => blob,
			Ok(None) | Err(_) => return,
		};
		let state = match serde_json::from_str::<PersistedAuthState>(&blob) {
			Ok(state) => state,
			Err(_) => return,
		};

		if let Some(school) = state.active_school_id {
			descriptor.set_header(TENANT_HEADER, school.as_ref());
		}
	}

	fn targets_refresh(&self, descriptor: &RequestDescriptor) -> bool {
		descriptor.path().contains(self.refresh_path.as_str())
	}

	fn resolve_url(&self, descriptor: &RequestDescriptor) -> Result<Url> {
		let mut url = self.base_url.join(descriptor.path()).map_err(|source| {
			ConfigError::InvalidPath { path: descriptor.path().to_owned(), source }
		})?;

		if !descriptor.query_pairs().is_empty() {
			let mut pairs = url.query_pairs_mut();

			for (name, value) in descriptor.query_pairs() {
				pairs.append_pair(name, value);
			}
		}

		Ok(url)
	}

	async fn execute(
		&self,
		descriptor: &RequestDescriptor,
		url: Url,
	) -> Result<SessionResponse> {
		let mut headers = self.default_headers.clone();

		headers.extend(descriptor.headers().iter().cloned());

		let body = match descriptor.body() {
			Some(value) => Some(serde_json::to_vec(value).map_err(ConfigError::InvalidBody)?),
			None => None,
		};
		let request = TransportRequest { method: descriptor.method(), url, headers, body };

		Ok(self.transport.execute(request).await?)
	}
}
#[cfg(feature = "reqwest")]
impl SessionClient<ReqwestTransport> {
	/// Creates a client with the crate's default reqwest transport.
	pub fn new(base_url: Url, store: Arc<dyn AuthStateStore>) -> Result<Self> {
		Self::with_transport(base_url, store, ReqwestTransport::default())
	}
}
// Not derived: the derive would require `T: Clone`, but clones only copy the `Arc`s.
impl<T> Clone for SessionClient<T>
where
	T: ?Sized + SessionTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			base_url: self.base_url.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			refresh_path: self.refresh_path.clone(),
			default_headers: self.default_headers.clone(),
			gate: self.gate.clone(),
		}
	}
}
impl<T> Debug for SessionClient<T>
where
	T: ?Sized + SessionTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionClient")
			.field("base_url", &self.base_url.as_str())
			.field("refresh_path", &self.refresh_path)
			.finish()
	}
}
