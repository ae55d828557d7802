// std
use std::{
	sync::{
		Arc, Mutex,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration,
};
// self
use kuskul_session_client::{
	error::Error,
	http::{SessionResponse, SessionTransport, TransportFuture, TransportRequest},
	request::Method,
	session::{REFRESH_PATH, SessionClient, TENANT_HEADER},
	store::{AUTH_STATE_KEY, AuthStateStore, MemoryAuthStore},
	url::Url,
};

#[derive(Clone, Debug)]
struct CallRecord {
	method: Method,
	path: String,
	school: Option<String>,
}

/// Scripted transport: protected endpoints answer 401 until the refresh endpoint has
/// been hit successfully, then 200. The refresh call sleeps before settling so that a
/// burst of concurrent 401s is reliably in flight while the refresh is outstanding.
struct ScriptedTransport {
	calls: Arc<Mutex<Vec<CallRecord>>>,
	renewed: Arc<AtomicBool>,
	refresh_status: u16,
	refresh_delay: Duration,
}
impl ScriptedTransport {
	fn new(refresh_status: u16) -> Self {
		Self {
			calls: Arc::new(Mutex::new(Vec::new())),
			renewed: Arc::new(AtomicBool::new(false)),
			refresh_status,
			refresh_delay: Duration::from_millis(50),
		}
	}

	fn renewed_upfront(self) -> Self {
		self.renewed.store(true, Ordering::SeqCst);

		self
	}

	fn recorded_calls(&self) -> Vec<CallRecord> {
		self.calls.lock().expect("Call log lock should not be poisoned.").clone()
	}
}
impl SessionTransport for ScriptedTransport {
	fn execute(&self, request: TransportRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let path = request.url.path().to_owned();
			let school = request
				.headers
				.iter()
				.find(|(name, _)| name.eq_ignore_ascii_case(TENANT_HEADER))
				.map(|(_, value)| value.clone());

			self.calls
				.lock()
				.expect("Call log lock should not be poisoned.")
				.push(CallRecord { method: request.method, path: path.clone(), school });

			if path == REFRESH_PATH {
				tokio::time::sleep(self.refresh_delay).await;

				if (200..300).contains(&self.refresh_status) {
					self.renewed.store(true, Ordering::SeqCst);
				}

				return Ok(SessionResponse::new(self.refresh_status, Vec::new(), Vec::new()));
			}

			if self.renewed.load(Ordering::SeqCst) {
				Ok(SessionResponse::new(200, Vec::new(), b"{\"ok\":true}".to_vec()))
			} else {
				Ok(SessionResponse::new(401, Vec::new(), b"{\"error\":\"expired\"}".to_vec()))
			}
		})
	}
}

fn build_client(
	transport: ScriptedTransport,
	blob: Option<&str>,
) -> (SessionClient<ScriptedTransport>, Arc<ScriptedTransport>) {
	let store = Arc::new(MemoryAuthStore::default());

	if let Some(blob) = blob {
		store.seed(AUTH_STATE_KEY, blob);
	}

	let store: Arc<dyn AuthStateStore> = store;
	let transport = Arc::new(transport);
	let base = Url::parse("https://api.kuskul.test").expect("Test base URL should parse.");
	let client = SessionClient::with_transport(base, store, transport.clone())
		.expect("Session client should build for the scripted transport.");

	(client, transport)
}

fn occurrences(calls: &[CallRecord], path: &str) -> Vec<usize> {
	calls
		.iter()
		.enumerate()
		.filter(|(_, call)| call.path == path)
		.map(|(index, _)| index)
		.collect()
}

#[tokio::test]
async fn concurrent_expiries_share_one_refresh_and_replay_once_each() {
	let (client, transport) =
		build_client(ScriptedTransport::new(200), Some("{\"activeSchoolId\":\"school-1\"}"));
	let (a, b, c) = tokio::join!(client.get("/a"), client.get("/b"), client.get("/c"));

	assert_eq!(a.expect("Replayed /a should succeed after renewal.").status(), 200);
	assert_eq!(b.expect("Replayed /b should succeed after renewal.").status(), 200);
	assert_eq!(c.expect("Replayed /c should succeed after renewal.").status(), 200);

	let calls = transport.recorded_calls();
	let refreshes = occurrences(&calls, REFRESH_PATH);

	assert_eq!(refreshes.len(), 1, "Exactly one refresh call must be observed.");
	assert_eq!(client.refresh_metrics.attempts(), 1);

	for path in ["/a", "/b", "/c"] {
		let hits = occurrences(&calls, path);

		assert_eq!(hits.len(), 2, "{path} must be issued once and replayed once.");
		assert!(
			hits[1] > refreshes[0],
			"{path} must be replayed only after the refresh resolved.",
		);
	}
}

#[tokio::test]
async fn followers_surface_their_original_401_when_refresh_fails() {
	let (client, transport) =
		build_client(ScriptedTransport::new(500), Some("{\"activeSchoolId\":\"school-1\"}"));
	let (a, b, c) = tokio::join!(client.get("/a"), client.get("/b"), client.get("/c"));

	for result in [a, b, c] {
		let err = result.expect_err("Each caller should surface its original 401.");

		assert!(matches!(err, Error::Http { status: 401, .. }));
	}

	let calls = transport.recorded_calls();

	assert_eq!(occurrences(&calls, REFRESH_PATH).len(), 1, "Failures share one refresh too.");

	// No replays happened: each protected path was hit exactly once.
	for path in ["/a", "/b", "/c"] {
		assert_eq!(occurrences(&calls, path).len(), 1);
	}

	assert_eq!(client.refresh_metrics.failures(), 1);
}

#[tokio::test]
async fn tenant_header_reflects_persisted_state() {
	let (client, transport) = build_client(
		ScriptedTransport::new(200).renewed_upfront(),
		Some("{\"activeSchoolId\":\"school-9\",\"theme\":\"dark\"}"),
	);

	client.get("/sections").await.expect("GET should succeed with a renewed session.");

	let calls = transport.recorded_calls();

	assert_eq!(calls[0].school.as_deref(), Some("school-9"));
	assert_eq!(calls[0].method, Method::Get);
}

#[tokio::test]
async fn missing_or_malformed_state_sends_no_tenant_header() {
	for blob in [None, Some("not-json"), Some("{\"accessToken\":\"jwt\"}")] {
		let (client, transport) = build_client(ScriptedTransport::new(200).renewed_upfront(), blob);

		client.get("/terms").await.expect("Request must still be sent without a tenant header.");

		let calls = transport.recorded_calls();

		assert_eq!(calls[0].school, None, "Blob {blob:?} must not produce a tenant header.");
	}
}

#[tokio::test]
async fn replay_rereads_the_persisted_state() {
	let store = Arc::new(MemoryAuthStore::default());

	store.seed(AUTH_STATE_KEY, "{\"activeSchoolId\":\"school-1\"}");

	let transport = Arc::new(ScriptedTransport::new(200));
	let base = Url::parse("https://api.kuskul.test").expect("Test base URL should parse.");
	let seeding_store = store.clone();
	let store: Arc<dyn AuthStateStore> = store;
	let client: SessionClient<ScriptedTransport> =
		SessionClient::with_transport(base, store, transport.clone())
			.expect("Session client should build for the scripted transport.");

	// Switch the active school while the 401 is being recovered; the replay reads the
	// store fresh and must carry the new tenant.
	let switcher = async {
		tokio::time::sleep(Duration::from_millis(10)).await;
		seeding_store.seed(AUTH_STATE_KEY, "{\"activeSchoolId\":\"school-2\"}");
	};
	let (result, ()) = tokio::join!(client.get("/exams"), switcher);

	result.expect("Replayed request should succeed after renewal.");

	let calls = transport.recorded_calls();
	let hits = occurrences(&calls, "/exams");

	assert_eq!(hits.len(), 2);
	assert_eq!(calls[hits[0]].school.as_deref(), Some("school-1"));
	assert_eq!(calls[hits[1]].school.as_deref(), Some("school-2"));
}
