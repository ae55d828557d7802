//! Demonstrates the session client against a mock console API: tenant header injection
//! from the persisted auth blob, plus the non-throwing `safe` call surface.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use kuskul_session_client::{
	request::{Method, RequestDescriptor},
	session::SessionClient,
	store::{AUTH_STATE_KEY, AuthStateStore, MemoryAuthStore},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let store = Arc::new(MemoryAuthStore::default());

	store.seed(AUTH_STATE_KEY, "{\"activeSchoolId\":\"school-demo\",\"accessToken\":\"jwt\"}");

	let server = MockServer::start_async().await;
	let students_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/students").header("X-School-Id", "school-demo");
			then.status(200)
				.header("content-type", "application/json")
				.body("[{\"id\":1,\"name\":\"Ada\"}]");
		})
		.await;
	let reports_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/reports");
			then.status(500)
				.header("content-type", "application/json")
				.body("{\"error\":\"storage unavailable\"}");
		})
		.await;
	let store: Arc<dyn AuthStateStore> = store;
	let client = SessionClient::new(Url::parse(&server.base_url())?, store)?;
	let students = client.get("/students").await?.json::<serde_json::Value>()?;

	println!("Students for the active school: {students}.");

	let report = client.safe(RequestDescriptor::new(Method::Get, "/reports")).await?;

	println!("Report fetch captured: ok={}, status={}, data={}.", report.ok, report.status, report.data);

	students_mock.assert_async().await;
	reports_mock.assert_async().await;

	Ok(())
}
