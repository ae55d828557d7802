//! Persisted auth-state contracts and built-in storage backends.
//!
//! The console keeps one JSON blob under [`AUTH_STATE_KEY`]; the session client reads it
//! fresh before every request and only consumes the `activeSchoolId` field. The blob is
//! owned by the sign-in feature: it is rewritten whenever the user signs in, switches the
//! active school, or signs out, and this crate treats everything but the tenant id as
//! opaque payload to be carried through untouched.

pub mod file;
pub mod memory;

pub use file::FileAuthStore;
pub use memory::MemoryAuthStore;

// std
use std::borrow::Borrow;
// self
use crate::_prelude::*;

/// Well-known storage key holding the console's persisted auth state.
pub const AUTH_STATE_KEY: &str = "kuskul_auth";

const SCHOOL_ID_MAX_LEN: usize = 128;

/// Boxed future returned by [`AuthStateStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key/value contract over the console's client-side persistent storage.
///
/// Backends map string keys to JSON blobs. The session client only ever calls
/// [`load`](AuthStateStore::load); `save`/`remove` exist for the sign-in feature and for
/// test fixtures that seed or clear the persisted state.
pub trait AuthStateStore
where
	Self: Send + Sync,
{
	/// Returns the blob stored under `key`, if present.
	fn load<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Persists or replaces the blob stored under `key`.
	fn save<'a>(&'a self, key: &'a str, blob: String) -> StoreFuture<'a, ()>;

	/// Removes and returns the blob stored under `key`.
	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;
}

/// Error type produced by [`AuthStateStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// The subset of the persisted auth blob the session client understands.
///
/// Unknown fields are preserved through the flattened `rest` map so reading and
/// rewriting the blob never drops state owned by other features.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PersistedAuthState {
	/// Identifier of the school the user is currently operating on.
	#[serde(default, rename = "activeSchoolId", skip_serializing_if = "Option::is_none")]
	pub active_school_id: Option<SchoolId>,
	/// Remaining blob fields owned by the sign-in feature; carried through untouched.
	#[serde(flatten)]
	pub rest: serde_json::Map<String, serde_json::Value>,
}

/// Validated identifier of a school tenant.
///
/// Values are restricted to non-empty ASCII-graphic strings so an injected
/// `X-School-Id` header is always a legal header value.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchoolId(String);
impl SchoolId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, SchoolIdError> {
		let view = value.as_ref();

		validate_school_id(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl AsRef<str> for SchoolId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for SchoolId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<SchoolId> for String {
	fn from(value: SchoolId) -> Self {
		value.0
	}
}
impl TryFrom<String> for SchoolId {
	type Error = SchoolIdError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_school_id(&value)?;

		Ok(Self(value))
	}
}
impl FromStr for SchoolId {
	type Err = SchoolIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}
impl Debug for SchoolId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "School({})", self.0)
	}
}
impl Display for SchoolId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Error returned when school identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum SchoolIdError {
	/// The identifier was empty.
	#[error("School identifier cannot be empty.")]
	Empty,
	/// The identifier contains characters that cannot travel in a header value.
	#[error("School identifier contains non-printable or non-ASCII characters.")]
	InvalidCharacters,
	/// The identifier exceeded the allowed character count.
	#[error("School identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

fn validate_school_id(view: &str) -> Result<(), SchoolIdError> {
	if view.is_empty() {
		return Err(SchoolIdError::Empty);
	}
	if !view.chars().all(|c| c.is_ascii_graphic()) {
		return Err(SchoolIdError::InvalidCharacters);
	}
	if view.len() > SCHOOL_ID_MAX_LEN {
		return Err(SchoolIdError::TooLong { max: SCHOOL_ID_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn school_id_validation_rejects_header_unsafe_values() {
		assert_eq!(SchoolId::new(""), Err(SchoolIdError::Empty));
		assert_eq!(SchoolId::new("school one"), Err(SchoolIdError::InvalidCharacters));
		assert_eq!(SchoolId::new("école"), Err(SchoolIdError::InvalidCharacters));
		assert_eq!(
			SchoolId::new("s".repeat(SCHOOL_ID_MAX_LEN + 1)),
			Err(SchoolIdError::TooLong { max: SCHOOL_ID_MAX_LEN }),
		);

		let id = SchoolId::new("school-42").expect("School fixture should be valid.");

		assert_eq!(id.as_ref(), "school-42");
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let id: SchoolId =
			serde_json::from_str("\"school-7\"").expect("School id should deserialize.");

		assert_eq!(id.as_ref(), "school-7");
		assert!(serde_json::from_str::<SchoolId>("\"with space\"").is_err());
	}

	#[test]
	fn persisted_state_keeps_unknown_fields() {
		let blob = "{\"activeSchoolId\":\"school-1\",\"accessToken\":\"jwt\",\"theme\":\"dark\"}";
		let state: PersistedAuthState =
			serde_json::from_str(blob).expect("Auth blob fixture should parse.");

		assert_eq!(state.active_school_id.as_ref().map(AsRef::as_ref), Some("school-1"));
		assert_eq!(state.rest.get("theme"), Some(&serde_json::Value::String("dark".into())));

		let rewritten = serde_json::to_string(&state).expect("Auth blob should reserialize.");

		assert!(rewritten.contains("accessToken"));
	}

	#[test]
	fn persisted_state_tolerates_missing_tenant() {
		let state: PersistedAuthState =
			serde_json::from_str("{\"accessToken\":\"jwt\"}").expect("Blob should parse.");

		assert!(state.active_school_id.is_none());
	}

	#[test]
	fn invalid_tenant_fails_whole_blob_parse() {
		// The caller treats a failed parse as "no tenant": request proceeds headerless.
		assert!(serde_json::from_str::<PersistedAuthState>("{\"activeSchoolId\":\"has space\"}").is_err());
	}
}
