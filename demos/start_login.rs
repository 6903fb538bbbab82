//! Walks through starting a login, handling the provider's redirect, and reading the
//! stored session back.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use url::Url;
// self
use cafe_sdk::{
	auth::{Authenticator, ResponseType},
	env::Environment,
	store::{MemoryStore, SessionStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::default());
	let authenticator = Authenticator::new(store, Environment::local().auth);

	// Code sessions carry a PKCE pair; the verifier never leaves the session.
	let code_session = authenticator.start_login(ResponseType::Code)?;

	if let (Some(challenge), Some(method)) =
		(code_session.code_challenge(), code_session.code_challenge_method())
	{
		println!("PKCE challenge ({}): {challenge}.", method.as_str());
	}

	let session = authenticator.start_login(ResponseType::Token)?;

	println!("Send the barista to {}.", &session.authorize_url);

	// Simulate the provider bouncing straight back with a fragment credential.
	let redirected = Url::parse(&format!(
		"http://localhost:8100/#access_token=demo-token&token_type=Bearer&expires_in=7200&state={}",
		session.state,
	))?;
	let token = authenticator.complete_login(&session, &redirected).await?;

	println!(
		"Login produced a {} token valid for another {} seconds.",
		token.status(),
		token.remaining().whole_seconds()
	);

	let stored = authenticator.current_session().await?;

	println!("Store now holds an active session: {}.", stored.is_some());

	Ok(())
}
