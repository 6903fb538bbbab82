#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use cafe_sdk::{
	_preludet::*,
	auth::{AccessToken, AuthError, ResponseType, TokenSecret},
	env::{AuthParams, TenantDomain},
	error::ConfigError,
	store::{SessionRecord, SessionStore},
};

fn mock_params(server: &MockServer) -> AuthParams {
	let domain = TenantDomain::new(format!("127.0.0.1:{}", server.port()))
		.expect("The mock tenant domain should be valid.");
	let callback_url =
		Url::parse("http://localhost:8100").expect("The callback URL fixture should parse.");

	AuthParams::builder()
		.domain(domain)
		.audience("udacity-coffee-shop")
		.client_id("client-it")
		.callback_url(callback_url)
		.build()
		.expect("The mock auth parameters should assemble.")
}

fn fragment_redirect(state: &str) -> Url {
	Url::parse(&format!(
		"http://localhost:8100/#access_token=fragment-token&token_type=Bearer&expires_in=7200&state={state}",
	))
	.expect("The fragment redirect fixture should parse.")
}

#[tokio::test]
async fn implicit_login_round_trips_through_the_fragment() {
	let (authenticator, store) = build_test_authenticator(test_auth_params());
	let session = authenticator
		.start_login(ResponseType::Token)
		.expect("An implicit session should start.");

	assert!(session.nonce.is_some());
	assert!(session.code_challenge().is_none());

	let token = authenticator
		.complete_login(&session, &fragment_redirect(&session.state))
		.await
		.expect("The implicit login should complete.");

	assert_eq!(token.secret.expose(), "fragment-token");
	assert!(token.is_active());

	let current = authenticator
		.current_session()
		.await
		.expect("Reading the current session should succeed.")
		.expect("An active session should be stored.");

	assert_eq!(current.secret.expose(), "fragment-token");

	let stored = store
		.load(&authenticator.session_key())
		.await
		.expect("Loading the raw record should succeed.")
		.expect("The raw record should be present.");

	assert_eq!(stored.audience, "udacity-coffee-shop");
	assert_eq!(stored.key.host, "srtkoolice.auth0.com");
}

#[tokio::test]
async fn code_login_exchanges_the_code_against_the_token_endpoint() {
	let server = MockServer::start_async().await;
	let (authenticator, store) = build_test_authenticator(mock_params(&server));
	let session =
		authenticator.start_login(ResponseType::Code).expect("A code session should start.");

	assert!(session.nonce.is_none());
	assert!(session.code_challenge().is_some());

	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"code-access\",\"token_type\":\"bearer\",\"expires_in\":28800}",
			);
		})
		.await;
	let redirected = Url::parse(&format!(
		"http://localhost:8100/?code=valid-code&state={}",
		session.state
	))
	.expect("The query redirect fixture should parse.");
	let token = authenticator
		.complete_login(&session, &redirected)
		.await
		.expect("The code login should complete.");

	mock.assert_async().await;

	assert_eq!(token.secret.expose(), "code-access");
	assert!(token.is_active());

	let stored = store
		.load(&authenticator.session_key())
		.await
		.expect("Loading the stored session should succeed.")
		.expect("The exchanged token should be stored.");

	assert_eq!(stored.token.secret.expose(), "code-access");
	assert_eq!(stored.key.host, format!("127.0.0.1:{}", server.port()));
}

#[tokio::test]
async fn invalid_grants_classify_as_rejections_and_leave_no_session() {
	let server = MockServer::start_async().await;
	let (authenticator, store) = build_test_authenticator(mock_params(&server));
	let session =
		authenticator.start_login(ResponseType::Code).expect("A code session should start.");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"code already used\"}");
		})
		.await;
	let redirected = Url::parse(&format!(
		"http://localhost:8100/?code=stale-code&state={}",
		session.state
	))
	.expect("The query redirect fixture should parse.");
	let err = authenticator
		.complete_login(&session, &redirected)
		.await
		.expect_err("A rejected grant should fail the login.");

	mock.assert_async().await;

	assert!(matches!(err, Error::Auth(AuthError::GrantRejected { .. })));

	let maybe_record = store
		.load(&authenticator.session_key())
		.await
		.expect("Loading after the failed exchange should succeed.");

	assert!(maybe_record.is_none(), "A failed exchange must not leave a session behind.");
}

#[tokio::test]
async fn callbacks_are_rejected_before_any_token_work() {
	let (authenticator, _store) = build_test_authenticator(test_auth_params());
	let session = authenticator
		.start_login(ResponseType::Token)
		.expect("An implicit session should start.");

	let denied = Url::parse(&format!(
		"http://localhost:8100/#error=access_denied&error_description=user%20cancelled&state={}",
		session.state
	))
	.expect("The denial redirect fixture should parse.");
	let err = authenticator
		.complete_login(&session, &denied)
		.await
		.expect_err("A provider denial should fail the login.");

	assert!(matches!(
		err,
		Error::Auth(AuthError::Denied { ref reason }) if reason == "user cancelled"
	));

	let forged = fragment_redirect("forged-state");
	let err = authenticator
		.complete_login(&session, &forged)
		.await
		.expect_err("A state mismatch should fail the login.");

	assert!(matches!(err, Error::Auth(AuthError::StateMismatch)));
}

#[tokio::test]
async fn exchanging_from_an_implicit_session_is_a_config_error() {
	let (authenticator, _store) = build_test_authenticator(test_auth_params());
	let session = authenticator
		.start_login(ResponseType::Token)
		.expect("An implicit session should start.");
	let err = authenticator
		.exchange_code(&session, "any-code")
		.await
		.expect_err("Implicit sessions hold no PKCE verifier to exchange with.");

	assert!(matches!(err, Error::Config(ConfigError::ResponseTypeMismatch)));
}

#[tokio::test]
async fn expired_sessions_read_back_as_absent_but_stay_stored() {
	let (authenticator, store) = build_test_authenticator(test_auth_params());
	let issued_at = OffsetDateTime::now_utc() - Duration::hours(9);
	let record = SessionRecord {
		key: authenticator.session_key(),
		audience: "udacity-coffee-shop".into(),
		token: AccessToken::new(
			TokenSecret::from("stale-token"),
			issued_at,
			Duration::hours(8),
		),
	};

	store.save(record).await.expect("Seeding the store should succeed.");

	let current = authenticator
		.current_session()
		.await
		.expect("Reading the current session should succeed.");

	assert!(current.is_none(), "An expired token must not be reported as a session.");

	let forgotten = authenticator
		.forget_session()
		.await
		.expect("Forgetting the session should succeed.")
		.expect("The expired token should still be evictable.");

	assert_eq!(forgotten.secret.expose(), "stale-token");

	let emptied = authenticator
		.forget_session()
		.await
		.expect("Forgetting an empty store should succeed.");

	assert!(emptied.is_none());
}
