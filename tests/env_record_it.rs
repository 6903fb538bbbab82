#![cfg(feature = "reqwest")]

// self
use cafe_sdk::{_preludet::*, api::ShopClient, auth::ResponseType, env::Environment};

#[test]
fn collaborators_consume_the_record_without_transforming_it() {
	let environment = test_environment("http://127.0.0.1:5000");
	let client = ShopClient::new(&environment);

	assert_eq!(
		client
			.http_client
			.endpoint("drinks")
			.expect("The drinks route should derive from the record.")
			.as_str(),
		"http://127.0.0.1:5000/drinks"
	);
	assert_eq!(
		client
			.http_client
			.endpoint("drinks-detail")
			.expect("The detail route should derive from the record.")
			.as_str(),
		"http://127.0.0.1:5000/drinks-detail"
	);

	let (authenticator, _store) = build_test_authenticator(environment.auth.clone());
	let session = authenticator
		.start_login(ResponseType::Token)
		.expect("A login session should start from the record.");
	let pairs: HashMap<_, _> = session.authorize_url.query_pairs().into_owned().collect();

	assert!(
		session.authorize_url.as_str().starts_with("https://srtkoolice.auth0.com/authorize?"),
		"The authorize URL should target the record's tenant."
	);
	assert_eq!(pairs.get("audience"), Some(&"udacity-coffee-shop".into()));
	assert_eq!(pairs.get("client_id"), Some(&"BW64Ne4bk6iWSQaPbAvFMD8xU8QvXUYW".into()));
	assert_eq!(pairs.get("redirect_uri"), Some(&"http://localhost:8100/".into()));
	assert_eq!(pairs.get("response_type"), Some(&"token".into()));
}

#[test]
fn record_round_trips_for_both_build_variants() {
	let development = Environment::local();
	let production = Environment {
		production: true,
		api_server_url: Url::parse("https://api.coffee.example.com")
			.expect("The production base URL fixture should parse."),
		..development.clone()
	};

	for record in [development, production] {
		let encoded = serde_json::to_string(&record).expect("The record should serialize to JSON.");
		let decoded: Environment =
			serde_json::from_str(&encoded).expect("The record should deserialize back.");

		assert_eq!(decoded, record);
	}
}
