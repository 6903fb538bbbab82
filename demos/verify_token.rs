//! Decodes a demo token's claims without verification, then shows how the verifier
//! classifies a token whose signing key the published key set does not contain.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
use time::OffsetDateTime;
use url::Url;
// self
use cafe_sdk::{
	auth::{self, Verifier},
	env::Environment,
};

fn demo_jwt(header: &serde_json::Value, claims: &serde_json::Value) -> String {
	let encode = |value: &serde_json::Value| {
		URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).expect("Segments should serialize."))
	};

	format!("{}.{}.sig", encode(header), encode(claims))
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let params = Environment::local().auth;
	let now = OffsetDateTime::now_utc().unix_timestamp();
	let raw = demo_jwt(
		&json!({ "alg": "RS256", "typ": "JWT", "kid": "demo-key" }),
		&json!({
			"iss": "https://srtkoolice.auth0.com/",
			"sub": "auth0|barista",
			"aud": "udacity-coffee-shop",
			"iat": now,
			"exp": now + 28_800,
			"permissions": ["get:drinks-detail", "post:drinks"],
		}),
	);
	let header = format!("Bearer {raw}");
	let token = auth::bearer_token(&header)?;
	let claims = auth::decode_claims_unverified(token)?;

	println!(
		"Unverified claims: subject {} holds [{}].",
		claims.sub.as_deref().unwrap_or("<none>"),
		claims.permissions.join(", ")
	);

	// An empty key set cannot contain `demo-key`, so verification classifies the
	// token as naming an unknown key.
	let server = MockServer::start_async().await;
	let jwks_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/.well-known/jwks.json");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "keys": [] }));
		})
		.await;
	let verifier = Verifier::from_params(&params)?
		.with_jwks_url(Url::parse(&server.url("/.well-known/jwks.json"))?);

	match verifier.verify(token).await {
		Ok(_) => println!("Token verified."),
		Err(error) => println!("Verification rejected the token: {error}"),
	}

	jwks_mock.assert_async().await;

	Ok(())
}
