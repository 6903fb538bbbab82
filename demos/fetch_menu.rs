//! Fetches the public menu from a mocked drinks service and prints each glass in its
//! short form.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use cafe_sdk::{api::ShopClient, env::Environment};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let menu_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/drinks");
			then.status(200).header("content-type", "application/json").body(
				r#"{
					"success": true,
					"drinks": [
						{
							"id": 1,
							"title": "matcha shake",
							"recipe": [
								{ "color": "grey", "parts": 1 },
								{ "color": "green", "parts": 3 }
							]
						},
						{
							"id": 2,
							"title": "flatwhite",
							"recipe": [
								{ "color": "grey", "parts": 3 },
								{ "color": "brown", "parts": 1 }
							]
						}
					]
				}"#,
			);
		})
		.await;
	let environment = Environment::builder()
		.api_server_url(Url::parse(&server.base_url())?)
		.auth(Environment::local().auth)
		.build()?;
	let client = ShopClient::new(&environment);
	let menu = client.menu().await?;

	println!("The menu lists {} drinks.", menu.len());

	for drink in &menu {
		let glass = drink
			.recipe
			.iter()
			.map(|part| format!("{} x{}", part.color, part.parts))
			.collect::<Vec<_>>()
			.join(", ");

		println!("#{} {}: {glass}.", drink.id, drink.title);
	}

	menu_mock.assert_async().await;

	Ok(())
}
