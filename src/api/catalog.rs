//! Menu reads: the public short form and the barista-level long form.

// crates.io
use reqwest::Method;
// self
use crate::{
	_prelude::*,
	api::{DrinksEnvelope, ShopClient},
	auth::AccessToken,
	menu::{Drink, DrinkSummary},
	obs::{self, OpKind},
};

impl ShopClient {
	/// Fetches the menu in its short form.
	///
	/// No credential is attached; the service keeps this route public.
	pub async fn menu(&self) -> Result<Vec<DrinkSummary>> {
		obs::run_op(OpKind::MenuList, "menu", async move {
			let request = self.http_client.request(Method::GET, "drinks")?;
			let envelope: DrinksEnvelope<Vec<DrinkSummary>> = self.send_and_decode(request).await?;

			Ok(envelope.drinks)
		})
		.await
	}

	/// Fetches the menu in its long form; the token must carry `get:drinks-detail`.
	pub async fn menu_detail(&self, token: &AccessToken) -> Result<Vec<Drink>> {
		obs::run_op(OpKind::MenuDetail, "menu_detail", async move {
			let request = self
				.http_client
				.request(Method::GET, "drinks-detail")?
				.bearer_auth(token.secret.expose());
			let envelope: DrinksEnvelope<Vec<Drink>> = self.send_and_decode(request).await?;

			Ok(envelope.drinks)
		})
		.await
	}
}
