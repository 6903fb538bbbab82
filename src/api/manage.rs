//! Menu mutations: create, update, and delete drinks.

// crates.io
use reqwest::Method;
// self
use crate::{
	_prelude::*,
	api::{DeleteEnvelope, DrinksEnvelope, ShopClient},
	auth::AccessToken,
	error::ConfigError,
	menu::{Drink, DrinkDraft, DrinkPatch},
	obs::{self, OpKind},
};

impl ShopClient {
	/// Creates a drink; the token must carry `post:drinks`.
	///
	/// The draft is validated locally first, so payloads the service would answer
	/// 422 for never leave the process.
	pub async fn create_drink(&self, token: &AccessToken, draft: &DrinkDraft) -> Result<Drink> {
		obs::run_op(OpKind::DrinkCreate, "create_drink", async move {
			draft.validate().map_err(ConfigError::InvalidDraft)?;

			let request = self
				.http_client
				.request(Method::POST, "drinks")?
				.bearer_auth(token.secret.expose())
				.json(draft);
			let envelope: DrinksEnvelope<Drink> = self.send_and_decode(request).await?;

			Ok(envelope.drinks)
		})
		.await
	}

	/// Patches a drink in place; the token must carry `patch:drinks`.
	///
	/// Absent patch fields leave the stored drink untouched. An empty patch is legal
	/// and answers the stored drink unchanged.
	pub async fn update_drink(
		&self,
		token: &AccessToken,
		id: i64,
		patch: &DrinkPatch,
	) -> Result<Drink> {
		obs::run_op(OpKind::DrinkUpdate, "update_drink", async move {
			let request = self
				.http_client
				.request(Method::PATCH, &format!("drinks/{id}"))?
				.bearer_auth(token.secret.expose())
				.json(patch);
			let envelope: DrinksEnvelope<Drink> = self.send_and_decode(request).await?;

			Ok(envelope.drinks)
		})
		.await
	}

	/// Deletes a drink and returns the removed id; the token must carry `delete:drinks`.
	pub async fn delete_drink(&self, token: &AccessToken, id: i64) -> Result<i64> {
		obs::run_op(OpKind::DrinkDelete, "delete_drink", async move {
			let request = self
				.http_client
				.request(Method::DELETE, &format!("drinks/{id}"))?
				.bearer_auth(token.secret.expose());
			let envelope: DeleteEnvelope = self.send_and_decode(request).await?;

			Ok(envelope.delete)
		})
		.await
	}
}
