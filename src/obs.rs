//! Optional observability helpers for SDK operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `cafe_sdk.op` with the `op` (operation) and
//!   `stage` (call site) fields.
//! - Enable `metrics` to increment the `cafe_sdk_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// SDK operations observed by spans and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Public menu listing.
	MenuList,
	/// Privileged long-form menu listing.
	MenuDetail,
	/// Drink creation.
	DrinkCreate,
	/// Drink update.
	DrinkUpdate,
	/// Drink deletion.
	DrinkDelete,
	/// Login completion (either response type).
	Login,
	/// Authorization-code exchange against the token endpoint.
	Exchange,
	/// Signature verification, including key-set fetches.
	Verify,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::MenuList => "menu_list",
			OpKind::MenuDetail => "menu_detail",
			OpKind::DrinkCreate => "drink_create",
			OpKind::DrinkUpdate => "drink_update",
			OpKind::DrinkDelete => "drink_delete",
			OpKind::Login => "login",
			OpKind::Exchange => "exchange",
			OpKind::Verify => "verify",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an SDK operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs an SDK operation with outcome counters and an instrumented span.
pub(crate) async fn run_op<F, T>(kind: OpKind, stage: &'static str, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	record_op_outcome(kind, OpOutcome::Attempt);

	let span = OpSpan::new(kind, stage);

	match span.instrument(fut).await {
		Ok(value) => {
			record_op_outcome(kind, OpOutcome::Success);

			Ok(value)
		},
		Err(error) => {
			record_op_outcome(kind, OpOutcome::Failure);

			Err(error)
		},
	}
}
