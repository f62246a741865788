//! Invalidates Yubico OTPs by submitting them once to the validation service.
//!
//! ```no_run
//! # async fn run() -> yubikiller::Result<()> {
//! use yubikiller::{invalidate_token, Context};
//!
//! invalidate_token(&Context::background(), "cccccccccccclhrrkchdnfjvcdgvvvjrhrcguhvklrid").await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod context;
pub mod error;
pub mod models;
pub mod nonce;
pub mod validator;

pub use context::{CancelHandle, Context};
pub use error::{Result, TransportError, ValidationError};
pub use models::status::Status;
pub use models::verify::VerifyResponse;
pub use validator::Validator;

/// Invalidates `otp` against the public Yubico validation service.
pub async fn invalidate_token(ctx: &Context, otp: &str) -> Result<()> {
    Validator::new().invalidate(ctx, otp).await.map(|_| ())
}
