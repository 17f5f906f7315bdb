//! Errors for the few surfaces that touch the filesystem
//!
//! Gameplay never fails with an error: rejected actions are `bool`/`Option`
//! returns. Only settings and fact persistence can.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}
