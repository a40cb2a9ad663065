//! A web app that serves a simulated bank log-in page.
//!
//! Each browser session is given a set of randomized account balances the
//! first time it loads the page. The log-in form does not check credentials:
//! clicking "Log in" shows a spinner and, after a fixed delay, sends the
//! browser to the account overview page.
//!
//! This library serves HTML pages directly from an [axum] router.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::response::{IntoResponse, Response};
use axum_server::Handle;
use tokio::signal;

mod app_state;
mod balances;
mod endpoints;
mod html;
mod internal_server_error;
mod log_in;
mod logging;
mod not_found;
mod routing;
mod session;
mod transfer;

#[cfg(test)]
mod test_utils;

pub use app_state::{
    AppState, DEFAULT_ABOUT_URL, DEFAULT_ACCOUNT_OVERVIEW_URL, DEFAULT_CONTACT_URL,
    DEFAULT_REDIRECT_DELAY, DEFAULT_TRANSFER_FUNDS_URL, LogInPageConfig, create_cookie_key,
};
pub use balances::{BALANCE_RANGE, Balances};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use session::{DEFAULT_SESSION_TTL, SessionId, SessionStore, prune_sessions_periodically};
pub use transfer::{TransferForm, TransferRecord};

use crate::internal_server_error::InternalServerError;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The lock guarding the session store was poisoned by a panicking
    /// request handler.
    #[error("could not acquire the session store lock")]
    SessionLockError,

    /// The date for a transfer record could not be formatted.
    ///
    /// Callers should pass in the original error as a string.
    #[error("could not format transfer date: {0}")]
    DateFormatError(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::SessionLockError => {
                tracing::error!("Could not acquire the session store lock");
                InternalServerError {
                    description: "Session Unavailable",
                    fix: "Your session could not be loaded. Please try again.",
                }
                .into_response()
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}
