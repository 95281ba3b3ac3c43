#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dispatch feed reconciliation.
//!
//! Turns the Seattle Fire Real-Time 911 page into a stream of incident
//! lifecycle events:
//!
//! - [`parser`] reads active rows out of the page markup.
//! - [`incident`] holds one open incident and its geometry relative to the
//!   observer.
//! - [`reconcile`] diffs each snapshot against the tracked incidents.
//! - [`fetch`] downloads the daily feed windows that make up a snapshot.
//!
//! Everything except [`fetch`] is synchronous and does no I/O.

pub mod fetch;
pub mod incident;
pub mod parser;
pub mod reconcile;
pub mod retry;

pub use incident::Incident;
pub use parser::{RowParser, parse_rows};
pub use reconcile::{LocationResolver, Reconciler};

/// Errors from fetching or interpreting the dispatch feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// An HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a status that will not succeed on retry,
    /// or kept failing until the retries ran out.
    #[error("Feed request failed: {message}")]
    Status {
        /// Description of the failure.
        message: String,
    },

    /// A dispatch time was not in `MM/DD/YYYY hh:mm:ss AM|PM` form.
    #[error("Malformed timestamp {text:?}: {source}")]
    MalformedTimestamp {
        /// The text that failed to parse.
        text: String,
        /// The underlying parse failure.
        source: chrono::ParseError,
    },
}
