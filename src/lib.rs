//! Generate "mail delivery failed" bounces for messages read from stdin and
//! hand them to the local MTA.

pub mod compose;
pub mod config;
pub mod error;
pub mod filter;
pub mod gate;
pub mod headers;
pub mod mta;
pub mod reader;

pub use config::{Args, Config};
pub use error::BounceError;
pub use filter::{run_filter, Outcome};
