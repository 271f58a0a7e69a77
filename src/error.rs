use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Every condition that aborts a bounce run with failure status.
#[derive(Debug, Error)]
pub enum BounceError {
    #[error("header line too long ({0})")]
    LineTooLong(usize),

    #[error("empty message without headers")]
    NoHeaders,

    #[error("failed to read message from stdin: {0}")]
    Input(#[source] io::Error),

    #[error("sanity check failed, no Received headers")]
    NoReceived,

    #[error("{0}: No such group")]
    NoSuchGroup(String),

    #[error("{group}: {source}")]
    GroupLookup {
        group: String,
        #[source]
        source: nix::Error,
    },

    #[error("{}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error piping message to MTA process: {0}")]
    PipeWrite(#[source] io::Error),
}
