use chrono::Local;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::BufRead;

use crate::compose::{copy_body, write_bounce_header, write_original_headers};
use crate::config::Config;
use crate::error::BounceError;
use crate::gate::{check_eligible, Eligibility, SkipReason};
use crate::mta::{ExitOutcome, MtaPipe};
use crate::reader::read_headers;

/// Result of a run that did not hit a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    Delivered(ExitOutcome),
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Outcome::Skipped(_) => 0,
            Outcome::Delivered(exit) => exit.exit_code(),
        }
    }
}

/// Turn the message on `input` into a bounce and hand it to the MTA.
pub fn run_filter<R: BufRead>(config: &Config, input: &mut R) -> Result<Outcome, BounceError> {
    let store = read_headers(input)?;
    if let Eligibility::Skip(reason) = check_eligible(&store)? {
        return Ok(Outcome::Skipped(reason));
    }

    let mut pipe = MtaPipe::spawn(&config.mta)?;
    info!(
        "[filter] bouncing message for {} to {}",
        store.find("Envelope-to").map(|h| h.value_lossy()).unwrap_or_default(),
        store.find("Return-path").map(|h| h.value_lossy()).unwrap_or_default()
    );

    let now = Local::now();
    let mut rng = StdRng::seed_from_u64(now.timestamp() as u64);
    write_bounce_header(&mut pipe, &store, &config.bounce, &now, &mut rng)
        .map_err(BounceError::PipeWrite)?;
    write_original_headers(&mut pipe, &store).map_err(BounceError::PipeWrite)?;
    let copied = copy_body(input, &mut pipe)?;
    debug!("[filter] copied {} body bytes to pid {}", copied, pipe.id());

    let exit = pipe.finish()?;
    Ok(Outcome::Delivered(exit))
}
