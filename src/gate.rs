use log::info;

use crate::error::BounceError;
use crate::headers::HeaderStore;

/// Why a message is left alone without bouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingEnvelopeTo,
    MissingReturnPath,
    NullSender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Proceed,
    Skip(SkipReason),
}

/// Decide whether the message is a delivery failure we should bounce.
///
/// Messages without envelope trace headers, and messages that already carry a
/// null sender, are skipped quietly so bounces never loop. A message with no
/// `Received` header at all is refused as suspicious.
pub fn check_eligible(store: &HeaderStore) -> Result<Eligibility, BounceError> {
    let verdict = if store.get("Envelope-to").is_none() {
        Eligibility::Skip(SkipReason::MissingEnvelopeTo)
    } else {
        match store.get("Return-path") {
            None => Eligibility::Skip(SkipReason::MissingReturnPath),
            Some(path) if path.is_empty() || path == b"<>" => {
                Eligibility::Skip(SkipReason::NullSender)
            }
            Some(_) if store.get("Received").is_none() => return Err(BounceError::NoReceived),
            Some(_) => Eligibility::Proceed,
        }
    };

    if let Eligibility::Skip(reason) = verdict {
        info!("[gate] not bouncing message: {:?}", reason);
    }
    Ok(verdict)
}
