use clap::Parser;
use std::path::PathBuf;

use crate::compose::BounceSettings;
use crate::mta::{exim_args, MtaCommand};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Return an undeliverable message to its sender through the local MTA",
    long_about = None
)]
pub struct Args {
    /// MTA binary that queues the bounce
    #[arg(long, env = "BOUNCE_MTA_PATH", default_value = "/usr/sbin/exim4")]
    pub mta_path: PathBuf,

    /// Replace the default MTA arguments (repeat for each argument)
    #[arg(long = "mta-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub mta_args: Vec<String>,

    /// Group allowed to inject mail with a forged sender; empty to keep the current group
    #[arg(long, env = "BOUNCE_TRUST_GROUP", default_value = "Debian-exim")]
    pub trust_group: String,

    /// From address of generated bounces
    #[arg(
        long,
        env = "BOUNCE_MAIL_FROM",
        default_value = "Mail Delivery System <Mailer-Daemon@localhost>"
    )]
    pub mail_from: String,

    /// Domain used in generated Message-Ids
    #[arg(long, env = "BOUNCE_MSGID_DOMAIN", default_value = "localhost")]
    pub msgid_domain: String,

    /// Sender ident recorded by the MTA
    #[arg(long, env = "BOUNCE_SENDER_IDENT", default_value = "mailer-daemon")]
    pub sender_ident: String,

    /// Sender host recorded by the MTA
    #[arg(long, env = "BOUNCE_SENDER_HOST", default_value = "localhost")]
    pub sender_host: String,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bounce: BounceSettings,
    pub mta: MtaCommand,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let mta_args = if args.mta_args.is_empty() {
            exim_args(&args.sender_ident, &args.sender_host)
        } else {
            args.mta_args
        };
        let trust_group = Some(args.trust_group).filter(|g| !g.is_empty());

        Config {
            bounce: BounceSettings {
                mail_from: args.mail_from,
                msgid_domain: args.msgid_domain,
            },
            mta: MtaCommand {
                path: args.mta_path,
                args: mta_args,
                trust_group,
            },
        }
    }
}
