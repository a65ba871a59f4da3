//! `murmur send`: post one message and wait for the server's answer.

use std::sync::Arc;

use {
    anyhow::{Result, bail},
    clap::{ArgGroup, Args},
    murmur_common::UserId,
    murmur_config::MurmurConfig,
    murmur_transmit::{
        EventQueue, HttpTransport, MessageTarget, ReloadOptions, Reloader, Roster,
        SendMessageRequest, SendOutcome, Transmitter,
    },
    tracing::{info, warn},
};

#[derive(Args, Clone)]
#[command(group(ArgGroup::new("destination").required(true).args(["stream", "to"])))]
pub struct SendArgs {
    /// Stream to post to (requires --topic).
    #[arg(long, requires = "topic")]
    stream: Option<String>,
    /// Topic within the stream.
    #[arg(long)]
    topic: Option<String>,
    /// Direct message recipients, comma-separated e-mails.
    #[arg(long, value_delimiter = ',')]
    to: Vec<String>,
    /// Id of the sending user.
    #[arg(long, env = "MURMUR_SENDER_ID")]
    sender_id: u64,
    /// Message content (markdown).
    content: String,
}

/// A one-shot client has no event queue: there is no queue id to hand the
/// server and nothing to restart.
struct DetachedEventQueue;

impl EventQueue for DetachedEventQueue {
    fn queue_id(&self) -> Option<String> {
        None
    }

    fn restart_event_queue(&self) {
        warn!("no event queue to restart");
    }
}

/// Nothing to reload in a command-line process.
struct NoReload;

impl Reloader for NoReload {
    fn is_pending(&self) -> bool {
        false
    }

    fn initiate(&self, options: ReloadOptions) {
        warn!(?options, "reload requested, ignoring");
    }
}

fn build_request(args: &SendArgs, transmitter: &Transmitter) -> Result<SendMessageRequest> {
    let (to, target) = match (&args.stream, &args.topic) {
        (Some(stream), Some(topic)) => (stream.clone(), MessageTarget::Stream {
            topic: topic.clone(),
        }),
        (Some(_), None) => bail!("--stream requires --topic"),
        (None, _) => {
            if args.to.is_empty() {
                bail!("either --stream or --to is required");
            }
            (serde_json::to_string(&args.to)?, MessageTarget::Private)
        },
    };

    Ok(SendMessageRequest {
        local_id: transmitter.sent_messages().get_new_local_id(),
        sender_id: UserId(args.sender_id),
        queue_id: None,
        to,
        content: args.content.clone(),
        target,
        resend: false,
        locally_echoed: false,
    })
}

pub async fn handle_send(config: &MurmurConfig, args: &SendArgs) -> Result<()> {
    let transport = HttpTransport::from_config(config)?;
    let transmitter = Transmitter::new(
        Arc::new(transport),
        Arc::new(DetachedEventQueue),
        Arc::new(NoReload),
        Arc::new(Roster::new(UserId(args.sender_id))),
    )
    .with_event_receipt_timeout(config.transmit.event_receipt_timeout());

    let request = build_request(args, &transmitter)?;
    let local_id = request.local_id.clone();
    match transmitter.send_message(request, |_| {})?.await {
        SendOutcome::Sent { response } => {
            info!(local_id = %local_id, "message sent");
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        },
        SendOutcome::Failed { message, code } if code.is_empty() => bail!("{message}"),
        SendOutcome::Failed { message, code } => bail!("{message} ({code})"),
        SendOutcome::Reloading => bail!("send deferred to a reload"),
    }
}
