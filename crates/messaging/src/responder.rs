//! Responder side of request/reply.
//!
//! Requests arrive as unsolicited packets (no local wait claims them). A
//! handler turns each into an optional reply; the reply goes back to the
//! sender with the request's correlation id. Computing the reply is the
//! handler's business, not this layer's.

use std::sync::Arc;

use corelib::{Message, Packet};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::messenger::Messenger;

/// Answer every packet from `requests` until the channel closes.
///
/// `handler` returning `None` means "no reply". Returns the number of
/// replies sent. A failed reply is logged and the loop continues.
pub async fn serve_requests<F>(
    messenger: Arc<Messenger>,
    mut requests: mpsc::Receiver<Packet>,
    mut handler: F,
) -> u64
where
    F: FnMut(&Packet) -> Option<Message> + Send,
{
    let mut replies = 0;
    while let Some(request) = requests.recv().await {
        let Some(reply) = handler(&request) else {
            debug!(
                correlation_id = request.correlation_id(),
                kind = %request.kind(),
                "handler declined to reply"
            );
            continue;
        };
        match messenger.reply(&request.envelope, reply).await {
            Ok(()) => replies += 1,
            Err(err) => warn!(
                correlation_id = request.correlation_id(),
                %err,
                "failed to send reply"
            ),
        }
    }
    replies
}
