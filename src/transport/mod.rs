//! Delivery of composed messages.
//!
//! A transport only ever sees the envelope and a serializable message;
//! everything about the MIME document itself stays in
//! [`Message`](crate::Message).

pub mod smtp;

use crate::{error::Error, message::Message};

/// Something able to relay a composed message.
pub trait Sender {
    /// Relays `msg` from `from` to `to`.
    ///
    /// `from` and `to` are bare envelope addresses; header fields of the
    /// same names are already part of the serialized message, with `Bcc`
    /// stripped.
    fn send(&mut self, from: &str, to: &[String], msg: &Message) -> Result<(), Error>;
}

/// Adapts a closure into a [`Sender`].
///
/// ```
/// use missive::{send, Message, SendFunc};
///
/// # fn main() -> Result<(), missive::Error> {
/// let mut sender = SendFunc(|from: &str, to: &[String], msg: &Message| {
///     let bytes = msg.formatted()?;
///     # let _ = (from, to, bytes);
///     Ok(())
/// });
///
/// let mut msg = Message::new();
/// msg.set_header("To", ["dakota@example.net"]);
/// send(&mut sender, &[msg])?;
/// # Ok(())
/// # }
/// ```
pub struct SendFunc<F>(pub F);

impl<F> Sender for SendFunc<F>
where
    F: FnMut(&str, &[String], &Message) -> Result<(), Error>,
{
    fn send(&mut self, from: &str, to: &[String], msg: &Message) -> Result<(), Error> {
        (self.0)(from, to, msg)
    }
}

/// Derives each message's envelope and hands it to `sender`.
///
/// The sender address is the first `From` address; recipients are the
/// `To`, `Cc` and `Bcc` addresses in that order. Stops at the first
/// transport error.
pub fn send<S: Sender>(sender: &mut S, messages: &[Message]) -> Result<(), Error> {
    for msg in messages {
        let from = msg.envelope_sender();
        let to = msg.envelope_recipients();
        tracing::debug!(from = %from, recipients = to.len(), "handing message to transport");
        sender.send(&from, &to, msg)?;
    }
    Ok(())
}
