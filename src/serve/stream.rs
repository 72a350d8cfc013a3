//! Server-Sent Events over the raw connection.
//!
//! tiny_http buffers response bodies, so event streams bypass `Response`:
//! the handler takes the connection's writer, writes the head itself and
//! flushes after every frame.

use std::io::{self, Write};
use std::time::Duration;

use crossbeam::channel::RecvTimeoutError;
use tiny_http::Request;

use crate::hub::Subscription;

/// Comment frame interval that keeps idle connections open.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

const STREAM_HEAD: &str = concat!(
    "HTTP/1.1 200 OK\r\n",
    "Content-Type: text/event-stream\r\n",
    "Cache-Control: no-cache\r\n",
    "Connection: keep-alive\r\n",
    "\r\n",
);

/// `data:` frame for one message (multi-line safe).
pub fn format_event(message: &str) -> String {
    let mut frame = String::with_capacity(message.len() + 8);
    for line in message.split('\n') {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
    frame
}

/// Stream events from `subscription` until the client goes away.
///
/// Blocks the calling thread. A vanished client is noticed on the next
/// write (event or keepalive); dropping the subscription unsubscribes.
pub fn respond_stream(request: Request, subscription: Subscription) -> io::Result<()> {
    let writer = request.into_writer();
    pump(writer, &subscription, KEEPALIVE_INTERVAL)
}

fn pump(
    mut writer: impl Write,
    subscription: &Subscription,
    keepalive: Duration,
) -> io::Result<()> {
    writer.write_all(STREAM_HEAD.as_bytes())?;
    // first frame pushes the headers to the client
    writer.write_all(b": connected\n\n")?;
    writer.flush()?;

    loop {
        let frame = match subscription.recv_timeout(keepalive) {
            Ok(message) => format_event(&message),
            Err(RecvTimeoutError::Timeout) => ": keepalive\n\n".to_string(),
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        };
        writer.write_all(frame.as_bytes())?;
        writer.flush()?;
    }
}
