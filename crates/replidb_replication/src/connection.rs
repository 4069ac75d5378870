//! Connection abstraction for receiving changesets.
//!
//! The framing of messages on the wire belongs to the transport. The
//! replication code only needs two things from it: the type of the next
//! message, and the bytes of that message's body in chunks of at least a
//! requested size, both bounded by an absolute deadline.

use crate::error::{ReplicationError, ReplicationResult};
use std::collections::VecDeque;
use std::io::{self, Read};
use std::time::{Duration, Instant};

/// Reply message types sent from a master to a replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// No further changes are available.
    EndOfChanges,
    /// The master could not produce the requested data.
    Fail,
    /// Start of a full database copy.
    DbHeader,
    /// Name of a file in a full copy.
    DbFilename,
    /// Contents of a file in a full copy.
    DbFiledata,
    /// End of a full database copy.
    DbFooter,
    /// A changeset.
    Changeset,
}

impl MessageType {
    /// Returns the wire tag.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::EndOfChanges => 0,
            Self::Fail => 1,
            Self::DbHeader => 2,
            Self::DbFilename => 3,
            Self::DbFiledata => 4,
            Self::DbFooter => 5,
            Self::Changeset => 6,
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = ReplicationError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            0 => Self::EndOfChanges,
            1 => Self::Fail,
            2 => Self::DbHeader,
            3 => Self::DbFilename,
            4 => Self::DbFiledata,
            5 => Self::DbFooter,
            6 => Self::Changeset,
            other => {
                return Err(ReplicationError::violation(format!(
                    "unknown message type {other}"
                )))
            }
        })
    }
}

/// A connection delivering chunked messages from a master.
///
/// Implementations block for at most the time remaining until `deadline`
/// and return [`ReplicationError::Timeout`] once it has passed.
pub trait Connection {
    /// Starts reading the next message and returns its type.
    fn get_message_chunked(&mut self, deadline: Instant) -> ReplicationResult<MessageType>;

    /// Appends body bytes of the current message to `buf` until it holds at
    /// least `at_least` bytes.
    ///
    /// Returns `false` once the body is exhausted; `buf` then holds
    /// everything that remained, which may or may not reach `at_least`.
    /// Callers compare `buf.len()` rather than trusting the flag alone.
    /// Returns `true` immediately if `buf` is already long enough.
    fn get_message_chunk(
        &mut self,
        buf: &mut Vec<u8>,
        at_least: usize,
        deadline: Instant,
    ) -> ReplicationResult<bool>;
}

fn check_deadline(deadline: Instant) -> ReplicationResult<()> {
    if Instant::now() >= deadline {
        Err(ReplicationError::Timeout)
    } else {
        Ok(())
    }
}

/// A scripted in-memory connection.
///
/// Messages are queued up front. Bodies are handed out in pieces no larger
/// than `max_chunk`, so callers see the same fragmentation a network would
/// produce. An optional per-read delay lets tests drive deadline expiry.
#[derive(Debug)]
pub struct MemoryConnection {
    messages: VecDeque<(MessageType, Vec<u8>)>,
    current: Option<(Vec<u8>, usize)>,
    max_chunk: usize,
    read_delay: Duration,
    eager_end: bool,
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnection {
    /// Creates a connection with no queued messages.
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            current: None,
            max_chunk: usize::MAX,
            read_delay: Duration::ZERO,
            eager_end: false,
        }
    }

    /// Creates a connection carrying a single changeset message.
    #[must_use]
    pub fn changeset(body: Vec<u8>) -> Self {
        Self::new().with_message(MessageType::Changeset, body)
    }

    /// Queues a message.
    #[must_use]
    pub fn with_message(mut self, message_type: MessageType, body: Vec<u8>) -> Self {
        self.messages.push_back((message_type, body));
        self
    }

    /// Limits how many bytes each underlying read delivers.
    #[must_use]
    pub fn with_max_chunk(mut self, max_chunk: usize) -> Self {
        self.max_chunk = max_chunk.max(1);
        self
    }

    /// Sleeps for `delay` before each underlying read.
    #[must_use]
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Reports the end of the body as soon as its last byte is handed out,
    /// even when that read also satisfied the request.
    #[must_use]
    pub fn with_eager_end(mut self) -> Self {
        self.eager_end = true;
        self
    }

    /// Number of body bytes of the current message not yet delivered.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.current
            .as_ref()
            .map_or(0, |(body, pos)| body.len() - pos)
    }
}

impl Connection for MemoryConnection {
    fn get_message_chunked(&mut self, deadline: Instant) -> ReplicationResult<MessageType> {
        check_deadline(deadline)?;
        let (message_type, body) = self
            .messages
            .pop_front()
            .ok_or_else(|| ReplicationError::Transport("connection closed".into()))?;
        self.current = Some((body, 0));
        Ok(message_type)
    }

    fn get_message_chunk(
        &mut self,
        buf: &mut Vec<u8>,
        at_least: usize,
        deadline: Instant,
    ) -> ReplicationResult<bool> {
        let (body, pos) = self
            .current
            .as_mut()
            .ok_or_else(|| ReplicationError::violation("no message in progress"))?;

        while buf.len() < at_least {
            if *pos == body.len() {
                return Ok(false);
            }
            if !self.read_delay.is_zero() {
                std::thread::sleep(self.read_delay);
            }
            check_deadline(deadline)?;

            let take = (body.len() - *pos).min(self.max_chunk);
            buf.extend_from_slice(&body[*pos..*pos + take]);
            *pos += take;
        }
        Ok(!(self.eager_end && *pos == body.len()))
    }
}

/// A connection that serves one changeset read from a byte stream.
///
/// The stream carries the changeset body with no message framing, as
/// produced by a master writing a changeset to a file. The first call to
/// [`Connection::get_message_chunked`] reports a changeset; later calls
/// report the end of changes.
#[derive(Debug)]
pub struct ReaderConnection<R: Read> {
    reader: R,
    started: bool,
    exhausted: bool,
    read_size: usize,
}

impl<R: Read> ReaderConnection<R> {
    /// Wraps a reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            started: false,
            exhausted: false,
            read_size: 8 * 1024,
        }
    }
}

impl<R: Read> Connection for ReaderConnection<R> {
    fn get_message_chunked(&mut self, deadline: Instant) -> ReplicationResult<MessageType> {
        check_deadline(deadline)?;
        if self.started {
            return Ok(MessageType::EndOfChanges);
        }
        self.started = true;
        Ok(MessageType::Changeset)
    }

    fn get_message_chunk(
        &mut self,
        buf: &mut Vec<u8>,
        at_least: usize,
        deadline: Instant,
    ) -> ReplicationResult<bool> {
        let mut chunk = vec![0u8; self.read_size];
        while buf.len() < at_least {
            if self.exhausted {
                return Ok(false);
            }
            check_deadline(deadline)?;

            let want = (at_least - buf.len()).min(chunk.len());
            match self.reader.read(&mut chunk[..want]) {
                Ok(0) => self.exhausted = true,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                    ) =>
                {
                    return Err(ReplicationError::Timeout)
                }
                Err(err) => return Err(ReplicationError::Transport(err.to_string())),
            }
        }
        Ok(true)
    }
}
