//! Buffered reading of one changeset message.

use crate::connection::Connection;
use crate::error::{ReplicationError, ReplicationResult};
use crate::journal::JournalWriter;
use replidb_codec::{CodecError, CodecResult, Decoder};
use std::path::PathBuf;
use std::time::Instant;
use tracing::warn;

/// Where consumed bytes go.
#[derive(Debug)]
enum JournalSink {
    /// The journal is not open yet; consumed bytes are held until it is.
    Pending(Vec<u8>),
    /// Consumed bytes are appended to the journal file.
    Open(JournalWriter),
    /// Consumed bytes are dropped.
    Off,
}

/// The body of the changeset message currently being applied.
///
/// Bytes pulled from the connection sit in `buf` until a decoder has used
/// them. [`ChangesetStream::consume`] then copies them to the journal and
/// discards them, so the journal sees exactly the consumed bytes in order.
pub(crate) struct ChangesetStream<'a, C: Connection + ?Sized> {
    conn: &'a mut C,
    deadline: Instant,
    buf: Vec<u8>,
    journal: JournalSink,
    chunk_size: usize,
    consumed: u64,
}

impl<'a, C: Connection + ?Sized> ChangesetStream<'a, C> {
    /// Wraps a connection positioned at the start of a changeset body.
    pub(crate) fn new(conn: &'a mut C, deadline: Instant, chunk_size: usize) -> Self {
        Self {
            conn,
            deadline,
            buf: Vec::new(),
            journal: JournalSink::Pending(Vec::new()),
            chunk_size: chunk_size.max(1),
            consumed: 0,
        }
    }

    /// Starts journaling.
    ///
    /// Bytes consumed before this call are written first. With `None`,
    /// held bytes are dropped and nothing further is kept.
    pub(crate) fn attach_journal(&mut self, writer: Option<JournalWriter>) {
        let held = match std::mem::replace(&mut self.journal, JournalSink::Off) {
            JournalSink::Pending(held) => held,
            other => {
                self.journal = other;
                return;
            }
        };
        if let Some(writer) = writer {
            self.journal = JournalSink::Open(writer);
            self.journal_bytes(&held);
        }
    }

    /// Path of the open journal file, if any.
    pub(crate) fn journal_path(&self) -> Option<PathBuf> {
        match &self.journal {
            JournalSink::Open(writer) => Some(writer.path().to_path_buf()),
            _ => None,
        }
    }

    /// Buffers at least `at_least` bytes.
    ///
    /// Returns `false` if the message ended first.
    pub(crate) fn fill(&mut self, at_least: usize) -> ReplicationResult<bool> {
        if self.buf.len() >= at_least {
            return Ok(true);
        }
        self.conn
            .get_message_chunk(&mut self.buf, at_least, self.deadline)
    }

    /// Bytes buffered but not consumed.
    pub(crate) fn buf(&self) -> &[u8] {
        &self.buf
    }

    /// Total bytes consumed so far.
    pub(crate) fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Marks the first `n` buffered bytes as used.
    pub(crate) fn consume(&mut self, n: usize) {
        let n = n.min(self.buf.len());
        let used: Vec<u8> = self.buf.drain(..n).collect();
        self.journal_bytes(&used);
        self.consumed += n as u64;
    }

    fn journal_bytes(&mut self, data: &[u8]) {
        match &mut self.journal {
            JournalSink::Pending(held) => held.extend_from_slice(data),
            JournalSink::Open(writer) => {
                if let Err(err) = writer.append(data) {
                    warn!(
                        path = %writer.path().display(),
                        error = %err,
                        "cannot write changeset journal, journaling stopped"
                    );
                    self.journal = JournalSink::Off;
                }
            }
            JournalSink::Off => {}
        }
    }

    /// Decodes a value from the front of the buffer and consumes it.
    ///
    /// More data is pulled while the decoder runs out of input and the
    /// message has more to give. Running out at the end of the message is
    /// reported as a malformed `field`.
    pub(crate) fn decode<T, F>(&mut self, field: &str, decode: F) -> ReplicationResult<T>
    where
        F: Fn(&mut Decoder<'_>) -> CodecResult<T>,
    {
        let mut want = self.chunk_size;
        loop {
            let more = self.fill(want)?;
            let mut decoder = Decoder::new(&self.buf);
            match decode(&mut decoder) {
                Ok(value) => {
                    let used = decoder.position();
                    self.consume(used);
                    return Ok(value);
                }
                Err(CodecError::UnexpectedEof { .. }) if more => {
                    want = self.buf.len() + self.chunk_size;
                }
                Err(err) => return Err(ReplicationError::codec(field, err)),
            }
        }
    }

    /// Returns the number of unconsumed bytes left in the message.
    pub(crate) fn drain_remaining(&mut self) -> ReplicationResult<usize> {
        while self.fill(self.buf.len() + self.chunk_size)? {}
        Ok(self.buf.len())
    }
}
