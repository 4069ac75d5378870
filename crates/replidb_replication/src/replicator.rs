//! Changeset application state machine.

use crate::base::{apply_base_file, BaseFileWrite};
use crate::blocks::{apply_blocks, BlockWrites};
use crate::config::ReplicatorConfig;
use crate::connection::{Connection, MessageType};
use crate::error::{ReplicationError, ReplicationResult};
use crate::journal::ChangesetJournal;
use crate::revision::revision_at_least;
use crate::stream::ChangesetStream;
use parking_lot::RwLock;
use replidb_core::changeset::{ChangesetType, ItemType, CHANGES_MAGIC, CHANGES_VERSION};
use replidb_core::{CoreError, DatabaseDir, Revision, TableName, VersionFile};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where an apply currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyState {
    /// No apply has run yet.
    Idle,
    /// Waiting for the changeset message.
    AwaitHeader,
    /// Checking the header against this replica.
    ValidateHeader,
    /// Writing table items.
    ApplyItems,
    /// Reading the required revision.
    ReadFooter,
    /// The last apply succeeded.
    Done,
    /// The last apply failed.
    Failed,
}

impl ApplyState {
    /// Returns true while an apply is running.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ApplyState::AwaitHeader
                | ApplyState::ValidateHeader
                | ApplyState::ApplyItems
                | ApplyState::ReadFooter
        )
    }
}

/// Counters across all applies made by one [`Replicator`].
#[derive(Debug, Clone, Default)]
pub struct ReplicationStats {
    /// Changesets applied successfully.
    pub changesets_applied: u64,
    /// Applies that ended in an error.
    pub changesets_failed: u64,
    /// Base files replaced.
    pub base_files_written: u64,
    /// Data file blocks written.
    pub blocks_written: u64,
    /// Changeset bytes consumed, including failed applies.
    pub bytes_consumed: u64,
    /// Required revision of the last successful apply.
    pub last_revision: Option<Revision>,
    /// Message of the last error.
    pub last_error: Option<String>,
}

/// The outcome of a successful apply.
#[derive(Debug, Clone)]
pub struct ChangesetSummary {
    /// The encoded required revision, the replica's new revision marker.
    pub revision: Vec<u8>,
    /// Start revision from the header.
    pub start_revision: Revision,
    /// End revision from the header.
    pub end_revision: Revision,
    /// Required revision from the footer.
    pub required_revision: Revision,
    /// Base files replaced, in changeset order.
    pub base_files: Vec<BaseFileWrite>,
    /// Block items applied, in changeset order.
    pub blocks: Vec<BlockWrites>,
    /// Journal file holding a copy of the changeset, if journaling is on.
    pub journal: Option<PathBuf>,
    /// Changeset bytes consumed.
    pub bytes: u64,
}

impl ChangesetSummary {
    /// Total number of blocks written.
    pub fn blocks_written(&self) -> u64 {
        self.blocks.iter().map(|item| item.blocks).sum()
    }
}

/// Changeset header fields.
#[derive(Debug, Clone, Copy)]
struct Header {
    start: Revision,
    end: Revision,
}

/// Applies changesets received from a master to the replica at one path.
///
/// Each apply holds the directory lock from start to finish. State and
/// statistics are readable from other threads while an apply runs. An apply
/// that finds the lock taken returns [`ReplicationError::LockUnavailable`]
/// and leaves both untouched.
#[derive(Debug)]
pub struct Replicator {
    db_path: PathBuf,
    config: ReplicatorConfig,
    state: RwLock<ApplyState>,
    stats: RwLock<ReplicationStats>,
}

impl Replicator {
    /// Creates a replicator for the database directory at `db_path`.
    pub fn new(db_path: impl Into<PathBuf>, config: ReplicatorConfig) -> Self {
        Self {
            db_path: db_path.into(),
            config,
            state: RwLock::new(ApplyState::Idle),
            stats: RwLock::new(ReplicationStats::default()),
        }
    }

    /// Returns the database directory.
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ReplicatorConfig {
        &self.config
    }

    /// Gets the current state.
    pub fn state(&self) -> ApplyState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> ReplicationStats {
        self.stats.read().clone()
    }

    fn set_state(&self, state: ApplyState) {
        *self.state.write() = state;
    }

    /// Reads one changeset from `conn` and applies it.
    ///
    /// When `replica_is_valid` is true the replica's recorded revision must
    /// equal the changeset's start revision. Pass false while the replica is
    /// being bootstrapped and its recorded revision means nothing yet.
    ///
    /// Items are applied as they arrive. An error aborts the apply but does
    /// not undo items already written.
    ///
    /// # Errors
    ///
    /// Returns the first error met. See [`ReplicationError`] for the
    /// taxonomy.
    pub fn apply_changeset<C: Connection + ?Sized>(
        &self,
        conn: &mut C,
        deadline: Instant,
        replica_is_valid: bool,
    ) -> ReplicationResult<ChangesetSummary> {
        let dir = match DatabaseDir::open(&self.db_path, false) {
            Ok(dir) => dir,
            Err(CoreError::DatabaseLocked { path }) => {
                // State and stats belong to whoever holds the lock.
                warn!(path = %path.display(), "replica is locked, changeset not read");
                return Err(ReplicationError::LockUnavailable { path });
            }
            Err(err) => return self.record(Err(err.into()), 0),
        };

        self.set_state(ApplyState::AwaitHeader);
        let mut consumed = 0u64;
        let result = self.apply_locked(&dir, conn, deadline, replica_is_valid, &mut consumed);
        self.record(result, consumed)
    }

    /// Folds the outcome of an apply into the state and stats.
    fn record(
        &self,
        result: ReplicationResult<ChangesetSummary>,
        consumed: u64,
    ) -> ReplicationResult<ChangesetSummary> {
        let mut stats = self.stats.write();
        stats.bytes_consumed += consumed;
        match &result {
            Ok(summary) => {
                stats.changesets_applied += 1;
                stats.base_files_written += summary.base_files.len() as u64;
                stats.blocks_written += summary.blocks_written();
                stats.last_revision = Some(summary.required_revision);
                drop(stats);
                self.set_state(ApplyState::Done);
                info!(
                    path = %self.db_path.display(),
                    start_rev = summary.start_revision.as_u64(),
                    end_rev = summary.end_revision.as_u64(),
                    required_rev = summary.required_revision.as_u64(),
                    base_files = summary.base_files.len(),
                    blocks = summary.blocks_written(),
                    "applied changeset"
                );
            }
            Err(err) => {
                stats.changesets_failed += 1;
                stats.last_error = Some(err.to_string());
                drop(stats);
                self.set_state(ApplyState::Failed);
                warn!(path = %self.db_path.display(), error = %err, "changeset apply failed");
            }
        }
        result
    }

    /// Runs one apply with the directory lock held.
    fn apply_locked<C: Connection + ?Sized>(
        &self,
        dir: &DatabaseDir,
        conn: &mut C,
        deadline: Instant,
        replica_is_valid: bool,
        consumed: &mut u64,
    ) -> ReplicationResult<ChangesetSummary> {
        let message = conn.get_message_chunked(deadline)?;
        if message != MessageType::Changeset {
            return Err(ReplicationError::violation(format!(
                "expected a changeset message, got {message:?}"
            )));
        }

        let mut stream = ChangesetStream::new(conn, deadline, self.config.chunk_size);
        let result = self.apply_stream(&mut stream, dir, replica_is_valid);
        *consumed = stream.consumed();
        result
    }

    fn apply_stream<C: Connection + ?Sized>(
        &self,
        stream: &mut ChangesetStream<'_, C>,
        dir: &DatabaseDir,
        replica_is_valid: bool,
    ) -> ReplicationResult<ChangesetSummary> {
        self.set_state(ApplyState::ValidateHeader);
        let header = read_header(stream)?;
        debug!(
            start_rev = header.start.as_u64(),
            end_rev = header.end.as_u64(),
            "read changeset header"
        );

        if replica_is_valid {
            check_replica_revision(dir, header.start)?;
        }

        let journal = ChangesetJournal::new(dir.path(), self.config.max_changesets);
        stream.attach_journal(journal.open_for_revision(header.start)?);

        self.set_state(ApplyState::ApplyItems);
        let mut base_files = Vec::new();
        let mut blocks = Vec::new();
        loop {
            let tag = stream.decode("item type", |d| d.byte())?;
            let is_base_file = match ItemType::from_byte(tag) {
                Some(ItemType::End) => break,
                Some(ItemType::BaseFile) => true,
                Some(ItemType::Blocks) => false,
                None => return Err(ReplicationError::UnrecognizedItemType(tag)),
            };

            let name = stream.decode("table name", |d| d.string().map(<[u8]>::to_vec))?;
            let table = TableName::parse(&name)?;
            if is_base_file {
                let write = apply_base_file(stream, dir, &table, self.config.sync_directory)?;
                base_files.push(write);
            } else {
                blocks.push(apply_blocks(stream, dir, &table)?);
            }
        }

        self.set_state(ApplyState::ReadFooter);
        let required = Revision::new(stream.decode("required revision", |d| d.uint::<u64>())?);
        if required < header.end {
            return Err(ReplicationError::StaleRequiredRevision {
                required,
                end: header.end,
            });
        }

        let junk = stream.drain_remaining()?;
        if junk > 0 {
            return Err(ReplicationError::TrailingGarbage { count: junk });
        }

        Ok(ChangesetSummary {
            revision: required.encode(),
            start_revision: header.start,
            end_revision: header.end,
            required_revision: required,
            base_files,
            blocks,
            journal: stream.journal_path(),
            bytes: stream.consumed(),
        })
    }

    /// Returns the database UUID, or an empty string if it cannot be read.
    pub fn get_uuid(&self) -> String {
        match VersionFile::read_and_check(&self.db_path) {
            Ok(version) => version.uuid_string(),
            Err(err) => {
                debug!(path = %self.db_path.display(), error = %err, "cannot read database uuid");
                String::new()
            }
        }
    }

    /// Returns true if encoded revision `a` is at least encoded revision `b`.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicationError::MalformedProtocol`] if either does not
    /// decode.
    pub fn revision_at_least(&self, a: &[u8], b: &[u8]) -> ReplicationResult<bool> {
        revision_at_least(a, b)
    }
}

/// Reads and validates the magic, version, revisions and type.
fn read_header<C: Connection + ?Sized>(
    stream: &mut ChangesetStream<'_, C>,
) -> ReplicationResult<Header> {
    stream.fill(CHANGES_MAGIC.len())?;
    if !stream.buf().starts_with(CHANGES_MAGIC) {
        return Err(ReplicationError::malformed(
            "changeset does not start with the changeset magic",
        ));
    }
    stream.consume(CHANGES_MAGIC.len());

    let version = stream.decode("changeset version", |d| d.uint::<u32>())?;
    if version != CHANGES_VERSION {
        return Err(ReplicationError::UnsupportedVersion {
            expected: CHANGES_VERSION,
            actual: version,
        });
    }

    let (start, end) = stream.decode("changeset revisions", |d| {
        Ok((d.uint::<u64>()?, d.uint::<u64>()?))
    })?;
    let (start, end) = (Revision::new(start), Revision::new(end));
    if end <= start {
        return Err(ReplicationError::InvalidRevisionRange { start, end });
    }

    let kind = stream.decode("changeset type", |d| d.byte())?;
    match ChangesetType::from_byte(kind) {
        Some(ChangesetType::Normal) => Ok(Header { start, end }),
        Some(ChangesetType::Dangerous) | None => {
            Err(ReplicationError::UnsupportedChangesetType(kind))
        }
    }
}

/// Requires the replica's recorded revision to be `start`.
fn check_replica_revision(dir: &DatabaseDir, start: Revision) -> ReplicationResult<()> {
    let actual = match dir.current_revision() {
        Ok(rev) => Some(rev),
        Err(CoreError::NoValidRevision { .. }) => None,
        Err(err) => return Err(err.into()),
    };
    if actual == Some(start) {
        Ok(())
    } else {
        Err(ReplicationError::RevisionMismatch {
            expected: start,
            actual,
        })
    }
}
