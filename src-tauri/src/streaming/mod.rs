//! Streaming CSV splitting.
//!
//! This module provides record-aware CSV scanning that keeps quoted fields
//! with embedded newlines intact, header block replication, and atomic shard
//! writing. Source bytes are copied to the shards verbatim.

mod header_block;
mod record_scanner;
mod shard_writer;
mod splitter;

pub use header_block::HeaderBlock;
pub use record_scanner::{
    LineTerminator, RawRecord, RecordScanner, RecordSpan, TerminatorMode,
    DEFAULT_MAX_RECORD_BYTES,
};
pub use shard_writer::{CommittedShard, OutputPolicy, ShardFile, ShardNaming};
pub use splitter::{
    split_file, split_file_blocking, split_file_with_progress, SplitProgress, SplitReport,
};
