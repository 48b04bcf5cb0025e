//! Streaming parse-and-join of raw genotype files.
//!
//! [`parse_genotypes`] drives a [`LineDecoder`] over chunks read from an async
//! byte source, matches every completed line with [`match_line`], and reports
//! progress through a [`ProgressReporter`], yielding to the runtime after each
//! emitted percentage.

pub mod decoder;
pub mod genotype;
pub mod progress;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

pub use decoder::LineDecoder;
pub use genotype::match_line;
pub use progress::ProgressReporter;

use crate::error::{InsightsError, Result};
use crate::reference::ReferenceTable;
use crate::types::Match;

/// Upper bound for a single read from the byte source
pub const CHUNK_SIZE: usize = 64 * 1024;

/// State of one parse, owned by that parse alone
struct ParseState<'t, F: FnMut(u8)> {
    table: &'t ReferenceTable,
    decoder: LineDecoder,
    progress: ProgressReporter<F>,
    matches: Vec<Match>,
    lines: u64,
}

impl<'t, F: FnMut(u8)> ParseState<'t, F> {
    fn new(table: &'t ReferenceTable, total_bytes: u64, on_progress: F) -> Self {
        Self {
            table,
            decoder: LineDecoder::new(),
            progress: ProgressReporter::new(total_bytes, on_progress),
            matches: Vec::new(),
            lines: 0,
        }
    }

    /// Decode and match one chunk. Returns `true` if progress was reported.
    fn consume(&mut self, chunk: &[u8]) -> bool {
        let table = self.table;
        let matches = &mut self.matches;
        let lines = &mut self.lines;

        self.decoder.feed(chunk, |line| {
            *lines += 1;
            if let Some(m) = match_line(line, table) {
                matches.push(m);
            }
        });

        self.progress.advance(chunk.len() as u64)
    }

    fn finish(self) -> Vec<Match> {
        let Self {
            table,
            decoder,
            mut progress,
            mut matches,
            mut lines,
        } = self;

        decoder.finish(|line| {
            lines += 1;
            if let Some(m) = match_line(line, table) {
                matches.push(m);
            }
        });
        progress.finish();

        info!(
            "Parsed {} lines ({} bytes), found {} annotated genotypes",
            lines,
            progress.bytes_read(),
            matches.len()
        );
        matches
    }
}

/// Parse a raw genotype stream and join it against `table`.
///
/// `total_bytes` is the declared size of the stream and is only used as the
/// progress denominator. `on_progress` receives whole percentages: 0 before
/// the first read, then every new value, ending with exactly 100.
///
/// A failing source aborts the parse with [`InsightsError::Stream`]; matches
/// gathered up to that point are dropped.
pub async fn parse_genotypes<R, F>(
    mut reader: R,
    total_bytes: u64,
    table: &ReferenceTable,
    on_progress: F,
) -> Result<Vec<Match>>
where
    R: AsyncRead + Unpin,
    F: FnMut(u8),
{
    debug!("Parsing genotype stream of {} bytes", total_bytes);

    let mut state = ParseState::new(table, total_bytes, on_progress);
    state.progress.start();
    tokio::task::yield_now().await;

    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|source| InsightsError::Stream {
                bytes_read: state.progress.bytes_read(),
                source,
            })?;
        if n == 0 {
            break;
        }

        if state.consume(&buf[..n]) {
            tokio::task::yield_now().await;
        }
    }

    Ok(state.finish())
}
