//! # DNA Insights
//!
//! Streams a raw consumer genotype export (tab-separated rsid / allele calls)
//! against a table of SNPedia genotype annotations and reports every call that
//! has a known entry, with gene, summary, magnitude and repute.
//!
//! ## Features
//!
//! - Chunk-agnostic streaming decode: lines and multi-byte characters may be split anywhere
//! - Order-independent genotype matching ("AG" and "GA" hit the same entry)
//! - Whole-percent progress callbacks with cooperative yielding
//! - Repute / magnitude / free-text filtering with paged reveal
//! - Reference tables from JSON, compressed JSON or zip archives, compiled from scraped JSON lines
//! - Multiple output formats (HTML, CSV, JSON, TSV)

pub mod config;
pub mod error;
pub mod filter;
pub mod output;
pub mod parsers;
pub mod reference;
pub mod types;

// Re-export key types
pub use error::{InsightsError, Result};
pub use filter::{derive_view, sort_by_magnitude, MatchBrowser, RevealPager, PAGE_SIZE};
pub use output::{ReportFormat, ReportGenerator};
pub use parsers::{match_line, parse_genotypes, LineDecoder, ProgressReporter};
pub use reference::{CompiledReference, GeneEntry, GeneIndex, ReferenceTable};
pub use types::*;
