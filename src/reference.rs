use bzip2::read::BzDecoder;
use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use tracing::{debug, info, warn};
use xz2::read::XzDecoder;
use zip::ZipArchive;

use crate::error::{InsightsError, Result};
use crate::types::{CanonicalAllelePair, ReferenceEntry, Repute};

/// Name of the payload inside the distributed reference archive
pub const ARCHIVE_ENTRY: &str = "genotypes_by_rsid.json";

type GenotypeMap = HashMap<String, HashMap<String, ReferenceEntry>>;

/// Read-only annotation table: rsid -> first allele -> second allele -> entry.
///
/// Allele keys are stored in canonical (sorted, uppercase) order, so a lookup
/// with a [`CanonicalAllelePair`] is order-independent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceTable {
    entries: HashMap<String, GenotypeMap>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, rsid: &str, pair: &CanonicalAllelePair) -> Option<&ReferenceEntry> {
        self.entries
            .get(rsid)?
            .get(pair.first())?
            .get(pair.second())
    }

    pub fn insert(
        &mut self,
        rsid: impl Into<String>,
        pair: &CanonicalAllelePair,
        entry: ReferenceEntry,
    ) {
        self.entries
            .entry(rsid.into())
            .or_default()
            .entry(pair.first().to_string())
            .or_default()
            .insert(pair.second().to_string(), entry);
    }

    /// Number of annotated rsids
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of annotated genotypes across all rsids
    pub fn genotype_count(&self) -> usize {
        self.entries
            .values()
            .flat_map(|by_first| by_first.values())
            .map(|by_second| by_second.len())
            .sum()
    }

    /// Load a table from `.json`, `.json.gz`, `.json.bz2`, `.json.xz` or a `.zip`
    /// archive holding [`ARCHIVE_ENTRY`].
    pub fn load(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let file = File::open(path)?;

        let table = if name.ends_with(".zip") {
            Self::from_zip(file, &path.display().to_string())?
        } else if name.ends_with(".gz") {
            Self::from_json_reader(MultiGzDecoder::new(file))?
        } else if name.ends_with(".bz2") {
            Self::from_json_reader(BzDecoder::new(file))?
        } else if name.ends_with(".xz") {
            Self::from_json_reader(XzDecoder::new(file))?
        } else {
            Self::from_json_reader(file)?
        };

        info!(
            "Loaded reference table from {}: {} rsids, {} genotypes",
            path.display(),
            table.len(),
            table.genotype_count()
        );
        Ok(table)
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(BufReader::new(reader))?)
    }

    fn from_zip(file: File, label: &str) -> Result<Self> {
        let mut archive = ZipArchive::new(BufReader::new(file))?;

        let entry_name = if archive.file_names().any(|n| n == ARCHIVE_ENTRY) {
            ARCHIVE_ENTRY.to_string()
        } else {
            archive
                .file_names()
                .find(|n| n.to_lowercase().ends_with(".json"))
                .map(str::to_owned)
                .ok_or_else(|| InsightsError::MissingArchiveEntry(label.to_string()))?
        };

        debug!("Reading {} from {}", entry_name, label);
        let entry = archive.by_name(&entry_name)?;
        Self::from_json_reader(entry)
    }

    /// Compile a table from JSON lines, one annotated genotype per line.
    ///
    /// A later record for the same rsid and genotype replaces an earlier one.
    pub fn from_jsonl<R: BufRead>(reader: R) -> Result<CompiledReference> {
        let mut table = Self::new();
        let mut genes = GeneIndex::default();
        let mut skipped = 0;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<GenotypeRecord>(&line) {
                Ok(record) => match record.into_parts() {
                    Some((rsid, pair, entry)) => {
                        genes.insert(&rsid, &pair, &entry);
                        table.insert(rsid, &pair, entry);
                    }
                    None => {
                        warn!("Skipping record on line {}: missing rsid or alleles", idx + 1);
                        skipped += 1;
                    }
                },
                Err(e) => {
                    warn!("Skipping record on line {}: {}", idx + 1, e);
                    skipped += 1;
                }
            }
        }

        info!(
            "Compiled {} rsids ({} genotypes) and {} genes, skipped {} records",
            table.len(),
            table.genotype_count(),
            genes.len(),
            skipped
        );
        Ok(CompiledReference {
            table,
            genes,
            skipped,
        })
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Output of [`ReferenceTable::from_jsonl`]
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledReference {
    pub table: ReferenceTable,
    pub genes: GeneIndex,
    /// Records that could not be used
    pub skipped: usize,
}

/// Annotation keyed by gene instead of rsid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneEntry {
    pub rsid: String,
    pub summary: String,
    pub magnitude: f64,
    pub repute: Repute,
}

/// Secondary index: gene -> first allele -> second allele -> entry.
///
/// Records without a gene are left out. When several rsids of one gene share a
/// genotype, the last record compiled wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneIndex {
    entries: HashMap<String, HashMap<String, HashMap<String, GeneEntry>>>,
}

impl GeneIndex {
    fn insert(&mut self, rsid: &str, pair: &CanonicalAllelePair, entry: &ReferenceEntry) {
        if entry.gene.is_empty() {
            return;
        }

        self.entries
            .entry(entry.gene.clone())
            .or_default()
            .entry(pair.first().to_string())
            .or_default()
            .insert(
                pair.second().to_string(),
                GeneEntry {
                    rsid: rsid.to_string(),
                    summary: entry.summary.clone(),
                    magnitude: entry.magnitude,
                    repute: entry.repute,
                },
            );
    }

    pub fn lookup(&self, gene: &str, pair: &CanonicalAllelePair) -> Option<&GeneEntry> {
        self.entries
            .get(gene)?
            .get(pair.first())?
            .get(pair.second())
    }

    /// Number of genes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// One scraped genotype page, e.g. title "Rs1801133(C;T)"
#[derive(Debug, Deserialize)]
struct GenotypeRecord {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    allele1: Option<String>,
    #[serde(default)]
    allele2: Option<String>,
    #[serde(default)]
    gene: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    magnitude: Option<f64>,
    #[serde(default)]
    repute: Option<String>,
}

impl GenotypeRecord {
    fn into_parts(self) -> Option<(String, CanonicalAllelePair, ReferenceEntry)> {
        let title = self.title?.to_lowercase();
        let rsid = title.split('(').next().unwrap_or_default().trim().to_string();
        if rsid.is_empty() {
            return None;
        }

        let pair = CanonicalAllelePair::new(
            self.allele1.as_deref().unwrap_or_default(),
            self.allele2.as_deref().unwrap_or_default(),
        )?;

        let entry = ReferenceEntry {
            gene: self.gene.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            magnitude: self.magnitude.unwrap_or_default(),
            repute: self
                .repute
                .map(|r| Repute::from_label(&r))
                .unwrap_or_default(),
        };

        Some((rsid, pair, entry))
    }
}
