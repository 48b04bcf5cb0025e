use anyhow::{Context, Result};
use chrono::Local;
use csv::WriterBuilder;
use serde_json::to_string_pretty;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::types::{Match, Repute};

/// Supported report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Html,
    Csv,
    Json,
    Tsv,
    All,
}

/// Writes match reports into an output directory
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: &Path) -> Result<Self> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir).with_context(|| {
                format!("Failed to create output directory {}", output_dir.display())
            })?;
        }

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Generate reports in the given format(s); returns the written paths
    pub fn generate(&self, matches: &[&Match], format: ReportFormat) -> Result<Vec<PathBuf>> {
        let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();

        let written = match format {
            ReportFormat::Html => vec![self.generate_html_report(matches, &timestamp)?],
            ReportFormat::Csv => vec![self.generate_delimited_report(matches, &timestamp, b',')?],
            ReportFormat::Json => vec![self.generate_json_report(matches, &timestamp)?],
            ReportFormat::Tsv => vec![self.generate_delimited_report(matches, &timestamp, b'\t')?],
            ReportFormat::All => vec![
                self.generate_html_report(matches, &timestamp)?,
                self.generate_delimited_report(matches, &timestamp, b',')?,
                self.generate_json_report(matches, &timestamp)?,
                self.generate_delimited_report(matches, &timestamp, b'\t')?,
            ],
        };

        for path in &written {
            info!("Wrote {} matches to {}", matches.len(), path.display());
        }
        Ok(written)
    }

    fn report_path(&self, timestamp: &str, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("matches_{}.{}", timestamp, extension))
    }

    fn generate_json_report(&self, matches: &[&Match], timestamp: &str) -> Result<PathBuf> {
        let path = self.report_path(timestamp, "json");

        let json_content =
            to_string_pretty(matches).with_context(|| "Failed to serialize matches to JSON")?;

        fs::write(&path, json_content)
            .with_context(|| format!("Failed to write JSON report to {}", path.display()))?;

        Ok(path)
    }

    fn generate_delimited_report(
        &self,
        matches: &[&Match],
        timestamp: &str,
        delimiter: u8,
    ) -> Result<PathBuf> {
        let extension = if delimiter == b'\t' { "tsv" } else { "csv" };
        let path = self.report_path(timestamp, extension);

        let mut wtr = WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(&path)
            .with_context(|| format!("Failed to create {} writer for {}", extension, path.display()))?;

        wtr.write_record(["key", "rsid", "gene", "magnitude", "repute", "summary"])?;

        for m in matches {
            let magnitude = m.magnitude.to_string();
            wtr.write_record([
                m.key.as_str(),
                m.rsid(),
                m.gene.as_str(),
                magnitude.as_str(),
                m.repute.as_str(),
                m.summary.as_str(),
            ])?;
        }

        wtr.flush()?;
        Ok(path)
    }

    fn generate_html_report(&self, matches: &[&Match], timestamp: &str) -> Result<PathBuf> {
        let path = self.report_path(timestamp, "html");

        fs::write(&path, create_html_content(matches))
            .with_context(|| format!("Failed to write HTML report to {}", path.display()))?;

        Ok(path)
    }
}

/// SNPedia page for an rsid
pub fn snpedia_url(rsid: &str) -> String {
    format!("https://bots.snpedia.com/index.php/{}", rsid)
}

fn create_html_content(matches: &[&Match]) -> String {
    let generated = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let cards: String = matches.iter().map(|m| html_card(m)).collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>DNA Insights</title>
    <style>
        body {{
            font-family: Arial, sans-serif;
            margin: 40px;
            background-color: #f5f5f5;
        }}
        .genotype-grid {{
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(320px, 1fr));
            gap: 16px;
        }}
        .genotype-card {{
            background-color: white;
            border-left: 6px solid #bbb;
            padding: 16px;
            border-radius: 6px;
            box-shadow: 0 0 6px rgba(0,0,0,0.1);
        }}
        .good-repute {{
            border-left-color: #28a745;
        }}
        .bad-repute {{
            border-left-color: #dc3545;
        }}
        .disclaimer {{
            background-color: #fff3cd;
            padding: 12px;
            border-radius: 5px;
        }}
    </style>
</head>
<body>
    <h1>DNA Insights</h1>
    <p>Generated on: {}</p>
    <div class="disclaimer">
        <p><strong>Disclaimer:</strong> This report is for informational purposes only. Genetic data from SNPedia may be incomplete, outdated, or misinterpreted without context. Do not use it for medical or diagnostic decisions.</p>
    </div>
    <p>Genetic data sourced from <a href="https://www.snpedia.com/">SNPedia</a> under CC-BY-NC-SA 3.0 license.</p>
    <p>Showing {} matches</p>
    <div class="genotype-grid">
{}    </div>
</body>
</html>"#,
        generated,
        matches.len(),
        cards
    )
}

fn html_card(m: &Match) -> String {
    let class = match m.repute {
        Repute::Good => "genotype-card good-repute",
        Repute::Bad => "genotype-card bad-repute",
        Repute::Neutral => "genotype-card",
    };

    let gene = if m.gene.is_empty() {
        String::new()
    } else {
        format!(" ({})", escape_html(&m.gene))
    };

    format!(
        "        <div class=\"{}\">\n            <h3><a href=\"{}\">{}</a>{}</h3>\n            <p>{}</p>\n            <p><em>Repute: {}, Magnitude: {}</em></p>\n        </div>\n",
        class,
        snpedia_url(m.rsid()),
        escape_html(&m.key),
        gene,
        escape_html(&m.summary),
        m.repute,
        m.magnitude
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Vec<Match> {
        vec![
            Match {
                key: "rs1801133(C;T)".to_string(),
                gene: "MTHFR".to_string(),
                summary: "1.5x risk <heterozygous>".to_string(),
                magnitude: 1.5,
                repute: Repute::Bad,
            },
            Match {
                key: "rs53576(G;G)".to_string(),
                gene: String::new(),
                summary: "optimistic, empathetic".to_string(),
                magnitude: 2.0,
                repute: Repute::Good,
            },
        ]
    }

    #[test]
    fn test_all_formats_are_written() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let out = temp_dir.path().join("reports");
        let matches = sample();
        let refs: Vec<&Match> = matches.iter().collect();

        let generator = ReportGenerator::new(&out)?;
        let written = generator.generate(&refs, ReportFormat::All)?;
        assert_eq!(written.len(), 4);
        assert!(written.iter().all(|p| p.exists()));

        let json = fs::read_to_string(&written[2])?;
        let parsed: Vec<Match> = serde_json::from_str(&json)?;
        assert_eq!(parsed, matches);

        let tsv = fs::read_to_string(&written[3])?;
        let mut lines = tsv.lines();
        assert_eq!(lines.next(), Some("key\trsid\tgene\tmagnitude\trepute\tsummary"));
        assert_eq!(
            lines.next(),
            Some("rs1801133(C;T)\trs1801133\tMTHFR\t1.5\tBad\t1.5x risk <heterozygous>")
        );
        Ok(())
    }

    #[test]
    fn test_html_cards() {
        let matches = sample();
        let refs: Vec<&Match> = matches.iter().collect();
        let html = create_html_content(&refs);

        assert!(html.contains("genotype-card bad-repute"));
        assert!(html.contains("genotype-card good-repute"));
        assert!(html.contains("https://bots.snpedia.com/index.php/rs1801133"));
        assert!(html.contains("rs1801133(C;T)</a> (MTHFR)"));
        assert!(html.contains("&lt;heterozygous&gt;"));
        assert!(html.contains("Showing 2 matches"));
    }
}
