use anyhow::{bail, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::{generate, Shell};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, MultiSelect};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

use dna_insights::config::{validate_criteria, Settings};
use dna_insights::output::snpedia_url;
use dna_insights::{
    parse_genotypes, sort_by_magnitude, CompiledReference, FilterCriteria, Match, MatchBrowser,
    ReferenceTable, ReportFormat, ReportGenerator, Repute, ReputeSet,
};

/// Match raw consumer genotype files against SNPedia annotations
#[derive(Parser, Debug)]
#[command(
    name = "dna-insights",
    version,
    about = "Find annotated SNPedia genotypes in a raw DNA file",
    long_about = r#"
Streams a raw genotype export (rsid, chromosome, position, allele1, allele2)
against a precompiled SNPedia reference table and lists every genotype with a
known annotation, with gene, summary, magnitude and repute.

For informational purposes only. Not for medical or diagnostic decisions.
"#
)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Match a raw genotype file against the reference table
    Scan(ScanArgs),
    /// Compile scraped genotype records (JSON lines) into a reference table
    Compile {
        /// JSON lines input, one genotype record per line
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Reference table JSON to write
        #[arg(value_hint = ValueHint::FilePath)]
        output: PathBuf,
        /// Also write a gene-keyed index (gene -> genotype -> rsid annotation)
        #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
        genes: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Raw genotype file
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    genotypes: PathBuf,

    /// Reference table (.json, .json.gz, .json.bz2, .json.xz or .zip)
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    reference: Option<PathBuf>,

    /// Settings file (defaults to ./dna-insights.toml when present)
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Reputes to show (comma-separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    repute: Vec<Repute>,

    /// Minimum magnitude to show
    #[arg(short, long)]
    min_magnitude: Option<f64>,

    /// Case-insensitive search across rsid, gene and summary
    #[arg(short, long)]
    search: Option<String>,

    /// Pages to print in text mode (0 = all)
    #[arg(long, default_value = "1")]
    pages: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Output directory for reports
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    output: Option<PathBuf>,

    /// Interactive mode: prompt for filters and page through results
    #[arg(short, long)]
    interactive: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Html,
    Csv,
    Json,
    Tsv,
    All,
}

impl OutputFormat {
    fn report_format(self) -> Option<ReportFormat> {
        match self {
            OutputFormat::Text => None,
            OutputFormat::Html => Some(ReportFormat::Html),
            OutputFormat::Csv => Some(ReportFormat::Csv),
            OutputFormat::Json => Some(ReportFormat::Json),
            OutputFormat::Tsv => Some(ReportFormat::Tsv),
            OutputFormat::All => Some(ReportFormat::All),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Scan(args) => run_scan(args).await,
        Commands::Compile {
            input,
            output,
            genes,
        } => run_compile(&input, &output, genes.as_deref()),
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    }
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("dna_insights={}", level))
        .with_writer(io::stderr)
        .init();
}

/// Effective scan settings after merging the settings file and flags
#[derive(Debug)]
struct ScanConfig {
    genotypes: PathBuf,
    reference: PathBuf,
    criteria: FilterCriteria,
    page_size: usize,
    pages: usize,
    format: OutputFormat,
    output: PathBuf,
    interactive: bool,
}

impl ScanConfig {
    fn resolve(args: ScanArgs, settings: Settings) -> Result<Self> {
        let reference = match args.reference.or(settings.reference) {
            Some(path) => path,
            None => bail!(
                "No reference table given; pass --reference or set `reference` in the config file"
            ),
        };

        let mut criteria = settings.filter.to_criteria();
        if !args.repute.is_empty() {
            criteria.reputes = ReputeSet::from_reputes(&args.repute);
        }
        if let Some(min_magnitude) = args.min_magnitude {
            criteria.min_magnitude = min_magnitude;
        }
        if let Some(search) = args.search {
            criteria.query = search;
        }
        validate_criteria(&criteria)?;

        Ok(Self {
            genotypes: args.genotypes,
            reference,
            criteria,
            page_size: settings.page_size,
            pages: args.pages,
            format: args.format,
            output: args.output.unwrap_or(settings.output_dir),
            interactive: args.interactive,
        })
    }
}

async fn run_scan(args: ScanArgs) -> Result<()> {
    let settings = Settings::load(args.config.as_deref())?;
    let mut config = ScanConfig::resolve(args, settings)?;

    if config.interactive {
        config.criteria = prompt_criteria(&config.criteria)?;
        validate_criteria(&config.criteria)?;
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Loading reference table {}...", config.reference.display()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let reference_path = config.reference.clone();
    let table = tokio::task::spawn_blocking(move || ReferenceTable::load(&reference_path))
        .await?
        .with_context(|| format!("Failed to load reference table {}", config.reference.display()))?;
    spinner.finish_and_clear();

    let file = tokio::fs::File::open(&config.genotypes)
        .await
        .with_context(|| format!("Failed to open {}", config.genotypes.display()))?;
    let total_bytes = file.metadata().await?.len();

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("Reading genotypes...");

    let mut matches = parse_genotypes(file, total_bytes, &table, |percent| {
        pb.set_position(u64::from(percent))
    })
    .await
    .with_context(|| format!("Failed to parse {}", config.genotypes.display()))?;
    pb.finish_and_clear();

    sort_by_magnitude(&mut matches);
    let mut browser = MatchBrowser::new(matches, config.criteria.clone(), config.page_size);
    info!(
        "{} annotated genotypes, {} after filters",
        browser.total(),
        browser.filtered_len()
    );

    println!(
        "{} {} annotated genotypes found, {} shown with current filters",
        style("✓").green().bold(),
        style(browser.total()).cyan(),
        style(browser.filtered_len()).cyan()
    );

    match config.format.report_format() {
        None => print_pages(&mut browser, config.pages, config.interactive)?,
        Some(format) => {
            let generator = ReportGenerator::new(&config.output)?;
            let filtered: Vec<&Match> = browser.filtered().collect();
            let written = generator.generate(&filtered, format)?;
            for path in written {
                println!("  {} {}", style("→").dim(), style(path.display()).cyan());
            }
        }
    }

    Ok(())
}

fn prompt_criteria(defaults: &FilterCriteria) -> Result<FilterCriteria> {
    let theme = ColorfulTheme::default();

    let options = [Repute::Good, Repute::Bad, Repute::Neutral];
    let checked: Vec<bool> = options
        .iter()
        .map(|r| defaults.reputes.contains(*r))
        .collect();
    let selected = MultiSelect::with_theme(&theme)
        .with_prompt("Reputes to show")
        .items(&options)
        .defaults(&checked)
        .interact()?;
    let reputes: Vec<Repute> = selected.into_iter().map(|i| options[i]).collect();

    let min_magnitude: f64 = Input::with_theme(&theme)
        .with_prompt("Minimum magnitude")
        .default(defaults.min_magnitude)
        .validate_with(|value: &f64| -> std::result::Result<(), &'static str> {
            if value.is_finite() {
                Ok(())
            } else {
                Err("Enter a finite number")
            }
        })
        .interact_text()?;

    let query: String = Input::with_theme(&theme)
        .with_prompt("Search (rsid, gene or summary)")
        .default(defaults.query.clone())
        .allow_empty(true)
        .interact_text()?;

    Ok(FilterCriteria {
        reputes: ReputeSet::from_reputes(&reputes),
        min_magnitude,
        query,
    })
}

fn print_pages(browser: &mut MatchBrowser, pages: usize, interactive: bool) -> Result<()> {
    if !interactive {
        let mut revealed = 1;
        while browser.has_more() && (pages == 0 || revealed < pages) {
            browser.reveal_more();
            revealed += 1;
        }
    }

    let mut printed = 0;
    loop {
        for m in browser.visible().skip(printed) {
            print_card(m);
        }
        printed = browser.visible_count();

        if !browser.has_more() {
            println!(
                "{}",
                style(format!("Showing all {} matches", browser.filtered_len())).dim()
            );
            break;
        }

        if !interactive {
            println!(
                "{}",
                style(format!(
                    "Showing {} of {} matches (use --pages 0 to show all)",
                    printed,
                    browser.filtered_len()
                ))
                .dim()
            );
            break;
        }

        let more = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Showing {} of {}. Show more?",
                printed,
                browser.filtered_len()
            ))
            .default(true)
            .interact()?;
        if !more {
            break;
        }
        browser.reveal_more();
    }

    Ok(())
}

fn print_card(m: &Match) {
    let title = match m.repute {
        Repute::Good => style(m.key.as_str()).green().bold(),
        Repute::Bad => style(m.key.as_str()).red().bold(),
        Repute::Neutral => style(m.key.as_str()).bold(),
    };

    if m.gene.is_empty() {
        println!("{}", title);
    } else {
        println!("{} ({})", title, style(&m.gene).yellow());
    }
    if !m.summary.is_empty() {
        println!("  {}", m.summary);
    }
    println!(
        "  {}",
        style(format!("Repute: {}, Magnitude: {}", m.repute, m.magnitude)).italic()
    );
    println!("  {}", style(snpedia_url(m.rsid())).dim());
    println!();
}

fn run_compile(input: &Path, output: &Path, genes_output: Option<&Path>) -> Result<()> {
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?,
    );
    let CompiledReference {
        table,
        genes,
        skipped,
    } = ReferenceTable::from_jsonl(reader)
        .with_context(|| format!("Failed to compile {}", input.display()))?;

    let writer = BufWriter::new(
        File::create(output).with_context(|| format!("Failed to create {}", output.display()))?,
    );
    table
        .write_json(writer)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if let Some(path) = genes_output {
        let writer = BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        );
        genes
            .write_json(writer)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!(
            "{} Indexed {} genes into {}",
            style("✓").green().bold(),
            style(genes.len()).cyan(),
            style(path.display()).cyan()
        );
    }

    println!(
        "{} Compiled {} rsids ({} genotypes) into {}",
        style("✓").green().bold(),
        style(table.len()).cyan(),
        table.genotype_count(),
        style(output.display()).cyan()
    );
    if skipped > 0 {
        println!("  {} {} records skipped", style("!").yellow(), skipped);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_args(extra: &[&str]) -> ScanArgs {
        let mut argv = vec!["dna-insights", "scan", "genome.txt", "--reference", "snps.zip"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Scan(args) => args,
            other => panic!("expected scan, got {other:?}"),
        }
    }

    #[test]
    fn test_flags_override_settings() {
        let args = scan_args(&["--repute", "good,bad", "--min-magnitude", "2", "--search", "apoe"]);
        let config = ScanConfig::resolve(args, Settings::default()).unwrap();
        assert!(config.criteria.reputes.contains(Repute::Bad));
        assert!(!config.criteria.reputes.contains(Repute::Neutral));
        assert_eq!(config.criteria.min_magnitude, 2.0);
        assert_eq!(config.criteria.query, "apoe");
    }

    #[test]
    fn test_non_finite_min_magnitude_flag_is_rejected() {
        for value in ["NaN", "inf", "-inf"] {
            let flag = format!("--min-magnitude={value}");
            let args = scan_args(&[flag.as_str()]);
            assert!(ScanConfig::resolve(args, Settings::default()).is_err(), "{value}");
        }
    }

    #[test]
    fn test_compile_writes_gene_index() -> Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let input = temp_dir.path().join("genotypes.jsonl");
        std::fs::write(
            &input,
            r#"{"title": "Rs429358(C;C)", "allele1": "C", "allele2": "C", "gene": "APOE", "summary": "risk", "magnitude": 3, "repute": "Bad"}"#,
        )?;
        let output = temp_dir.path().join("genotypes_by_rsid.json");
        let genes = temp_dir.path().join("genotypes_by_gene.json");

        run_compile(&input, &output, Some(genes.as_path()))?;

        assert_eq!(ReferenceTable::load(&output)?.len(), 1);
        let index: dna_insights::GeneIndex =
            serde_json::from_str(&std::fs::read_to_string(&genes)?)?;
        assert_eq!(index.len(), 1);
        Ok(())
    }
}
