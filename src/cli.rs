use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::info;

use wpa2_decoder::{
    generate_combinations, scan_file, Bytes, DictionaryAttack, KeyTestParameters, ScanReport,
    SilentProgress, TerminalProgress, WordTransformRules,
};

#[derive(Parser)]
#[command(name = "wpa2-decoder")]
#[command(version)]
#[command(about = "Offline WPA2 passphrase recovery from captured handshakes - Educational use only", long_about = None)]
pub struct Args {
    /// Number of threads to use (default: CPU count)
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    /// Log debug details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the networks, conversations and usable handshakes of a capture
    ///
    /// Example: wpa2-decoder analyze capture.json
    Analyze {
        /// Decoded capture (.json)
        #[arg(value_name = "CAPTURE")]
        capture: PathBuf,
    },

    /// Print the candidate passwords built from one pair of words
    ///
    /// Example: wpa2-decoder generate --config rules.json netgear home
    Generate {
        #[command(flatten)]
        rules: RuleOptions,

        #[arg(value_name = "WORD1")]
        word1: String,

        /// Defaults to WORD1
        #[arg(value_name = "WORD2")]
        word2: Option<String>,
    },

    /// Run the dictionary attack against the first usable handshake
    ///
    /// Every pair of seed words is expanded into candidates and tested.
    ///
    /// Example: wpa2-decoder crack --config rules.json capture.json
    Crack {
        #[command(flatten)]
        rules: RuleOptions,

        /// Decoded capture (.json)
        #[arg(value_name = "CAPTURE")]
        capture: PathBuf,
    },
}

#[derive(clap::Args)]
pub struct RuleOptions {
    /// Word transformation rules (.json)
    #[arg(short, long, value_name = "RULES")]
    pub config: Option<PathBuf>,

    /// Minimum password length
    #[arg(long)]
    pub min: Option<usize>,

    /// Maximum password length
    #[arg(long)]
    pub max: Option<usize>,

    /// Additional seed word (repeatable)
    #[arg(short, long = "word")]
    pub words: Vec<String>,

    /// Only vary the case of the first letter
    #[arg(long)]
    pub capitalize_first_only: bool,
}

impl RuleOptions {
    /// Rules file (or defaults) with command-line overrides applied
    pub fn resolve(&self) -> Result<WordTransformRules> {
        let mut rules = match &self.config {
            Some(path) => WordTransformRules::load(path)
                .with_context(|| format!("Failed to load rules: {}", path.display()))?,
            None => WordTransformRules::default(),
        };

        if let Some(min) = self.min {
            rules.min_length = min;
        }
        if let Some(max) = self.max {
            rules.max_length = max;
        }
        rules.words.extend(self.words.iter().cloned());
        rules.capitalize_first_only |= self.capitalize_first_only;

        rules.validate().context("Invalid word transformation rules")?;
        Ok(rules)
    }
}

pub fn run_command(args: Args) -> Result<()> {
    let threads = args.threads.unwrap_or_else(num_cpus::get);
    match args.command {
        Command::Analyze { capture } => analyze(&capture),
        Command::Generate { rules, word1, word2 } => {
            let rules = rules.resolve()?;
            let word2 = word2.unwrap_or_else(|| word1.clone());
            let candidates = generate_combinations(&word1, &word2, &rules, &SilentProgress);
            for candidate in &candidates {
                println!("{}", candidate);
            }
            info!(count = candidates.len(), "generated candidates");
            Ok(())
        }
        Command::Crack { rules, capture } => crack(&capture, rules.resolve()?, threads),
    }
}

fn load_capture(path: &Path) -> Result<ScanReport> {
    let report = scan_file(path)
        .with_context(|| format!("Failed to read capture: {}", path.display()))?;
    if report.rejected > 0 {
        println!(
            "{} Skipped {} key frames matching no handshake message",
            "[!]".yellow(),
            report.rejected
        );
    }
    Ok(report)
}

fn analyze(path: &Path) -> Result<()> {
    let report = load_capture(path)?;
    let summary = &report.summary;

    println!(
        "{} Found {} networks:",
        "[+]".green(),
        summary.networks().len()
    );
    for network in summary.networks() {
        println!("    {}  {}", network.bssid.mac_string(), network.ssid.bold());
    }

    println!(
        "\n{} Found {} conversations:",
        "[+]".green(),
        summary.conversations().len()
    );
    for conversation in summary.conversations() {
        println!(
            "    {}  {:<24} {}",
            conversation.bssid().mac_string(),
            conversation.ssid().unwrap_or("<unknown>"),
            conversation.captured_messages().cyan()
        );
    }

    let params = summary.reconstruct_key_test_parameters();
    if params.is_empty() {
        println!("\n{}", "No usable handshake (needs M1, M2 and M3)".red().bold());
        return Ok(());
    }

    println!("\n{} Usable handshakes:", "[+]".green());
    for (index, p) in params.iter().enumerate() {
        print_handshake(index + 1, p);
    }
    Ok(())
}

fn print_handshake(index: usize, params: &KeyTestParameters) {
    println!("    #{} {}", index, params.ssid().bold());
    println!("       AP:     {}", Bytes::from(*params.bssid()).mac_string());
    println!("       Client: {}", Bytes::from(*params.client_mac()).mac_string());
    println!("       Cipher: {}", params.cipher());
    println!(
        "       M3: {}  M4: {}",
        yes_no(params.m3_mic().is_some()),
        yes_no(params.m4_mic().is_some())
    );
}

fn yes_no(present: bool) -> ColoredString {
    if present {
        "yes".green()
    } else {
        "no".yellow()
    }
}

fn crack(path: &Path, rules: WordTransformRules, threads: usize) -> Result<()> {
    let report = load_capture(path)?;
    let params = report.summary.reconstruct_key_test_parameters();

    let attack = DictionaryAttack::new(&params, rules, threads)
        .context("Failed to prepare dictionary attack")?;

    println!("{}", "Starting offline WPA2 dictionary attack".cyan().bold());
    print_handshake(1, attack.key_parameters());
    println!("    Threads: {}\n", attack.threads());

    let progress = TerminalProgress::new();
    let outcome = attack.run(&progress);
    progress.finish("Done");

    println!("\n{}", "Statistics:".cyan().bold());
    println!("   Rounds:        {}", outcome.rounds);
    println!("   Total attempts: {}", outcome.attempts);
    println!("   Time elapsed:  {:.2}s", outcome.duration_secs);
    println!("   Average rate:  {:.0} passwords/second", outcome.passwords_per_second);

    match outcome.password {
        Some(password) => println!(
            "\n{} {}",
            "Password found:".green().bold(),
            password.bold()
        ),
        None => println!("\n{}", "Password not found in the generated dictionary".red().bold()),
    }
    Ok(())
}
