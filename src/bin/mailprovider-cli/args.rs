use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mailprovider_lib::{DEFAULT_TIMEOUT_MS, DetectionOptions};

#[derive(Parser)]
#[command(name = "mailprovider-cli")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,

    /// catalogue des fournisseurs (JSON: liste de signatures)
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// lit des domaines ou adresses depuis stdin (un par ligne)
    #[arg(long)]
    pub stdin: bool,

    /// write report to file (human/JSON/NDJSON selon --format)
    #[arg(long)]
    pub out: Option<String>,

    /// format: human|json|ndjson
    #[arg(long, default_value = "human")]
    pub format: String,

    /// budget global par domaine (ms), 0 ou négatif = aucune requête
    #[arg(long = "timeout", default_value_t = DEFAULT_TIMEOUT_MS, allow_negative_numbers = true)]
    pub timeout_ms: i64,

    /// timeout du resolver par requête (ms), sinon configuration système
    #[arg(long = "dns-timeout")]
    pub dns_timeout_ms: Option<u64>,

    /// interroge MX puis TXT au lieu de les lancer en parallèle
    #[arg(long)]
    pub sequential: bool,

    /// désactive la relance séquentielle quand le parallèle ne rapporte rien
    #[arg(long)]
    pub no_fallback: bool,

    /// préfère TXT à MX quand les deux désignent un fournisseur différent
    #[arg(long)]
    pub prefer_txt: bool,

    /// joint la trace de détection au rapport
    #[arg(long)]
    pub debug: bool,

    /// nombre de domaines traités simultanément (--stdin)
    #[arg(long, default_value_t = 8)]
    pub concurrency: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    Detect {
        /// domaine ou adresse e-mail
        target: String,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }

    pub fn detection_options(&self) -> DetectionOptions {
        DetectionOptions::default()
            .with_timeout_ms(self.timeout_ms)
            .parallel(!self.sequential)
            .fallback_to_sequential(!self.no_fallback)
            .prioritize_mx(!self.prefer_txt)
            .collect_debug_info(self.debug)
    }
}

/// Domain part of an input line: everything after the last `@`, or the
/// whole input when it is already a bare domain.
pub fn domain_of(input: &str) -> &str {
    let input = input.trim();
    match input.rsplit_once('@') {
        Some((_, domain)) => domain,
        None => input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_of_takes_the_part_after_the_last_at() {
        assert_eq!(domain_of("user@example.com"), "example.com");
        assert_eq!(domain_of("\"a@b\"@example.org "), "example.org");
        assert_eq!(domain_of("example.net"), "example.net");
    }

    #[test]
    fn flags_map_onto_detection_options() {
        let cli = Cli::try_parse_from([
            "mailprovider-cli",
            "--catalog",
            "providers.json",
            "--timeout",
            "-1",
            "--sequential",
            "--no-fallback",
            "--prefer-txt",
            "--debug",
            "detect",
            "example.com",
        ])
        .expect("valid arguments");

        let options = cli.detection_options();
        assert_eq!(options.timeout_ms, -1);
        assert!(!options.enable_parallel);
        assert!(!options.fallback_to_sequential);
        assert!(!options.prioritize_mx);
        assert!(options.collect_debug_info);
    }

    #[test]
    fn defaults_follow_the_library() {
        let cli = Cli::try_parse_from(["mailprovider-cli", "detect", "example.com"])
            .expect("valid arguments");
        assert_eq!(cli.detection_options(), DetectionOptions::default());
        assert_eq!(cli.concurrency, 8);
    }
}
