use anyhow::{Context, Result, bail};
use mailprovider_lib::{Detector, ProviderSignature, SignatureIndex, SystemResolver};

use std::io::{self, BufRead};
use std::path::Path;

mod args;
mod output;

use args::{Cli, Commands, domain_of};
use output::OutputRow;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let inputs: Vec<String> = if cli.stdin {
        let mut lines = Vec::new();
        for line in io::stdin().lock().lines() {
            let line = line.context("read stdin")?;
            if !line.trim().is_empty() {
                lines.push(line.trim().to_string());
            }
        }
        lines
    } else if let Some(Commands::Detect { target }) = &cli.cmd {
        vec![target.trim().to_string()]
    } else {
        Cli::clap_command().print_help()?;
        println!();
        return Ok(());
    };

    let Some(catalog) = cli.catalog.as_deref() else {
        bail!("--catalog <file.json> est requis pour la détection");
    };
    let index = load_catalog(catalog)?;
    if index.is_empty() {
        eprintln!("warning: catalog {} has no usable signature", catalog.display());
    }

    let resolver = match cli.dns_timeout_ms {
        Some(ms) => SystemResolver::with_timeout(ms),
        None => SystemResolver::from_system_conf().context("init system resolver")?,
    };
    let detector = Detector::new(index, resolver).with_options(cli.detection_options());

    let results = detector
        .detect_batch(inputs.iter().map(|input| domain_of(input)), cli.concurrency)
        .await;
    let rows: Vec<OutputRow> = inputs
        .into_iter()
        .zip(results)
        .map(|(input, result)| OutputRow::new(input, result))
        .collect();

    output::write_reports(&rows, &cli)?;

    if output::any_undetected(&rows) {
        std::process::exit(2);
    }
    Ok(())
}

fn load_catalog(path: &Path) -> Result<SignatureIndex> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read catalog {}", path.display()))?;
    let signatures: Vec<ProviderSignature> = serde_json::from_str(&raw)
        .with_context(|| format!("parse catalog {}", path.display()))?;
    Ok(SignatureIndex::build(signatures))
}
