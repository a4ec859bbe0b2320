use anyhow::{Context, Result, bail};
use mailprovider_lib::{DetectionMethod, DetectionResult};

use crate::args::Cli;

#[derive(serde::Serialize)]
pub struct OutputRow {
    pub input: String,
    #[serde(flatten)]
    pub result: DetectionResult,
}

impl OutputRow {
    pub fn new(input: String, result: DetectionResult) -> Self {
        Self { input, result }
    }
}

pub fn write_reports(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    match cli.format.as_str() {
        "human" => write_human(rows, cli),
        "json" => write_json(rows, cli),
        "ndjson" => write_ndjson(rows, cli),
        other => bail!("unknown --format '{other}', use: human|json|ndjson"),
    }
}

pub fn any_undetected(rows: &[OutputRow]) -> bool {
    rows.iter().any(|row| !row.result.is_detected())
}

fn write_human(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    let report = human_report(rows);
    if let Some(path) = &cli.out {
        write_all_atomically(path, report.as_bytes())?;
    } else {
        print!("{report}");
    }
    Ok(())
}

fn human_report(rows: &[OutputRow]) -> String {
    let mut report = String::new();
    for row in rows {
        report.push_str(&human_line(row));
        report.push('\n');
        if let Some(debug) = &row.result.debug {
            for reason in &debug.reasons {
                report.push_str("        ");
                report.push_str(reason);
                report.push('\n');
            }
        }
    }
    report
}

fn human_line(row: &OutputRow) -> String {
    let result = &row.result;
    let took = result.timing.total_ms;
    match (result.method, &result.provider, &result.proxy_service) {
        (DetectionMethod::MxRecord, Some(provider), _) => format!(
            "[MX]    {} -> {} ({:.2}, {took} ms)",
            row.input,
            provider.display_name(),
            result.confidence
        ),
        (DetectionMethod::TxtRecord, Some(provider), _) => format!(
            "[TXT]   {} -> {} ({:.2}, {took} ms)",
            row.input,
            provider.display_name(),
            result.confidence
        ),
        (DetectionMethod::ProxyDetected, _, Some(proxy)) => format!(
            "[PROXY] {} -> behind {proxy} ({:.2}, {took} ms)",
            row.input, result.confidence
        ),
        _ => format!("[NONE]  {} :: no provider signal ({took} ms)", row.input),
    }
}

fn write_json(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    let s = serde_json::to_string_pretty(rows)?;
    if let Some(path) = &cli.out {
        write_all_atomically(path, s.as_bytes())?;
    } else {
        println!("{s}");
    }
    Ok(())
}

fn write_ndjson(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut buf = Vec::new();
        for row in rows {
            let line = serde_json::to_string(row)?;
            buf.extend_from_slice(line.as_bytes());
            buf.push(b'\n');
        }
        write_all_atomically(path, &buf)?;
    } else {
        for row in rows {
            println!("{}", serde_json::to_string(row)?);
        }
    }
    Ok(())
}

fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let tmp = format!("{path}.tmp");
    {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("rename {tmp} -> {path}"))?;
    Ok(())
}
