use std::collections::BTreeSet;
use std::io::{self, Write};

use anyhow::{Context, Result};
use corpus_core::RowStatus;
use corpus_engine::{load_manifest, read_sink};

use crate::cli::StatusArgs;

pub fn print_status(args: &StatusArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_status(args, &mut out)
}

pub fn write_status(args: &StatusArgs, out: &mut impl Write) -> Result<()> {
    let manifest = load_manifest(&args.manifest)
        .with_context(|| format!("loading manifest {}", args.manifest.display()))?;
    let summary = manifest.summary();

    writeln!(out, "manifest: {}", args.manifest.display())?;
    writeln!(
        out,
        "rows: {} total, {} done, {} pending, {} failed",
        summary.total, summary.done, summary.pending, summary.failed
    )?;
    writeln!(
        out,
        "done rows: {} chars, {} tokens",
        summary.total_chars, summary.total_tokens
    )?;

    let failed = manifest.select_with(&[RowStatus::Failed]);
    for row in failed.iter().take(args.show_failed) {
        writeln!(
            out,
            "  failed {} {}: {}",
            row.doc_id,
            row.relative_path,
            row.error.as_deref().unwrap_or("")
        )?;
    }
    if failed.len() > args.show_failed {
        writeln!(out, "  ... {} more", failed.len() - args.show_failed)?;
    }

    if let Some(output) = &args.output {
        let contents =
            read_sink(output).with_context(|| format!("reading output {}", output.display()))?;
        let distinct: BTreeSet<_> = contents.records.iter().map(|r| r.doc_id).collect();
        writeln!(
            out,
            "output: {} records, {} distinct documents{}",
            contents.records.len(),
            distinct.len(),
            if contents.discarded_tail {
                ", incomplete final line ignored"
            } else {
                ""
            }
        )?;
    }
    Ok(())
}
