//! Flat-file export of a generated corpus.
//!
//! - `corpus.csv`: header from [`Corpus::COLUMNS`] followed by covariate
//!   names, one line per row. Floats use Rust's shortest round-trip
//!   formatting, so identical corpora produce byte-identical files.
//! - `summary.json`: [`CorpusSummary`] pretty-printed.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::corpus::{Corpus, CorpusRow};
use crate::error::Result;
use crate::statistics::CorpusSummary;

/// Quote a CSV field when it contains a delimiter, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn write_row<W: Write>(w: &mut W, row: &CorpusRow) -> std::io::Result<()> {
    let t = &row.turn;
    let p = &row.participants;
    write!(
        w,
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        csv_field(&t.study),
        row.paradigm.as_str(),
        row.inference_schedule.as_str(),
        csv_field(&t.video_id()),
        csv_field(&t.chapter_id()),
        csv_field(&t.turn_id()),
        csv_field(&p.target_id),
        csv_field(&p.perceiver_id),
        csv_field(&p.partner_id),
        t.video,
        t.chapter,
        t.turn,
        t.turn_count,
        t.chapter_length,
        t.turn_length,
        t.start_time,
        t.end_time,
        t.turns_from_inference,
        t.turn_percent_through_chapter,
        t.time_percent_through_chapter,
        t.speaker.as_str(),
        t.similarity,
        t.act.as_str(),
        t.similarity_raw,
    )?;
    for v in &row.covariates {
        write!(w, ",{}", v)?;
    }
    writeln!(w)
}

/// Write the corpus as CSV to any writer.
pub fn write_corpus_csv<W: Write>(corpus: &Corpus, mut w: W) -> Result<()> {
    let mut header: Vec<String> = Corpus::COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend(corpus.covariate_names().iter().map(|n| csv_field(n)));
    writeln!(w, "{}", header.join(","))?;
    for row in &corpus.rows {
        write_row(&mut w, row)?;
    }
    w.flush()?;
    Ok(())
}

/// Render the corpus CSV into a string.
pub fn corpus_csv_string(corpus: &Corpus) -> Result<String> {
    let mut buf = Vec::new();
    write_corpus_csv(corpus, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn save_corpus_csv(corpus: &Corpus, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let file = File::create(path)?;
    write_corpus_csv(corpus, BufWriter::with_capacity(1 << 20, file))
}

pub fn save_summary(summary: &CorpusSummary, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    std::fs::write(path, summary.to_json()?)?;
    Ok(())
}
