//! Report formatting and emission
//!
//! The walker hands finished records to a `ReportSink`; this module
//! provides the two sinks the binary uses. `TextReport` writes one row per
//! entry in traversal order (size, optional time column, path), scaled and
//! colored per configuration. `JsonReport` collects the same rows and
//! prints a single machine-readable document at the end.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::stats::CacheStats;

/// How raw byte counts are scaled for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeScale {
    /// Autoscale to the largest fitting unit: `1.0K`, `234M`, `2G`.
    /// `si` selects powers of 1000 instead of 1024.
    Human { si: bool },
    /// Fixed block size; counts round up to whole blocks.
    Blocks(u64),
}

/// Everything the text sink needs to know about row layout.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub scale: SizeScale,
    /// Row template with `%c`/`%d`/`%w`/`%e`/`%r` counter escapes; the
    /// default row is the cached size alone.
    pub format: Option<String>,
    pub show_time: bool,
    /// strftime-style template for the time column.
    pub time_format: String,
    pub nul_terminated: bool,
    pub use_color: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            scale: SizeScale::Blocks(1024),
            format: None,
            show_time: false,
            time_format: "%Y-%m-%d %H:%M".to_string(),
            nul_terminated: false,
            use_color: true,
        }
    }
}

/// Receives one call per reported entry, in traversal order, then at most
/// one grand total, then `finish`.
pub trait ReportSink {
    fn entry(&mut self, record: &CacheStats, path: &Path) -> io::Result<()>;
    fn total(&mut self, record: &CacheStats) -> io::Result<()>;
    fn finish(&mut self) -> io::Result<()>;
}

/// Check a strftime template before it reaches the row writer; chrono
/// reports bad specifiers only at render time.
pub fn valid_time_format(format: &str) -> bool {
    StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}

/// Scale `bytes` for display. A saturated counter reads `Infinity`.
pub fn format_size(bytes: u64, scale: SizeScale) -> String {
    if bytes == u64::MAX {
        return "Infinity".to_string();
    }
    match scale {
        SizeScale::Blocks(block) => bytes.div_ceil(block.max(1)).to_string(),
        SizeScale::Human { si } => autoscale(bytes, si),
    }
}

fn autoscale(bytes: u64, si: bool) -> String {
    const SUFFIXES: [&str; 6] = ["K", "M", "G", "T", "P", "E"];
    let base: u64 = if si { 1000 } else { 1024 };

    if bytes < base {
        return bytes.to_string();
    }

    let mut unit = base;
    let mut idx = 0;
    while idx + 1 < SUFFIXES.len() && bytes >= unit.saturating_mul(base) {
        unit = unit.saturating_mul(base);
        idx += 1;
    }

    let suffix = if si && idx == 0 { "k" } else { SUFFIXES[idx] };
    let scaled = bytes as f64 / unit as f64;
    if scaled < 10.0 {
        // Round up at one-decimal precision, the way size listings do.
        let ceiled = (scaled * 10.0).ceil() / 10.0;
        if ceiled >= 10.0 {
            format!("{ceiled:.0}{suffix}")
        } else {
            format!("{ceiled:.1}{suffix}")
        }
    } else {
        format!("{:.0}{suffix}", scaled.ceil())
    }
}

/// Streaming text sink; rows go out as soon as they are produced.
pub struct TextReport<W> {
    config: ReportConfig,
    out: W,
}

impl TextReport<StandardStream> {
    pub fn stdout(config: ReportConfig) -> Self {
        let choice = if config.use_color {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self {
            config,
            out: StandardStream::stdout(choice),
        }
    }
}

impl<W: WriteColor> TextReport<W> {
    pub fn new(config: ReportConfig, out: W) -> Self {
        Self { config, out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_row(&mut self, record: &CacheStats, label: &str, is_total: bool) -> io::Result<()> {
        let sizes = self.render_counters(record);

        let mut spec = ColorSpec::new();
        if is_total {
            spec.set_bold(true);
        } else {
            spec.set_fg(Some(Color::Cyan));
        }
        self.out.set_color(&spec)?;
        write!(self.out, "{sizes}")?;
        self.out.reset()?;

        if self.config.show_time {
            write!(self.out, "\t{}", self.render_time(record))?;
        }
        write!(self.out, "\t{label}")?;
        if self.config.nul_terminated {
            self.out.write_all(&[0])?;
        } else {
            writeln!(self.out)?;
        }
        self.out.flush()
    }

    fn render_counters(&self, record: &CacheStats) -> String {
        let scale = self.config.scale;
        let Some(format) = &self.config.format else {
            return format_size(record.cached, scale);
        };

        let mut out = String::new();
        let mut chars = format.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                // A trailing '%' prints itself.
                None => out.push('%'),
                Some('%') => out.push('%'),
                Some('c') => out.push_str(&format_size(record.cached, scale)),
                Some('d') => out.push_str(&format_size(record.dirty, scale)),
                Some('w') => out.push_str(&format_size(record.writeback, scale)),
                Some('e') => out.push_str(&format_size(record.evicted, scale)),
                Some('r') => out.push_str(&format_size(record.recently_evicted, scale)),
                Some(_) => out.push('?'),
            }
        }
        out
    }

    fn render_time(&self, record: &CacheStats) -> String {
        match record.newest {
            Some(when) => when
                .with_timezone(&Local)
                .format(&self.config.time_format)
                .to_string(),
            None => "-".to_string(),
        }
    }
}

impl<W: WriteColor> ReportSink for TextReport<W> {
    fn entry(&mut self, record: &CacheStats, path: &Path) -> io::Result<()> {
        let label = path.display().to_string();
        self.write_row(record, &label, false)
    }

    fn total(&mut self, record: &CacheStats) -> io::Result<()> {
        self.write_row(record, "total", true)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[derive(Debug, Serialize)]
struct JsonRow {
    path: PathBuf,
    #[serde(flatten)]
    stats: CacheStats,
}

#[derive(Debug, Serialize)]
struct JsonDocument<'a> {
    entries: &'a [JsonRow],
    #[serde(skip_serializing_if = "Option::is_none")]
    total: &'a Option<CacheStats>,
}

/// Buffering JSON sink; the document is written on `finish`.
pub struct JsonReport<W> {
    out: W,
    rows: Vec<JsonRow>,
    total: Option<CacheStats>,
}

impl JsonReport<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonReport<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            rows: Vec::new(),
            total: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for JsonReport<W> {
    fn entry(&mut self, record: &CacheStats, path: &Path) -> io::Result<()> {
        self.rows.push(JsonRow {
            path: path.to_path_buf(),
            stats: record.clone(),
        });
        Ok(())
    }

    fn total(&mut self, record: &CacheStats) -> io::Result<()> {
        self.total = Some(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        let document = JsonDocument {
            entries: &self.rows,
            total: &self.total,
        };
        serde_json::to_writer_pretty(&mut self.out, &document)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        writeln!(self.out)?;
        self.out.flush()
    }
}
