//! CLI entry point for mu

use std::env;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::os::unix::ffi::OsStringExt;
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, ValueEnum};
use mu::{
    CachestatProbe, ExclusionFilter, FollowLinks, JsonReport, ReportConfig, ReportSink, SizeScale,
    TextReport, TimeKind, Walker, WalkerConfig, output,
};

/// Color output mode
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal and environment
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Determine whether to use color output based on mode and environment.
fn should_use_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            // Respect NO_COLOR environment variable (https://no-color.org/)
            if env::var_os("NO_COLOR").is_some() {
                return false;
            }
            if env::var_os("FORCE_COLOR").is_some() {
                return true;
            }
            if env::var("TERM").map(|t| t == "dumb").unwrap_or(false) {
                return false;
            }
            io::stdout().is_terminal()
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "mu")]
#[command(about = "Summarize page cache usage of the set of FILEs, recursively for directories")]
#[command(version)]
#[command(disable_help_flag = true)]
struct Args {
    /// Files or directories to summarize (default: current directory)
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Print help
    #[arg(long, action = ArgAction::HelpLong)]
    help: Option<bool>,

    /// End each output line with NUL, not newline
    #[arg(short = '0', long = "null")]
    null: bool,

    /// Write counts for all files, not just directories
    #[arg(short = 'a', long = "all")]
    all: bool,

    /// Scale sizes by SIZE before printing them; e.g. '-BM' prints sizes
    /// in units of 1,048,576 bytes
    #[arg(short = 'B', long = "block-size", value_name = "SIZE")]
    block_size: Option<String>,

    /// Equivalent to '--block-size=1'
    #[arg(short = 'b', long = "bytes")]
    bytes: bool,

    /// Produce a grand total
    #[arg(short = 'c', long = "total")]
    total: bool,

    /// Dereference only symlinks that are listed on the command line
    #[arg(
        short = 'D',
        long = "dereference-args",
        short_alias = 'H',
        overrides_with_all = ["dereference", "dereference_args", "no_dereference"]
    )]
    dereference_args: bool,

    /// Print the total for a directory (or file, with --all) only if it is
    /// N or fewer levels below the command line argument
    #[arg(short = 'd', long = "max-depth", value_name = "N")]
    max_depth: Option<usize>,

    /// Summarize cache usage of the NUL-terminated file names in file F;
    /// if F is -, read names from standard input
    #[arg(long = "files0-from", value_name = "F")]
    files0_from: Option<String>,

    /// Use FORMAT for each row instead of the cached size alone
    /// (%c cached, %d dirty, %w writeback, %e evicted, %r recently evicted)
    #[arg(short = 'f', long = "format", value_name = "FORMAT")]
    format: Option<String>,

    /// Print sizes in human readable format (e.g. 1K 234M 2G)
    #[arg(short = 'h', long = "human-readable")]
    human_readable: bool,

    /// Like -h, but use powers of 1000 not 1024
    #[arg(long = "si")]
    si: bool,

    /// Like --block-size=1K
    #[arg(short = 'k')]
    kibibytes: bool,

    /// Like --block-size=1M
    #[arg(short = 'm')]
    mebibytes: bool,

    /// Dereference all symbolic links
    #[arg(
        short = 'L',
        long = "dereference",
        overrides_with_all = ["dereference", "dereference_args", "no_dereference"]
    )]
    dereference: bool,

    /// Count sizes many times if hard linked
    #[arg(short = 'l', long = "count-links")]
    count_links: bool,

    /// Don't follow any symbolic links (this is the default)
    #[arg(
        short = 'P',
        long = "no-dereference",
        overrides_with_all = ["dereference", "dereference_args", "no_dereference"]
    )]
    no_dereference: bool,

    /// For directories do not include size of subdirectories
    #[arg(short = 'S', long = "separate-dirs")]
    separate_dirs: bool,

    /// Display only a total for each argument
    #[arg(short = 's', long = "summarize")]
    summarize: bool,

    /// Exclude entries smaller than SIZE if positive, or entries greater
    /// than SIZE if negative
    #[arg(
        short = 't',
        long = "threshold",
        value_name = "SIZE",
        allow_hyphen_values = true
    )]
    threshold: Option<String>,

    /// Show time of the last modification of any file in the directory or
    /// its subdirectories, or as WORD: atime, access, use, ctime, status
    #[arg(
        long = "time",
        value_name = "WORD",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "mtime"
    )]
    time: Option<String>,

    /// Show times using STYLE: full-iso, long-iso, iso, or +FORMAT
    #[arg(long = "time-style", value_name = "STYLE")]
    time_style: Option<String>,

    /// Exclude files that match any pattern in FILE
    #[arg(short = 'X', long = "exclude-from", value_name = "FILE")]
    exclude_from: Vec<PathBuf>,

    /// Exclude files that match PATTERN
    #[arg(long = "exclude", value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Skip directories on different file systems
    #[arg(short = 'x', long = "one-file-system")]
    one_file_system: bool,

    /// Output one JSON document instead of text rows
    #[arg(long = "json", conflicts_with_all = ["format", "null", "time"])]
    json: bool,

    /// Control color output: auto, always, never
    #[arg(long = "color", value_name = "WHEN", default_value = "auto")]
    color: ColorMode,
}

/// Parse a size with optional binary suffix: "5M", "100K", "1G", "M".
/// A bare suffix means one unit of it, matching `-BM` style usage.
fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim().to_uppercase();
    let (num_str, multiplier): (&str, u64) = if let Some(n) = s.strip_suffix("EB") {
        (n, 1 << 60)
    } else if let Some(n) = s.strip_suffix('E') {
        (n, 1 << 60)
    } else if let Some(n) = s.strip_suffix("PB") {
        (n, 1 << 50)
    } else if let Some(n) = s.strip_suffix('P') {
        (n, 1 << 50)
    } else if let Some(n) = s.strip_suffix("TB") {
        (n, 1 << 40)
    } else if let Some(n) = s.strip_suffix('T') {
        (n, 1 << 40)
    } else if let Some(n) = s.strip_suffix("GB") {
        (n, 1 << 30)
    } else if let Some(n) = s.strip_suffix('G') {
        (n, 1 << 30)
    } else if let Some(n) = s.strip_suffix("MB") {
        (n, 1 << 20)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1 << 20)
    } else if let Some(n) = s.strip_suffix("KB") {
        (n, 1 << 10)
    } else if let Some(n) = s.strip_suffix('K') {
        (n, 1 << 10)
    } else {
        (s.as_str(), 1)
    };

    let num_str = num_str.trim();
    if num_str.is_empty() {
        return Ok(multiplier);
    }
    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid number: {}", num_str))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| "value out of range".to_string())
}

/// Parse a threshold: a size with an optional leading '-'.
fn parse_threshold(s: &str) -> Result<i64, String> {
    let (negative, magnitude) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let value = parse_size(magnitude)?;
    if negative && value == 0 {
        // -0 would exclude everything and mean nothing.
        return Err("invalid --threshold argument '-0'".to_string());
    }
    let value = i64::try_from(value).map_err(|_| "value out of range".to_string())?;
    Ok(if negative { -value } else { value })
}

fn parse_time_kind(word: &str) -> Option<TimeKind> {
    match word {
        "mtime" => Some(TimeKind::Modified),
        "atime" | "access" | "use" => Some(TimeKind::Accessed),
        "ctime" | "status" => Some(TimeKind::Changed),
        _ => None,
    }
}

/// Resolve `--time-style`, falling back to the TIME_STYLE environment
/// variable with its ls-compatibility quirks, into a strftime template.
fn resolve_time_format(style_arg: Option<&str>) -> Result<String, String> {
    let mut style = match style_arg {
        Some(s) => s.to_string(),
        None => {
            match env::var("TIME_STYLE") {
                // "locale" is accepted for ls compatibility and means the
                // default here.
                Err(_) => "long-iso".to_string(),
                Ok(s) if s == "locale" => "long-iso".to_string(),
                Ok(s) => s,
            }
        }
    };

    if let Some(custom) = style.strip_prefix('+') {
        // Anything past a newline is dropped, for ls compatibility.
        let format = custom.lines().next().unwrap_or("").to_string();
        if !output::valid_time_format(&format) {
            return Err(format!("invalid time style format '+{}'", format));
        }
        return Ok(format);
    }

    // Ignore any number of "posix-" prefixes, for ls compatibility.
    while let Some(rest) = style.strip_prefix("posix-") {
        style = rest.to_string();
    }

    match style.as_str() {
        "full-iso" => Ok("%Y-%m-%d %H:%M:%S%.9f %z".to_string()),
        "long-iso" => Ok("%Y-%m-%d %H:%M".to_string()),
        "iso" => Ok("%Y-%m-%d".to_string()),
        other => Err(format!("invalid argument '{}' for 'time style'", other)),
    }
}

/// Read NUL-separated root names from `source` ("-" means stdin).
/// Bad names are diagnosed and dropped; the boolean reports whether all
/// names were usable.
fn read_files0(source: &str) -> io::Result<(Vec<PathBuf>, bool)> {
    let data = if source == "-" {
        let mut buf = Vec::new();
        io::stdin().lock().read_to_end(&mut buf)?;
        buf
    } else {
        fs::read(source)?
    };

    let mut chunks: Vec<&[u8]> = data.split(|b| *b == 0).collect();
    if chunks.last().is_some_and(|c| c.is_empty()) {
        // Terminator after the final name, not an empty name.
        chunks.pop();
    }

    let mut roots = Vec::new();
    let mut ok = true;
    for (index, chunk) in chunks.into_iter().enumerate() {
        if chunk.is_empty() {
            eprintln!(
                "mu: {}:{}: invalid zero-length file name",
                source,
                index + 1
            );
            ok = false;
            continue;
        }
        if source == "-" && chunk == b"-" {
            eprintln!("mu: when reading file names from stdin, no file name of '-' allowed");
            ok = false;
            continue;
        }
        roots.push(PathBuf::from(std::ffi::OsString::from_vec(chunk.to_vec())));
    }
    Ok((roots, ok))
}

fn die(message: &str) -> ! {
    eprintln!("mu: {}", message);
    process::exit(1);
}

fn main() {
    let args = Args::parse();

    if args.all && args.summarize {
        die("cannot both summarize and show all entries");
    }
    if args.summarize {
        match args.max_depth {
            Some(0) => {
                eprintln!("mu: warning: summarizing is the same as using --max-depth=0");
            }
            Some(depth) => {
                die(&format!("summarizing conflicts with --max-depth={}", depth));
            }
            None => {}
        }
    }
    let max_depth = if args.summarize {
        Some(0)
    } else {
        args.max_depth
    };

    let threshold = match &args.threshold {
        None => 0,
        Some(spec) => match parse_threshold(spec) {
            Ok(value) => value,
            Err(e) if e.contains("-0") => die(&e),
            Err(_) => die(&format!("invalid --threshold argument '{}'", spec)),
        },
    };

    let scale = if let Some(spec) = &args.block_size {
        let block = parse_size(spec)
            .unwrap_or_else(|_| die(&format!("invalid --block-size argument '{}'", spec)));
        SizeScale::Blocks(block.max(1))
    } else if args.bytes {
        SizeScale::Blocks(1)
    } else if args.human_readable {
        SizeScale::Human { si: false }
    } else if args.si {
        SizeScale::Human { si: true }
    } else if args.kibibytes {
        SizeScale::Blocks(1024)
    } else if args.mebibytes {
        SizeScale::Blocks(1024 * 1024)
    } else if let Ok(spec) = env::var("MU_BLOCK_SIZE") {
        match parse_size(&spec) {
            Ok(block) => SizeScale::Blocks(block.max(1)),
            Err(_) => {
                eprintln!("mu: ignoring invalid MU_BLOCK_SIZE '{}'", spec);
                SizeScale::Blocks(1024)
            }
        }
    } else {
        SizeScale::Blocks(1024)
    };

    let show_time = args.time.is_some();
    let time_kind = match &args.time {
        None => TimeKind::Modified,
        Some(word) => parse_time_kind(word)
            .unwrap_or_else(|| die(&format!("invalid argument '{}' for '--time'", word))),
    };
    let time_format = if show_time {
        resolve_time_format(args.time_style.as_deref()).unwrap_or_else(|e| die(&e))
    } else {
        String::new()
    };

    let mut filter = ExclusionFilter::new();
    for pattern in &args.exclude {
        if let Err(e) = filter.add(pattern) {
            die(&format!("invalid --exclude pattern '{}': {}", pattern, e));
        }
    }
    for file in &args.exclude_from {
        if let Err(e) = filter.add_from_file(file) {
            die(&format!("cannot read '{}': {}", file.display(), e));
        }
    }

    let follow = if args.dereference {
        FollowLinks::Always
    } else if args.dereference_args {
        FollowLinks::CommandLine
    } else {
        FollowLinks::Never
    };

    let (roots, names_ok, from_file_list) = if let Some(source) = &args.files0_from {
        if !args.files.is_empty() {
            eprintln!("mu: extra operand '{}'", args.files[0].display());
            die("file operands cannot be combined with --files0-from");
        }
        match read_files0(source) {
            Ok((roots, ok)) => (roots, ok, true),
            Err(e) => die(&format!("cannot open '{}' for reading: {}", source, e)),
        }
    } else if args.files.is_empty() {
        (vec![PathBuf::from(".")], true, false)
    } else {
        (args.files.clone(), true, false)
    };

    // A file reachable through two roots, or through a followed symlink,
    // may have just one hard link; hash every entry in those runs.
    let hash_all = from_file_list || roots.len() > 1 || follow == FollowLinks::Always;

    let config = WalkerConfig {
        all: args.all,
        count_links: args.count_links,
        hash_all,
        separate_dirs: args.separate_dirs,
        one_file_system: args.one_file_system,
        max_depth,
        threshold,
        follow,
        time_kind,
    };
    let probe = CachestatProbe::new(time_kind);

    let result = if args.json {
        run(&config, &filter, &probe, &roots, args.total, JsonReport::stdout())
    } else {
        let report = ReportConfig {
            scale,
            format: args.format.clone(),
            show_time,
            time_format,
            nul_terminated: args.null,
            use_color: should_use_color(args.color),
        };
        run(&config, &filter, &probe, &roots, args.total, TextReport::stdout(report))
    };

    match result {
        Ok(ok) => process::exit(if ok && names_ok { 0 } else { 1 }),
        Err(e) => {
            eprintln!("mu: error writing output: {}", e);
            process::exit(1);
        }
    }
}

/// Walk every root through one shared walker so deduplication spans the
/// whole invocation, then append the grand total if requested.
fn run<S: ReportSink>(
    config: &WalkerConfig,
    filter: &ExclusionFilter,
    probe: &CachestatProbe,
    roots: &[PathBuf],
    want_total: bool,
    mut sink: S,
) -> io::Result<bool> {
    let mut walker = Walker::new(config, filter, probe);
    let mut ok = true;

    for root in roots {
        if root.as_os_str().is_empty() {
            eprintln!("mu: invalid zero-length file name");
            ok = false;
            continue;
        }
        ok &= walker.walk_root(root, &mut sink)?;
    }

    if want_total {
        sink.total(walker.grand_total())?;
    }
    sink.finish()?;
    Ok(ok)
}
