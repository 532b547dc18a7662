#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
#![allow(clippy::implicit_return)]
#![allow(clippy::exit)]
#![allow(clippy::question_mark_used)]
#![allow(clippy::min_ident_chars)]

use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueHint, value_parser};
use clap_complete::aot::{Shell, generate};
use dirshim::{
    Config, DirError, DirHandle, Kernel, Mode, Wanted, canonicalize, make, make_recursive, remove,
    remove_last_component,
};
use std::ffi::{OsStr, OsString};
use std::io::{Write as _, stdout};
use std::os::unix::ffi::OsStrExt as _;

#[cfg(all(
    any(target_os = "linux", target_os = "android"),
    feature = "mimalloc",
    not(feature = "no-mimalloc")
))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(version = env!("CARGO_PKG_VERSION"), about = env!("CARGO_PKG_DESCRIPTION"))]
///generate our arguments and parse them.
struct Args {
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help = "Log more to stderr, repeat for more (starts from $DIRSHIM_LOG, default warn)"
    )]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a directory through the getdents buffer
    Ls {
        #[arg(value_name = "PATH", value_hint = ValueHint::DirPath, default_value = ".")]
        path: OsString,
        #[arg(short = 'a', long = "all", help = "Include . and ..")]
        all: bool,
        #[arg(
            short = 'l',
            long = "long",
            help = "Show type, links, permissions, size and modification time; '?' marks an entry stat could not fully resolve"
        )]
        long: bool,
        #[arg(
            short = 'f',
            long = "fields",
            value_parser = Wanted::parse_list,
            conflicts_with = "long",
            help = "Comma separated metadata to resolve, e.g. size,mtime,prot or norm (implies a long listing)"
        )]
        fields: Option<Wanted>,
    },
    /// Create directories
    Mkdir {
        #[arg(value_name = "PATH", value_hint = ValueHint::DirPath, required = true)]
        paths: Vec<OsString>,
        #[arg(short = 'p', long = "parents", help = "Create missing parents, existing directories are fine")]
        parents: bool,
        #[arg(
            short = 'm',
            long = "mode",
            value_parser = Mode::parse_octal,
            help = "Octal permission bits (default 777, umask applies)"
        )]
        mode: Option<Mode>,
    },
    /// Remove empty directories
    Rmdir {
        #[arg(value_name = "PATH", value_hint = ValueHint::DirPath, required = true)]
        paths: Vec<OsString>,
    },
    /// Print a path with its trailing separators removed
    Canon {
        #[arg(value_name = "PATH")]
        path: OsString,
    },
    /// Print a path with its last component removed
    Parent {
        #[arg(value_name = "PATH")]
        path: OsString,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_name = "SHELL", action = ArgAction::Set, value_parser = value_parser!(Shell))]
        shell: Shell,
    },
}

/// Writes log records to stderr, one line each
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(config: &Config) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(config.log_level);
    }
}

fn report(path: &OsStr, e: DirError) {
    eprintln!("dirshim: {}: {e} ({})", path.to_string_lossy(), e.status());
}

fn list(path: &OsStr, config: &Config) -> Result<(), DirError> {
    let mut dir = DirHandle::open(&Kernel, path)?;
    let mut out = stdout().lock();
    for lookup in dir.entries(config.wanted) {
        let lookup = lookup?;
        let complete = lookup.is_complete();
        let info = lookup.into_info();
        let name = info.name().unwrap_or_default();
        if config.hides(name.as_bytes()) {
            continue;
        }
        let written = if config.wanted == Wanted::NAME {
            writeln!(out, "{}", name.to_string_lossy())
        } else {
            let kind = info.file_type().map_or('?', |t| t.as_char());
            let mode = info.mode().map_or_else(|| "????".into(), |m| format!("{m:04o}"));
            let nlink = info.nlink().map_or_else(|| "?".into(), |n| n.to_string());
            let size = info.size().map_or_else(|| "?".into(), |s| s.to_string());
            let mtime = info
                .modified()
                .map_or_else(|| "?".into(), |t| t.format("%Y-%m-%d %H:%M").to_string());
            writeln!(
                out,
                "{kind} {mode} {nlink:>3} {size:>10} {mtime:>16} {}{}",
                name.to_string_lossy(),
                if complete { "" } else { " ?" }
            )
        };
        // a closed stdout (e.g. `| head`) ends the listing quietly
        if written.is_err() {
            break;
        }
    }
    dir.close()
}

fn print_path(bytes: &[u8]) {
    let mut out = stdout().lock();
    let _ = out.write_all(bytes);
    let _ = out.write_all(b"\n");
}

fn main() {
    let args = Args::parse();
    let (config, bad_level) = match Config::from_env() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    let config = config.with_verbosity(args.verbose);
    init_logging(&config);
    if let Some(e) = bad_level {
        log::warn!("{e}, using {}", config.log_level);
    }

    let mut failed = false;
    match args.command {
        Command::Ls { path, all, long, fields } => {
            let mut config = config.with_dots(all).with_long_listing(long);
            if let Some(fields) = fields {
                config.wanted = fields | Wanted::NAME;
            }
            if let Err(e) = list(&path, &config) {
                report(&path, e);
                failed = true;
            }
        }
        Command::Mkdir { paths, parents, mode } => {
            let config = match mode {
                Some(mode) => config.with_mode(mode),
                None => config,
            };
            for path in &paths {
                let result = if parents {
                    make_recursive(&Kernel, path, config.mode)
                } else {
                    make(&Kernel, path, config.mode)
                };
                if let Err(e) = result {
                    report(path, e);
                    failed = true;
                }
            }
        }
        Command::Rmdir { paths } => {
            for path in &paths {
                if let Err(e) = remove(&Kernel, path) {
                    report(path, e);
                    failed = true;
                }
            }
        }
        Command::Canon { path } => print_path(&canonicalize(path.as_bytes())),
        Command::Parent { path } => print_path(&remove_last_component(path.as_bytes())),
        Command::Completions { shell } => {
            let mut cmd = Args::command();
            let name = cmd.get_name().to_owned();
            generate(shell, &mut cmd, name, &mut stdout());
        }
    }

    if failed {
        std::process::exit(1);
    }
}
