use crate::fs::{Wanted, is_dot_or_dot_dot};
use crate::mkdir::Mode;
use log::LevelFilter;

/// Name of the environment variable holding the default log level
pub const LOG_ENV: &str = "DIRSHIM_LOG";

/// Log level used when `DIRSHIM_LOG` is unset or unreadable
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Warn;

#[derive(Clone, Debug, PartialEq, Eq)]
/**
 Runtime settings for the `dirshim` binary.

 Build-time knobs (the getdents buffer size and the child path limit) are constants in
 [`crate::fs`]; everything here is decided per invocation from flags and the environment.
*/
pub struct Config {
    /**
    Log level for the stderr logger

    Taken from `DIRSHIM_LOG` when set and valid, `warn` otherwise, and raised once per `-v`.
    */
    pub log_level: LevelFilter,

    /**
    Permission bits requested for new directories

    Passed through to the raw mkdir untouched, so the process umask still applies.
    */
    pub mode: Mode,

    /**
    Metadata requested for each listed entry

    `NAME` alone never touches stat; anything more costs one stat per entry.
    */
    pub wanted: Wanted,

    /// Whether listings include `.` and `..`
    pub show_dots: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL,
            mode: Mode::DIR_DEFAULT,
            wanted: Wanted::NAME,
            show_dots: false,
        }
    }
}

impl Config {
    /// Fields a long listing shows
    pub const LONG_LISTING: Wanted = Wanted::NAME
        .union(Wanted::TYPE)
        .union(Wanted::SIZE)
        .union(Wanted::MTIME)
        .union(Wanted::PROT)
        .union(Wanted::NLINK);

    /**
     Defaults, with the log level read from `DIRSHIM_LOG`.

     # Errors
     A message naming the variable when it is set to something that is not a level.
     The caller decides whether to carry on with [`Config::default`].
    */
    pub fn from_env() -> Result<Self, String> {
        let log_level = Self::level_from(std::env::var(LOG_ENV).ok().as_deref())?;
        Ok(Self {
            log_level,
            ..Self::default()
        })
    }

    /**
     Parses a log level setting; a missing value is the default level.

     # Errors
     A message naming the variable and the rejected value.
    */
    pub fn level_from(value: Option<&str>) -> Result<LevelFilter, String> {
        value.map_or(Ok(DEFAULT_LOG_LEVEL), |v| {
            v.trim().parse::<LevelFilter>().map_err(|e| {
                format!("{LOG_ENV}={v}: {e}, expected one of off, error, warn, info, debug, trace")
            })
        })
    }

    /// Raises the log level once per `-v`, stopping at `trace`
    #[must_use]
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        for _ in 0..verbose {
            self.log_level = self.log_level.increment_severity();
        }
        self
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub const fn with_long_listing(mut self, long: bool) -> Self {
        self.wanted = if long { Self::LONG_LISTING } else { Wanted::NAME };
        self
    }

    #[must_use]
    pub const fn with_dots(mut self, show_dots: bool) -> Self {
        self.show_dots = show_dots;
        self
    }

    /// Whether an entry called `name` is left out of listings
    #[must_use]
    pub fn hides(&self, name: &[u8]) -> bool {
        !self.show_dots && is_dot_or_dot_dot(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsing() {
        assert_eq!(Config::level_from(None), Ok(LevelFilter::Warn));
        assert_eq!(Config::level_from(Some("DEBUG")), Ok(LevelFilter::Debug));
        assert_eq!(Config::level_from(Some(" trace ")), Ok(LevelFilter::Trace));
        assert_eq!(Config::level_from(Some("off")), Ok(LevelFilter::Off));
    }

    #[test]
    fn bad_level_is_reported_not_swallowed() {
        let err = Config::level_from(Some("chatty")).unwrap_err();
        assert!(err.starts_with("DIRSHIM_LOG=chatty"), "{err}");
    }

    #[test]
    fn verbosity_saturates() {
        let base = Config::default();
        assert_eq!(base.clone().with_verbosity(0).log_level, LevelFilter::Warn);
        assert_eq!(base.clone().with_verbosity(1).log_level, LevelFilter::Info);
        assert_eq!(base.with_verbosity(9).log_level, LevelFilter::Trace);
        let quiet = Config {
            log_level: LevelFilter::Off,
            ..Config::default()
        };
        assert_eq!(quiet.with_verbosity(1).log_level, LevelFilter::Error);
    }

    #[test]
    fn builder_flags() {
        let config = Config::default()
            .with_long_listing(true)
            .with_mode(Mode::new(0o700))
            .with_verbosity(2);
        assert!(config.wanted.contains(Wanted::SIZE | Wanted::PROT));
        assert_eq!(config.mode.bits(), 0o700);
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert!(config.hides(b".."));
        assert!(!config.hides(b"..."));
        assert!(!config.with_dots(true).hides(b".."));
    }
}
