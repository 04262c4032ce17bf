use std::fmt;
use std::io::Write;
use std::sync::{OnceLock, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::utils::hash::{self, StringHash};

// ----------------------------------------------
// Level
// ----------------------------------------------

#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    Silent,
    Verbose,
    Info,
    Warn,
    Error,
}

impl Level {
    #[inline]
    pub fn is_enabled(self) -> bool {
        self != Self::Silent && (self as u32) >= MIN_LEVEL.load(Ordering::Relaxed)
    }

    fn label(self) -> &'static str {
        match self {
            Self::Silent  => "",
            Self::Verbose => "VERB",
            Self::Info    => "INFO",
            Self::Warn    => "WARN",
            Self::Error   => "ERROR",
        }
    }

    fn ansi_color(self) -> &'static str {
        match self {
            Self::Silent  => "",
            Self::Verbose => "\x1b[90m",
            Self::Info    => "\x1b[32m",
            Self::Warn    => "\x1b[33m",
            Self::Error   => "\x1b[31m",
        }
    }
}

// ----------------------------------------------
// Channel
// ----------------------------------------------

// Subsystem tag attached to a message: "view", "tiles", "viewport", ...
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Channel {
    pub name: &'static str,
    pub hash: StringHash,
}

impl Channel {
    #[inline]
    pub const fn new(name: &'static str) -> Self {
        Self { name, hash: hash::fnv1a_from_str(name) }
    }

    #[inline]
    pub fn is_muted(&self) -> bool {
        MUTED_CHANNELS.read().is_ok_and(|muted| muted.contains(&self.hash))
    }
}

#[macro_export]
macro_rules! channel {
    ($name:literal) => { $crate::log::Channel::new($name) };
}

// Silences one channel regardless of level. Muting the "viewport" channel
// keeps per-frame verbose output out of the way while debugging input.
pub fn mute_channel(name: &str) {
    let hash = hash::fnv1a_from_str(name);
    if let Ok(mut muted) = MUTED_CHANNELS.write() {
        if !muted.contains(&hash) {
            muted.push(hash);
        }
    }
}

pub fn unmute_channel(name: &str) {
    let hash = hash::fnv1a_from_str(name);
    if let Ok(mut muted) = MUTED_CHANNELS.write() {
        muted.retain(|muted_hash| *muted_hash != hash);
    }
}

// ----------------------------------------------
// Listener
// ----------------------------------------------

pub struct Record {
    pub level: Level,
    pub channel: Option<Channel>,
    pub location: Location,
    pub message: String,
}

static LISTENER: OnceLock<Box<dyn Fn(Record) + Send + Sync>> = OnceLock::new();

// Forwards every printed message to `listener_fn` (e.g. an in-game console).
// Returns false if a listener was already installed.
pub fn set_listener<F>(listener_fn: F) -> bool
    where F: Fn(Record) + Send + Sync + 'static
{
    LISTENER.set(Box::new(listener_fn)).is_ok()
}

// ----------------------------------------------
// Global settings
// ----------------------------------------------

static MIN_LEVEL: AtomicU32 = AtomicU32::new(Level::Verbose as u32);
static SHOW_LOCATION: AtomicBool = AtomicBool::new(false);
static USE_COLORS: AtomicBool = AtomicBool::new(true);
static MUTED_CHANNELS: RwLock<SmallVec<[StringHash; 4]>> = RwLock::new(SmallVec::new_const());

pub fn set_level(level: Level) {
    MIN_LEVEL.store(level as u32, Ordering::Relaxed);
}

pub fn show_source_location(show: bool) {
    SHOW_LOCATION.store(show, Ordering::Relaxed);
}

pub fn use_colors(enable: bool) {
    USE_COLORS.store(enable, Ordering::Relaxed);
}

// ----------------------------------------------
// Output
// ----------------------------------------------

#[derive(Copy, Clone, Debug)]
pub struct Location {
    pub file: &'static str,
    pub line: u32,
    pub module: &'static str,
}

struct Prefix<'a> {
    level: Level,
    channel: Option<&'a Channel>,
    location: Option<&'a Location>,
    colored: bool,
}

impl fmt::Display for Prefix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.colored {
            write!(f, "{}", self.level.ansi_color())?;
        }
        write!(f, "[{}]", self.level.label())?;
        if let Some(channel) = self.channel {
            write!(f, "[{}]", channel.name)?;
        }
        if self.colored {
            write!(f, "\x1b[0m")?;
        }
        if let Some(location) = self.location {
            write!(f, " {}:{} ({})", location.file, location.line, location.module)?;
        }
        Ok(())
    }
}

pub fn print_internal(level: Level, channel: Option<Channel>, location: &Location, args: fmt::Arguments) {
    if !level.is_enabled() || channel.is_some_and(|channel| channel.is_muted()) {
        return;
    }

    let prefix = Prefix {
        level,
        channel: channel.as_ref(),
        location: SHOW_LOCATION.load(Ordering::Relaxed).then_some(location),
        colored: USE_COLORS.load(Ordering::Relaxed),
    };

    // A failed write to stdout has nowhere else to go.
    let _ = writeln!(std::io::stdout().lock(), "{prefix} {args}");

    if let Some(listener) = LISTENER.get() {
        listener(Record { level, channel, location: *location, message: args.to_string() });
    }
}

#[macro_export]
macro_rules! log_message {
    ($level:expr, $chan:expr, $fmt:literal $(, $($arg:tt)+)?) => {
        if $level.is_enabled() {
            $crate::log::print_internal(
                $level,
                $chan,
                &$crate::log::Location { file: file!(), line: line!(), module: module_path!() },
                format_args!($fmt $(, $($arg)+)?)
            );
        }
    };
}

// ----------------------------------------------
// Macros
// ----------------------------------------------

#[macro_export]
macro_rules! verbose {
    ($fmt:literal $(, $($arg:tt)+)?) => {
        $crate::log_message!($crate::log::Level::Verbose, None, $fmt $(, $($arg)+)?)
    };
    ($chan:expr, $fmt:literal $(, $($arg:tt)+)?) => {
        $crate::log_message!($crate::log::Level::Verbose, Some($chan), $fmt $(, $($arg)+)?)
    };
}

#[macro_export]
macro_rules! info {
    ($fmt:literal $(, $($arg:tt)+)?) => {
        $crate::log_message!($crate::log::Level::Info, None, $fmt $(, $($arg)+)?)
    };
    ($chan:expr, $fmt:literal $(, $($arg:tt)+)?) => {
        $crate::log_message!($crate::log::Level::Info, Some($chan), $fmt $(, $($arg)+)?)
    };
}

#[macro_export]
macro_rules! warn {
    ($fmt:literal $(, $($arg:tt)+)?) => {
        $crate::log_message!($crate::log::Level::Warn, None, $fmt $(, $($arg)+)?)
    };
    ($chan:expr, $fmt:literal $(, $($arg:tt)+)?) => {
        $crate::log_message!($crate::log::Level::Warn, Some($chan), $fmt $(, $($arg)+)?)
    };
}

#[macro_export]
macro_rules! error {
    ($fmt:literal $(, $($arg:tt)+)?) => {
        $crate::log_message!($crate::log::Level::Error, None, $fmt $(, $($arg)+)?)
    };
    ($chan:expr, $fmt:literal $(, $($arg:tt)+)?) => {
        $crate::log_message!($crate::log::Level::Error, Some($chan), $fmt $(, $($arg)+)?)
    };
}

// Scoped usage: log::info!(), log::warn!(), etc.
#[allow(unused_imports)]
pub use crate::{channel, verbose, info, warn, error};
