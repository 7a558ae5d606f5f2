//! Log setup: env filter plus secret redaction on every formatted event.

use regex::Regex;
use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::{prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "home_guard_bot=info,teloxide=warn,hyper=warn,reqwest=warn";
const DEBUG_FILTER: &str = "home_guard_bot=debug,teloxide=info,hyper=warn,reqwest=warn";

/// Rewrite rules applied in order; later rules see earlier output.
const RULES: &[(&str, &str)] = &[
    // Bot API URLs carry the token as a path segment
    (r"(https?://[^/\s]+/bot)[0-9]+:[A-Za-z0-9_-]+", "${1}[TELEGRAM_TOKEN]"),
    (r"\bbot([0-9]{8,10}):[A-Za-z0-9_-]+", "bot${1}:[TELEGRAM_TOKEN]"),
    (r"\b[0-9]{8,10}:[A-Za-z0-9_-]{35}\b", "[TELEGRAM_TOKEN]"),
    // user:password@ in proxy URLs
    (r"([a-z][a-z0-9+.-]*://)[^/\s:@]+:[^/\s@]+@", "${1}[MASKED]@"),
];

/// Masks bot tokens and proxy credentials in log text
#[derive(Clone)]
pub struct Redactor {
    rules: Arc<[(Regex, &'static str)]>,
}

impl Redactor {
    /// Compile the rewrite rules.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        let rules = RULES
            .iter()
            .map(|&(pattern, replacement)| Regex::new(pattern).map(|re| (re, replacement)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rules: rules.into(),
        })
    }

    /// Apply every rule; borrows the input when nothing matched.
    #[must_use]
    pub fn redact<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.rules
            .iter()
            .fold(Cow::Borrowed(text), |text, (re, replacement)| {
                let changed = match re.replace_all(&text, *replacement) {
                    Cow::Borrowed(_) => None,
                    Cow::Owned(changed) => Some(changed),
                };
                changed.map_or(text, Cow::Owned)
            })
    }
}

/// Writer for a single log event.
///
/// The formatter may hand over an event in several writes; they are
/// collected and redacted as one line on flush or drop, so a secret split
/// across writes is still masked.
pub struct RedactedEvent<W: Write> {
    out: W,
    redactor: Redactor,
    pending: Vec<u8>,
}

impl<W: Write> RedactedEvent<W> {
    /// Buffer an event bound for `out`
    pub const fn new(out: W, redactor: Redactor) -> Self {
        Self {
            out,
            redactor,
            pending: Vec::new(),
        }
    }

    fn emit(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.pending);
        let text = String::from_utf8_lossy(&pending);
        self.out.write_all(self.redactor.redact(&text).as_bytes())?;
        self.out.flush()
    }
}

impl<W: Write> Write for RedactedEvent<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit()
    }
}

impl<W: Write> Drop for RedactedEvent<W> {
    fn drop(&mut self) {
        // Nowhere left to report a failed log write
        let _ = self.emit();
    }
}

/// Install the global subscriber writing redacted events to stderr.
///
/// `RUST_LOG` wins; otherwise `debug_mode` picks the verbose filter.
pub fn init(redactor: Redactor, debug_mode: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug_mode {
            DEBUG_FILTER
        } else {
            DEFAULT_FILTER
        })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(move || RedactedEvent::new(io::stderr(), redactor.clone())),
        )
        .init();
}
