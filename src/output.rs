//! Output stream cache: at most one open writer per logical name per run.
//!
//! Output names can be computed per iteration, and the same computed name
//! must accumulate writes into one stream rather than truncate and reopen.
//! This cache decouples "what stream does this name mean" from "how was the
//! name computed" and owns the lifecycle of every stream it opens.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::File;
use std::io::{self, Write};

use tracing::{debug, warn};

use crate::error::{Error, Result};

enum Target {
    File(File),
    Stdout(io::Stdout),
    /// Seeded by the caller; flushed but never owned-closed by the cache
    Seeded(Box<dyn Write>),
}

impl Write for Target {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Target::File(file) => file.write(buf),
            Target::Stdout(stdout) => stdout.write(buf),
            Target::Seeded(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Target::File(file) => file.flush(),
            Target::Stdout(stdout) => stdout.flush(),
            Target::Seeded(writer) => writer.flush(),
        }
    }
}

/// Cache guaranteeing one open writer per logical output name per run
#[derive(Default)]
pub struct OutputCache {
    outputs: HashMap<String, Target>,
}

impl OutputCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an already-open writer under a known name, bypassing file
    /// creation. Seeded writers are flushed at the end of the run but the
    /// cache never takes over closing the underlying stream.
    pub fn pre_open<S: Into<String>>(&mut self, name: S, writer: Box<dyn Write>) {
        self.outputs.insert(name.into(), Target::Seeded(writer));
    }

    /// Resolves a logical name to its writer, opening it on first use.
    ///
    /// The name `-` binds to the process's standard output. Any other name
    /// creates (truncating) a file on first resolution; every later
    /// resolution of the same name within the run returns the same writer.
    pub fn resolve(&mut self, name: &str) -> Result<&mut dyn Write> {
        if name.is_empty() {
            return Err(Error::EmptyOutputName);
        }
        let target = match self.outputs.entry(name.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!(output = %name, "opening output");
                let target = if name == "-" {
                    Target::Stdout(io::stdout())
                } else {
                    Target::File(File::create(name).map_err(|source| Error::CreateOutput {
                        name: name.to_string(),
                        source,
                    })?)
                };
                entry.insert(target)
            }
        };
        Ok(target)
    }

    /// Flushes and releases every cached stream, best-effort.
    ///
    /// Consuming `self` guarantees this runs at most once; flush failures
    /// are logged rather than propagated since this is terminal cleanup.
    pub fn close_all(mut self) {
        for (name, target) in self.outputs.iter_mut() {
            if let Err(err) = target.flush() {
                warn!(output = %name, error = %err, "failed to flush output");
            }
        }
    }
}
