//! Per-run capture files, one per enabled level plus an ALL file

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::{Error, Result};
use crate::level::Level;
use crate::storage::capture_file_name;

struct CaptureFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CaptureFile {
    fn open(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::io(&path, e))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line)
            .and_then(|()| self.writer.flush())
            .map_err(|e| Error::io(&self.path, e))
    }
}

/// Writers for one capture run
pub struct CaptureFileSet {
    levels: BTreeMap<Level, CaptureFile>,
    all: Option<CaptureFile>,
}

impl CaptureFileSet {
    /// Open `<MM-dd HH-mm>_Logs-<letter>.log` for each of `levels` and the
    /// matching `_Logs-ALL.log`
    ///
    /// A file that cannot be opened is reported and skipped; the rest of the
    /// set is still usable.
    pub fn open(directory: &Path, levels: &[Level], now: DateTime<Local>) -> Self {
        let mut set = Self {
            levels: BTreeMap::new(),
            all: None,
        };

        for level in levels.iter().filter(|l| l.is_message_level()) {
            let path = directory.join(capture_file_name(now, level.letter()));
            match CaptureFile::open(path) {
                Ok(file) => {
                    set.levels.insert(*level, file);
                }
                Err(e) => tracing::error!(error = %e, level = %level, "Failed to open capture file"),
            }
        }

        let path = directory.join(capture_file_name(now, Level::All.letter()));
        match CaptureFile::open(path) {
            Ok(file) => set.all = Some(file),
            Err(e) => tracing::error!(error = %e, "Failed to open capture file"),
        }

        set
    }

    /// Paths of every file in the set, level files first
    pub fn paths(&self) -> Vec<PathBuf> {
        self.levels
            .values()
            .chain(self.all.iter())
            .map(|f| f.path.clone())
            .collect()
    }

    /// Append `line` to the file for `level` (if enabled) and to the ALL file
    pub fn write(&mut self, level: Level, line: &str) {
        if let Some(file) = self.levels.get_mut(&level) {
            if let Err(e) = file.write_line(line) {
                tracing::warn!(error = %e, "Failed to write capture line");
            }
        }
        if let Some(file) = self.all.as_mut() {
            if let Err(e) = file.write_line(line) {
                tracing::warn!(error = %e, "Failed to write capture line");
            }
        }
    }

    /// Flush and close every file, returning the errors met on the way
    pub fn close(self) -> Vec<Error> {
        let mut errors = Vec::new();
        for mut file in self.levels.into_values().chain(self.all) {
            if let Err(e) = file.writer.flush() {
                errors.push(Error::io(&file.path, e));
                continue;
            }
            match file.writer.into_inner() {
                Ok(inner) => {
                    if let Err(e) = inner.sync_all() {
                        errors.push(Error::io(&file.path, e));
                    }
                }
                Err(e) => errors.push(Error::io(&file.path, e.into_error())),
            }
        }
        errors
    }
}
