//! Header reader backed by the DCMTK `dcmdump` tool.
//!
//! Opt-in alternative to the in-process [`DicomReader`](crate::DicomReader).
//! Archived representatives are piped to the tool on stdin.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use bids_model::{DicomTag, FieldSpec, HeaderField, HeaderValues, TagDictionary};

use crate::error::ReadError;
use crate::reader::HeaderReader;
use crate::source::{Representative, SeriesSource};

pub const DEFAULT_PROGRAM: &str = "dcmdump";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const STDIN_ARG: &str = "-";

/// Runs `dcmdump +P gggg,eeee ...` on a series' representative file.
#[derive(Debug, Clone)]
pub struct DcmdumpReader {
    program: PathBuf,
    timeout: Duration,
}

impl Default for DcmdumpReader {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM, DEFAULT_TIMEOUT)
    }
}

impl DcmdumpReader {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Runs `dcmdump --version` once, so a missing or broken program is
    /// reported before any series is read.
    pub fn check(&self) -> Result<(), ReadError> {
        let child = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| self.spawn_error(source))?;
        let output = wait_with_timeout(child, None, self.timeout, "--version")?;
        if !output.success {
            return Err(self.exit_error(output, "--version"));
        }
        debug!(program = %self.program.display(), "dcmdump available");
        Ok(())
    }

    /// Dumps the requested tags of `series`, keyed by tag.
    fn dump(
        &self,
        series: &SeriesSource,
        tags: &BTreeSet<DicomTag>,
    ) -> Result<BTreeMap<DicomTag, String>, ReadError> {
        let representative = series.representative.as_ref().ok_or_else(|| {
            ReadError::MissingRepresentative {
                locator: series.locator.to_string(),
            }
        })?;
        if tags.is_empty() {
            return Ok(BTreeMap::new());
        }
        let target = representative.to_string();

        let mut command = Command::new(&self.program);
        for tag in tags {
            command.arg("+P").arg(tag.to_string());
        }
        let input = match representative {
            Representative::File(path) => {
                command.arg(path).stdin(Stdio::null());
                None
            }
            Representative::Archived(file) => {
                command.arg(STDIN_ARG).stdin(Stdio::piped());
                Some(Arc::clone(&file.bytes))
            }
        };
        command.stdout(Stdio::piped()).stderr(Stdio::piped());

        let started = Instant::now();
        let child = command.spawn().map_err(|source| self.spawn_error(source))?;
        let output = wait_with_timeout(child, input, self.timeout, &target)?;
        debug!(
            locator = %series.locator,
            tags = tags.len(),
            duration_ms = started.elapsed().as_millis(),
            "dcmdump finished"
        );

        if !output.success {
            return Err(self.exit_error(output, &target));
        }
        Ok(parse_dump(&output.stdout))
    }

    fn spawn_error(&self, source: std::io::Error) -> ReadError {
        ReadError::Spawn {
            program: self.program.display().to_string(),
            source,
        }
    }

    fn exit_error(&self, output: ProcessOutput, target: &str) -> ReadError {
        ReadError::Exit {
            program: self.program.display().to_string(),
            status: output.status,
            target: target.to_string(),
            stderr: output.stderr.trim().to_string(),
        }
    }
}

impl HeaderReader for DcmdumpReader {
    fn read_field(
        &self,
        series: &SeriesSource,
        spec: &FieldSpec,
    ) -> Result<Option<String>, ReadError> {
        let tags: BTreeSet<DicomTag> = spec.tags().iter().copied().collect();
        let dump = self.dump(series, &tags)?;
        Ok(first_present(&dump, spec))
    }

    /// One process per series, covering every requested tag.
    fn read_fields(
        &self,
        series: &SeriesSource,
        tags: &TagDictionary,
        fields: &BTreeSet<HeaderField>,
    ) -> Result<HeaderValues, ReadError> {
        let mut specs = Vec::with_capacity(fields.len());
        for field in fields {
            specs.push((field, tags.spec(field)?));
        }
        let wanted: BTreeSet<DicomTag> = specs
            .iter()
            .flat_map(|(_, spec)| spec.tags().iter().copied())
            .collect();
        let dump = self.dump(series, &wanted)?;

        let mut values = HeaderValues::new();
        for (field, spec) in specs {
            if let Some(value) = first_present(&dump, spec) {
                values.insert(field.clone(), value);
            }
        }
        Ok(values)
    }
}

fn first_present(dump: &BTreeMap<DicomTag, String>, spec: &FieldSpec) -> Option<String> {
    spec.tags()
        .iter()
        .filter_map(|tag| dump.get(tag))
        .find(|value| !value.trim().is_empty())
        .cloned()
}

struct ProcessOutput {
    success: bool,
    status: String,
    stdout: String,
    stderr: String,
}

/// Feeds `input` to `child`'s stdin and waits for it, killing it once
/// `timeout` has elapsed.
fn wait_with_timeout(
    mut child: Child,
    input: Option<Arc<[u8]>>,
    timeout: Duration,
    target: &str,
) -> Result<ProcessOutput, ReadError> {
    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);
    // The child may exit without reading all of its input.
    let writer = child.stdin.take().zip(input).map(|(mut stdin, bytes)| {
        thread::spawn(move || {
            let _ = stdin.write_all(&bytes);
        })
    });
    let deadline = Instant::now() + timeout;

    let status = loop {
        let polled = child.try_wait().map_err(|source| ReadError::Io {
            target: target.to_string(),
            source,
        })?;
        if let Some(status) = polled {
            break status;
        }
        if Instant::now() >= deadline {
            // The process may exit between the poll and the kill.
            let _ = child.kill();
            let _ = child.wait();
            return Err(ReadError::Timeout {
                target: target.to_string(),
                seconds: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    if let Some(writer) = writer {
        let _ = writer.join();
    }
    let collect = |handle: Option<thread::JoinHandle<String>>| {
        handle
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    };
    Ok(ProcessOutput {
        success: status.success(),
        status: status.to_string(),
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        let _ = pipe.read_to_end(&mut bytes);
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

/// Parses `dcmdump` lines of the form `(gggg,eeee) VR [value]  # len, vm Name`.
///
/// The first occurrence of a tag wins. Elements without a value are skipped.
pub fn parse_dump(output: &str) -> BTreeMap<DicomTag, String> {
    let mut values = BTreeMap::new();
    for line in output.lines() {
        let Some((tag, value)) = parse_line(line) else {
            continue;
        };
        values.entry(tag).or_insert(value);
    }
    values
}

fn parse_line(line: &str) -> Option<(DicomTag, String)> {
    let line = line.trim_start();
    let rest = line.strip_prefix('(')?;
    let (tag_text, rest) = rest.split_once(')')?;
    let tag = DicomTag::from_str(tag_text).ok()?;

    let rest = rest.trim_start();
    let (_vr, rest) = rest.split_once(char::is_whitespace)?;
    let rest = rest.trim_start();

    let value = if let Some(inner) = rest.strip_prefix('[') {
        inner.rfind(']').map(|end| &inner[..end])?
    } else if rest.starts_with('(') {
        // "(no value available)", "(Sequence with ...)" and similar markers.
        return None;
    } else {
        rest.split(" #").next().unwrap_or_default()
    };
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some((tag, value.to_string()))
    }
}
