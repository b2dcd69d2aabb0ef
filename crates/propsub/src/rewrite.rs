//! rewriting resource files in place
//!
//! [FileRewriter::process] streams a file line by line through the [Resolver]. The scratch file is created with the
//! first changed line, the lines before it are held in memory until then. A file without a changed line never
//! causes a write, so read-only outputs with nothing to replace are fine. Otherwise the scratch file is promoted:
//!
//! 1. the staged content is flushed and synced
//! 2. its length is compared to the number of bytes written (or to the scratch file when it had to be copied)
//! 3. only then it is renamed over the original
//!
//! The staged file always lives in the directory of the original so the final rename is atomic. Until that rename
//! the original is untouched, after it the new content is complete. Scratch and staging files are removed when
//! dropped, whatever happens in between.
//!
//! Symlinks are followed: the file a link points to receives the new content and the link stays in place.
//!
//! Lines are re-emitted with the configured [LineEnding], so a changed file may also change its line terminators.
use crate::encoding::Encoding;
use crate::resolver::Resolver;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A file to process and the encoding used to read and write it
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct ResourceFile {
    pub path: PathBuf,
    pub encoding: Encoding,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// `\r\n` on windows, `\n` everywhere else
    #[default]
    Native,
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Native if cfg!(windows) => "\r\n",
            LineEnding::Native | LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

impl std::fmt::Display for LineEnding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineEnding::Native => f.write_str("native"),
            LineEnding::Lf => f.write_str("lf"),
            LineEnding::Crlf => f.write_str("crlf"),
        }
    }
}

/// Where resolved content is written before promotion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ScratchLocation {
    /// Next to the original, promoted by rename
    #[default]
    Sibling,
    /// In the given directory, copied next to the original and verified before the rename
    Directory(PathBuf),
}

#[derive(Debug, Default, derive_new::new)]
pub struct FileRewriter {
    line_ending: LineEnding,
    scratch: ScratchLocation,
    #[cfg(test)]
    #[new(default)]
    truncated: Option<PathBuf>,
}

/// What happened to a single file
#[derive(Debug)]
pub enum Outcome {
    /// No line changed, the file was not touched
    Unchanged,
    /// The file now holds the resolved content
    Replaced { changed_lines: usize },
    /// The staged content could not be verified, the original was kept
    Unverified(CopyVerificationError),
}

/// Totals of a run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub unchanged: usize,
    pub replaced: usize,
    /// Files that need manual follow-up
    pub unverified: Vec<PathBuf>,
}

impl FileRewriter {
    /// Process files in order
    ///
    /// Stops at the first [RewriteError]. Verification failures are logged and collected in [Summary::unverified].
    pub fn process_all<'f>(
        &self,
        resolver: &Resolver,
        files: impl IntoIterator<Item = &'f ResourceFile>,
    ) -> Result<Summary, RewriteError> {
        let mut summary = Summary::default();

        for file in files {
            match self.process(resolver, file)? {
                Outcome::Unchanged => summary.unchanged += 1,
                Outcome::Replaced { .. } => summary.replaced += 1,
                Outcome::Unverified(_) => summary.unverified.push(file.path.clone()),
            }
        }

        Ok(summary)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(path = %file.path.display()))]
    pub fn process(&self, resolver: &Resolver, file: &ResourceFile) -> Result<Outcome, RewriteError> {
        let path = file.path.as_path();
        let read_error = |source| RewriteError::Read {
            path: path.to_owned(),
            source,
        };
        let write_error = |source| RewriteError::Write {
            path: path.to_owned(),
            source,
        };

        let mut reader = BufReader::new(std::fs::File::open(path).map_err(read_error)?);
        let terminator = self.line_ending.as_str().as_bytes();

        // output of the lines before the first change, the scratch file doesn't exist yet
        let mut pending = vec![];
        let mut scratch: Option<BufWriter<NamedTempFile>> = None;
        let mut changed_lines = 0;
        let mut written = 0u64;
        let mut buffer = vec![];

        while reader.read_until(b'\n', &mut buffer).map_err(read_error)? > 0 {
            let line = file
                .encoding
                .decode(strip_terminator(&buffer))
                .map_err(|e| read_error(invalid_data(e)))?;

            let resolution = resolver.resolve(&line);
            if resolution.changed {
                changed_lines += 1;
                tracing::debug!(old = %resolution.original, new = %resolution.resolved, "line changed");
            }

            let encoded = file
                .encoding
                .encode(&resolution.resolved)
                .map_err(|e| write_error(invalid_data(e)))?;
            pending.extend_from_slice(&encoded);
            pending.extend_from_slice(terminator);
            buffer.clear();

            if changed_lines == 0 {
                continue;
            }
            if scratch.is_none() {
                let created = self.scratch_file(path).map_err(write_error)?;
                tracing::trace!(scratch = %created.path().display(), "created scratch file");
                scratch = Some(BufWriter::new(created));
            }
            if let Some(writer) = scratch.as_mut() {
                writer.write_all(&pending).map_err(write_error)?;
                written += pending.len() as u64;
                pending.clear();
            }
        }
        drop(reader);

        let Some(writer) = scratch else {
            tracing::trace!("unchanged");
            return Ok(Outcome::Unchanged);
        };
        let scratch = writer
            .into_inner()
            .map_err(|e| write_error(e.into_error()))?;

        scratch.as_file().sync_all().map_err(write_error)?;
        let verified = self
            .promote(scratch, path, written)
            .map_err(|source| RewriteError::Promote {
                path: path.to_owned(),
                source,
            })?;

        if let Err(error) = verified {
            tracing::warn!(%error, "file was not replaced and needs manual follow-up");
            return Ok(Outcome::Unverified(error));
        }

        tracing::info!(changed_lines, "file replaced");
        Ok(Outcome::Replaced { changed_lines })
    }

    fn scratch_file(&self, target: &Path) -> std::io::Result<NamedTempFile> {
        let target = target.canonicalize()?;
        let directory = match &self.scratch {
            ScratchLocation::Sibling => parent_directory(&target),
            ScratchLocation::Directory(directory) => directory.as_path(),
        };
        staging_file(&target, directory)
    }

    /// Rename the verified scratch content over `target`
    ///
    /// A symlinked `target` is resolved first, the new content replaces the file the link points to.
    fn promote(
        &self,
        scratch: NamedTempFile,
        target: &Path,
        written: u64,
    ) -> std::io::Result<Result<(), CopyVerificationError>> {
        let target = target.canonicalize()?;
        let target = target.as_path();

        #[cfg(test)]
        if self.truncated.as_deref() == Some(target) {
            scratch.as_file().set_len(written.saturating_sub(1))?;
        }

        let scratch_length = scratch.as_file().metadata()?.len();
        if let Err(error) = verify(target, written, scratch_length) {
            return Ok(Err(error));
        }

        let staged = match self.scratch {
            ScratchLocation::Sibling => scratch,
            ScratchLocation::Directory(_) => {
                let mut staged = staging_file(target, parent_directory(target))?;
                let mut source = scratch.reopen()?;
                std::io::copy(&mut source, staged.as_file_mut())?;
                staged.as_file().sync_all()?;

                let staged_length = staged.as_file().metadata()?.len();
                if let Err(error) = verify(target, scratch_length, staged_length) {
                    return Ok(Err(error));
                }
                staged
            }
        };

        if let Ok(metadata) = std::fs::metadata(target) {
            std::fs::set_permissions(staged.path(), metadata.permissions())?;
        }

        staged.persist(target).map_err(|e| e.error)?;
        Ok(Ok(()))
    }

    /// Shorten the scratch content of `path` by one byte before it is verified
    #[cfg(test)]
    fn truncating(mut self, path: &Path) -> Self {
        self.truncated = path.canonicalize().ok();
        self
    }
}

fn verify(path: &Path, expected: u64, actual: u64) -> Result<(), CopyVerificationError> {
    if expected == actual {
        return Ok(());
    }
    Err(CopyVerificationError {
        path: path.to_owned(),
        expected,
        actual,
    })
}

fn staging_file(target: &Path, directory: &Path) -> std::io::Result<NamedTempFile> {
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".tmp")
        .tempfile_in(directory)
}

fn parent_directory(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn invalid_data(error: crate::encoding::EncodingError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, error)
}

/// Staged content doesn't have the expected length
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Incomplete copy for {}: expected {expected} bytes, found {actual}", path.display())]
pub struct CopyVerificationError {
    pub path: PathBuf,
    pub expected: u64,
    pub actual: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum RewriteError {
    #[error("Could not read resource {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not write scratch file for {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not replace {}", path.display())]
    Promote {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RewriteError {
    pub fn path(&self) -> &Path {
        match self {
            RewriteError::Read { path, .. }
            | RewriteError::Write { path, .. }
            | RewriteError::Promote { path, .. } => path,
        }
    }
}
