//! finding candidate files
//!
//! Resources are matched in their source directory, but processed where the build put them: a relative path that
//! matches the patterns below `source_dir` selects `output_dir/<relative path>`, if that file exists.
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct CandidateFiles {
    includes: Vec<glob::Pattern>,
    excludes: Vec<glob::Pattern>,
}

impl CandidateFiles {
    /// An empty include list selects every file
    pub fn new<I, E>(includes: I, excludes: E) -> Result<Self, DiscoveryError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Ok(Self {
            includes: compile(includes)?,
            excludes: compile(excludes)?,
        })
    }

    pub fn is_candidate(&self, relative: &Path) -> bool {
        let options = glob::MatchOptions {
            require_literal_separator: true,
            ..Default::default()
        };
        let matches = |pattern: &glob::Pattern| pattern.matches_path_with(relative, options);

        let included = self.includes.is_empty() || self.includes.iter().any(matches);
        included && !self.excludes.iter().any(matches)
    }

    /// Files below `output_dir` that correspond to candidates below `source_dir`, sorted by path
    pub fn scan(&self, source_dir: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
        if !source_dir.is_dir() {
            tracing::debug!(source_dir=%source_dir.display(), "source directory does not exist");
            return Ok(vec![]);
        }

        let mut result = vec![];
        for entry in walkdir::WalkDir::new(source_dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(source_dir) else {
                continue;
            };
            if !self.is_candidate(relative) {
                tracing::trace!(path=%relative.display(), "not a candidate");
                continue;
            }

            let target = output_dir.join(relative);
            if target.is_file() {
                result.push(target);
            } else {
                tracing::debug!(path=%target.display(), "candidate has no output file");
            }
        }

        Ok(result)
    }
}

fn compile<P>(patterns: P) -> Result<Vec<glob::Pattern>, DiscoveryError>
where
    P: IntoIterator,
    P::Item: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            glob::Pattern::new(pattern).map_err(|source| DiscoveryError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
        })
        .collect()
}

#[derive(thiserror::Error, Debug)]
pub enum DiscoveryError {
    #[error("Invalid glob pattern {pattern:?}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("Could not scan source directory")]
    Walk(#[from] walkdir::Error),
}
