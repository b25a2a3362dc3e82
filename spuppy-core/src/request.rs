//! # request: what to upload and where to put it
//!
//! An [`UploadRequest`] is built from raw command-line input (a directory, a
//! comma-separated file list, an output folder name) and checked with
//! [`UploadRequest::verify`] before anything touches the network.
//!
//! Verification collects every problem instead of stopping at the first one,
//! so a user fixing their invocation sees the whole list at once. Only when no
//! problem is found are the paths rewritten to absolute form and, when no
//! explicit list was given, the file list filled from the directory.
//!
//! The output folder name ends up inside a Sharepoint REST path, which is why
//! it is restricted to `[a-zA-Z0-9._-]`.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

static FOLDER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("folder name pattern is valid"));

/// One reason an [`UploadRequest`] cannot be uploaded.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("at least one of --directory or --files must be present")]
    MissingInput,
    #[error("{} does not exist", .0.display())]
    DirectoryMissing(PathBuf),
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("{} does not exist", .0.display())]
    FileMissing(PathBuf),
    #[error("{} does not exist on path {}", .file.display(), .directory.display())]
    FileMissingInDirectory { file: PathBuf, directory: PathBuf },
    #[error("{} is not a file", .0.display())]
    NotAFile(PathBuf),
    #[error("{0} contains illegal characters: only a-zA-Z0-9._- are allowed")]
    IllegalFolderName(String),
    #[error("cannot read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Files to upload and the folder to create for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    directory: Option<PathBuf>,
    files: Option<Vec<PathBuf>>,
    out_folder: Option<String>,
}

impl UploadRequest {
    /// Builds a request from command-line values. `files` is the raw
    /// comma-separated list; empty strings count as not given.
    pub fn new(directory: Option<PathBuf>, files: Option<&str>, out_folder: Option<String>) -> Self {
        let files = files
            .filter(|raw| !raw.is_empty())
            .map(|raw| raw.split(',').map(PathBuf::from).collect());
        Self::from_parts(directory, files, out_folder)
    }

    /// Builds a request from an already split file list.
    pub fn from_parts(
        directory: Option<PathBuf>,
        files: Option<Vec<PathBuf>>,
        out_folder: Option<String>,
    ) -> Self {
        let directory = directory.filter(|d| !d.as_os_str().is_empty());
        let files = files.filter(|f| !f.is_empty());
        let out_folder = out_folder
            .filter(|name| !name.is_empty())
            .or_else(|| directory.as_deref().and_then(default_folder_name));
        Self {
            directory,
            files,
            out_folder,
        }
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// The file list; absolute and complete only after a successful [`verify`](Self::verify).
    pub fn files(&self) -> &[PathBuf] {
        self.files.as_deref().unwrap_or_default()
    }

    pub fn out_folder(&self) -> Option<&str> {
        self.out_folder.as_deref()
    }

    /// Checks every rule and, if all pass, resolves the request in place.
    ///
    /// On error the request is left exactly as it was.
    pub fn verify(&mut self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.directory.is_none() && self.files.is_none() {
            errors.push(ValidationError::MissingInput);
        }
        errors.extend(self.verify_directory());
        errors.extend(self.verify_files());
        errors.extend(self.verify_out_folder());
        if !errors.is_empty() {
            return Err(errors);
        }

        let (directory, files) = self.resolve().map_err(|e| vec![e])?;
        debug!(files = files.len(), "Resolved upload request");
        self.directory = directory;
        self.files = Some(files);
        Ok(())
    }

    fn verify_directory(&self) -> Option<ValidationError> {
        let directory = self.directory.as_ref()?;
        if !directory.exists() {
            Some(ValidationError::DirectoryMissing(directory.clone()))
        } else if !directory.is_dir() {
            Some(ValidationError::NotADirectory(directory.clone()))
        } else {
            None
        }
    }

    fn verify_files(&self) -> Vec<ValidationError> {
        let Some(files) = &self.files else {
            return Vec::new();
        };
        files
            .iter()
            .filter_map(|file| {
                if file.exists() {
                    return (!file.is_file()).then(|| ValidationError::NotAFile(file.clone()));
                }
                match &self.directory {
                    Some(directory) => {
                        let joined = directory.join(file);
                        if !joined.exists() {
                            Some(ValidationError::FileMissingInDirectory {
                                file: file.clone(),
                                directory: directory.clone(),
                            })
                        } else if !joined.is_file() {
                            Some(ValidationError::NotAFile(file.clone()))
                        } else {
                            None
                        }
                    }
                    None => Some(ValidationError::FileMissing(file.clone())),
                }
            })
            .collect()
    }

    fn verify_out_folder(&self) -> Option<ValidationError> {
        let name = self.out_folder.as_ref()?;
        (!FOLDER_NAME.is_match(name)).then(|| ValidationError::IllegalFolderName(name.clone()))
    }

    /// Computes the absolute directory and file list without touching `self`.
    fn resolve(&self) -> Result<(Option<PathBuf>, Vec<PathBuf>), ValidationError> {
        let unreadable = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| ValidationError::Unreadable { path, source }
        };

        let directory = match &self.directory {
            Some(directory) => {
                Some(std::path::absolute(directory).map_err(unreadable(directory))?)
            }
            None => None,
        };
        let base = match &directory {
            Some(directory) => directory.clone(),
            None => std::env::current_dir().map_err(unreadable(Path::new(".")))?,
        };

        let files = match &self.files {
            Some(entries) => entries
                .iter()
                .map(|entry| resolve_entry(&base, entry).map_err(unreadable(entry)))
                .collect::<Result<Vec<_>, _>>()?,
            None => regular_files_in(&base).map_err(unreadable(&base))?,
        };
        Ok((directory, files))
    }
}

/// Prefers the entry inside `base`; falls back to the entry as given, which is
/// how bare names found in the working directory validated.
///
/// `..` components are kept: after a symlink they name a different place than
/// their lexical parent.
fn resolve_entry(base: &Path, entry: &Path) -> io::Result<PathBuf> {
    let joined = base.join(entry);
    if joined.is_file() {
        std::path::absolute(&joined)
    } else {
        std::path::absolute(entry)
    }
}

fn regular_files_in(directory: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn default_folder_name(directory: &Path) -> Option<String> {
    let absolute = absolutize(directory).ok()?;
    absolute
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Absolute, lexically normalized form of `path` (no symlink resolution).
/// Only used to name the output folder after the directory.
fn absolutize(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_list_is_split_in_order() {
        let request = UploadRequest::new(None, Some("a.txt,b.txt,c.txt"), None);
        assert_eq!(
            request.files(),
            &[
                PathBuf::from("a.txt"),
                PathBuf::from("b.txt"),
                PathBuf::from("c.txt")
            ]
        );
    }

    #[test]
    fn empty_inputs_count_as_absent() {
        let request = UploadRequest::new(Some(PathBuf::new()), Some(""), Some(String::new()));
        assert_eq!(request.directory(), None);
        assert!(request.files().is_empty());
        assert_eq!(request.out_folder(), None);
    }

    #[test]
    fn out_folder_defaults_to_directory_basename() {
        let request = UploadRequest::new(Some(PathBuf::from("/srv/reports/2021/")), None, None);
        assert_eq!(request.out_folder(), Some("2021"));
    }

    #[test]
    fn default_folder_resolves_parent_components() {
        let request = UploadRequest::new(Some(PathBuf::from("/srv/reports/2021/..")), None, None);
        assert_eq!(request.out_folder(), Some("reports"));
    }

    #[test]
    fn explicit_out_folder_wins_over_directory() {
        let request = UploadRequest::new(
            Some(PathBuf::from("/srv/reports")),
            None,
            Some("weekly".to_string()),
        );
        assert_eq!(request.out_folder(), Some("weekly"));
    }

    #[test]
    fn no_out_folder_without_directory() {
        let request = UploadRequest::new(None, Some("x.txt"), None);
        assert_eq!(request.out_folder(), None);
    }

    #[test]
    fn folder_pattern_accepts_only_safe_characters() {
        for good in ["a", "Report_2021-01.v2", "...", "-_-"] {
            assert!(FOLDER_NAME.is_match(good), "{good} should pass");
        }
        for bad in ["My Folder", "a/b", "a\\b", "ä", "x$", "", "tab\there"] {
            assert!(!FOLDER_NAME.is_match(bad), "{bad} should fail");
        }
    }

    #[test]
    fn absolutize_keeps_absolute_paths() {
        let path = absolutize(Path::new("/a/./b/../c")).unwrap();
        assert_eq!(path, PathBuf::from("/a/c"));
    }
}
