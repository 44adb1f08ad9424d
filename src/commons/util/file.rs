use std::{
    fs,
    fs::File,
    io::{Read, Write},
    path::Path,
};

use log::trace;
use tempfile::NamedTempFile;

use crate::commons::error::IoError;

/// Creates a file, creating the parent dirs as needed.
pub fn create_file_with_path(path: &Path) -> Result<File, IoError> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            trace!("Creating path: {}", parent.display());
            fs::create_dir_all(parent).map_err(|e| {
                IoError::new(
                    format!(
                        "Could not create dir path for: {}",
                        parent.display()
                    ),
                    e,
                )
            })?;
        }
    }
    File::create(path).map_err(|e| {
        IoError::new(format!("Could not create file: {}", path.display()), e)
    })
}

/// Saves a file, creating parent dirs as needed
pub fn save(content: &[u8], full_path: &Path) -> Result<(), IoError> {
    let mut f = create_file_with_path(full_path)?;
    f.write_all(content).map_err(|e| {
        IoError::new(
            format!("Could not write to: {}", full_path.display()),
            e,
        )
    })?;

    trace!("Saved file: {}", full_path.display());
    Ok(())
}

/// Writes a file to a temporary file next to the given path.
///
/// Nothing appears at the path until the result is handed to [`persist`].
/// If it is dropped instead, the temporary file is removed again.
pub fn stage(
    content: &[u8],
    full_path: &Path,
) -> Result<NamedTempFile, IoError> {
    stage_with_mode(content, full_path, PUBLIC_MODE)
}

/// Stages a file that only the owner may read, such as a private key.
///
/// The permissions are restricted before any content is written.
pub fn stage_private(
    content: &[u8],
    full_path: &Path,
) -> Result<NamedTempFile, IoError> {
    stage_with_mode(content, full_path, PRIVATE_MODE)
}

fn stage_with_mode(
    content: &[u8],
    full_path: &Path,
    mode: u32,
) -> Result<NamedTempFile, IoError> {
    let dir = match full_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    trace!("Creating path: {}", dir.display());
    fs::create_dir_all(dir).map_err(|e| {
        IoError::new(
            format!("Could not create dir path for: {}", dir.display()),
            e,
        )
    })?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| {
        IoError::new(
            format!(
                "Could not create tmp file for: {}. Check permissions and \
                 space on disk.",
                full_path.display()
            ),
            e,
        )
    })?;
    set_mode(tmp.as_file(), tmp.path(), mode)?;
    tmp.write_all(content).map_err(|e| {
        IoError::new(
            format!(
                "Could not write tmp file: {} for: {}",
                tmp.path().display(),
                full_path.display()
            ),
            e,
        )
    })?;
    Ok(tmp)
}

/// Moves a staged file to its final path, replacing any existing file.
pub fn persist(tmp: NamedTempFile, full_path: &Path) -> Result<(), IoError> {
    tmp.persist(full_path).map_err(|e| {
        IoError::new(
            format!(
                "Cannot rename tmp file {} to {}",
                e.file.path().display(),
                full_path.display()
            ),
            e.error,
        )
    })?;

    trace!("Saved file: {}", full_path.display());
    Ok(())
}

const PUBLIC_MODE: u32 = 0o644;
const PRIVATE_MODE: u32 = 0o600;

#[cfg(unix)]
fn set_mode(f: &File, path: &Path, mode: u32) -> Result<(), IoError> {
    use std::os::unix::fs::PermissionsExt;

    f.set_permissions(fs::Permissions::from_mode(mode))
        .map_err(|e| {
            IoError::new(
                format!("Could not set permissions on: {}", path.display()),
                e,
            )
        })
}

#[cfg(not(unix))]
fn set_mode(_f: &File, _path: &Path, _mode: u32) -> Result<(), IoError> {
    Ok(())
}

/// Reads a file to a byte vector
pub fn read(path: &Path) -> Result<Vec<u8>, IoError> {
    let mut f = File::open(path).map_err(|e| {
        IoError::new(format!("Could not open: '{}'", path.display()), e)
    })?;
    let mut bytes = Vec::new();
    f.read_to_end(&mut bytes).map_err(|e| {
        IoError::new(format!("Could not read: {}", path.display()), e)
    })?;
    Ok(bytes)
}

/// Deletes a file, but does not touch the parent directories.
pub fn delete_file(full_path: &Path) -> Result<(), IoError> {
    trace!("Removing file: {}", full_path.display());
    fs::remove_file(full_path).map_err(|e| {
        IoError::new(
            format!("Could not remove file: {}", full_path.display()),
            e,
        )
    })
}

//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commons::test;

    #[test]
    fn save_creates_parent_dirs() {
        test::test_under_tmp(|d| {
            let path = d.join("nested").join("dir").join("file.txt");
            save(b"content", &path).unwrap();
            assert_eq!(read(&path).unwrap(), b"content".to_vec());
        });
    }

    #[test]
    fn delete_missing_file_fails() {
        test::test_under_tmp(|d| {
            let path = d.join("missing.key");
            let err = delete_file(&path).unwrap_err();
            assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
            assert!(err.context().contains("missing.key"));
        });
    }

    #[test]
    fn staged_file_appears_on_persist() {
        test::test_under_tmp(|d| {
            let path = d.join("ca").join("ca.crt");
            save(b"old", &path).unwrap();

            let tmp = stage(b"new", &path).unwrap();
            assert_eq!(read(&path).unwrap(), b"old".to_vec());

            persist(tmp, &path).unwrap();
            assert_eq!(read(&path).unwrap(), b"new".to_vec());
            assert_eq!(fs::read_dir(d.join("ca")).unwrap().count(), 1);
        });
    }

    #[test]
    fn dropped_stage_leaves_nothing_behind() {
        test::test_under_tmp(|d| {
            let path = d.join("ca").join("ca.key");
            drop(stage_private(b"secret", &path).unwrap());

            assert!(!path.exists());
            assert_eq!(fs::read_dir(d.join("ca")).unwrap().count(), 0);
        });
    }

    #[test]
    fn persist_onto_directory_fails() {
        test::test_under_tmp(|d| {
            let path = d.join("ca.crt");
            fs::create_dir(&path).unwrap();

            let tmp = stage(b"content", &path).unwrap();
            let err = persist(tmp, &path).unwrap_err();
            assert!(err.context().contains("ca.crt"));
            assert!(path.is_dir());
        });
    }

    #[cfg(unix)]
    #[test]
    fn staged_files_get_their_mode() {
        use std::os::unix::fs::PermissionsExt;

        test::test_under_tmp(|d| {
            let mode = |path: &Path| {
                fs::metadata(path).unwrap().permissions().mode() & 0o777
            };

            let key = d.join("ca").join("secret.key");
            persist(stage_private(b"secret", &key).unwrap(), &key).unwrap();
            assert_eq!(mode(&key), 0o600);

            let cert = d.join("ca").join("public.crt");
            persist(stage(b"public", &cert).unwrap(), &cert).unwrap();
            assert_eq!(mode(&cert), 0o644);
        });
    }
}
