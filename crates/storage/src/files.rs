use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::{Storage, StorageError};

fn resolve(files_dir: &std::path::Path, filename: &str) -> Result<PathBuf, StorageError> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename == "."
        || filename == ".."
    {
        return Err(StorageError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid filename",
        )));
    }
    Ok(files_dir.join(filename))
}

impl Storage {
    /// Returns whether `filename` has already been uploaded.
    pub fn file_exists(&self, filename: &str) -> Result<bool, StorageError> {
        Ok(resolve(&self.files_dir, filename)?.is_file())
    }

    /// Writes `contents` to a new file, failing with
    /// [`StorageError::FileAlreadyExists`] if it is already present.
    ///
    /// Uses exclusive-create so two concurrent uploads of the same
    /// filename can never race each other into a partial write.
    pub fn write_new_file(&self, filename: &str, contents: &[u8]) -> Result<(), StorageError> {
        let path = resolve(&self.files_dir, filename)?;
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StorageError::FileAlreadyExists);
            }
            Err(err) => return Err(StorageError::Io(err)),
        };
        file.write_all(contents)?;
        Ok(())
    }

    /// Reads a previously uploaded file's full contents.
    pub fn read_file(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        let path = resolve(&self.files_dir, filename)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StorageError::FileNotFound),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    /// Lists every uploaded filename, sorted lexicographically.
    pub fn list_files(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.files_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
