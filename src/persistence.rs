//! JSON snapshots on disk.
//!
//! Snapshots are written to a sibling temporary file, flushed, synced and
//! renamed over the target, so readers see either the old or the new file.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Read the snapshot at `path`, or `None` if there is no file yet.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let value = serde_json::from_reader(BufReader::new(file))?;
    Ok(Some(value))
}

/// Replace the snapshot at `path` with `value`.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let tmp = temp_path(path);
    let result = write_then_rename(&tmp, path, value);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_then_rename<T: Serialize + ?Sized>(tmp: &Path, path: &Path, value: &T) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(tmp)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    fs::rename(tmp, path)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("snapshot"));
    name.push(".tmp");
    path.with_file_name(name)
}
