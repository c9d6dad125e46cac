//! Once-only backup of original files.
//!
//! Before a source image is rewritten, a byte-identical copy is placed in the
//! backup directory under the same file name. A backup that already exists is
//! the only pristine copy left after the first run, so it is never replaced.
//!
//! The destination is opened with `create_new`, which makes "does a backup
//! exist?" and "claim the name" a single atomic step. Parallel workers can
//! therefore never both copy, and a second run is a no-op.

use std::fs::{self, File, FileTimes, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::Path;
use tracing::debug;

/// Copy `source` into `backup_dir` unless a file of that name is already there.
///
/// Creates `backup_dir` recursively. Permissions and timestamps are carried
/// over. Returns `true` if a copy was made, `false` if a backup already
/// existed. A failed copy removes the partial destination so it cannot be
/// mistaken for a pristine backup later.
pub fn backup_original(source: &Path, backup_dir: &Path) -> io::Result<bool> {
    let name = source.file_name().ok_or_else(|| {
        io::Error::new(
            ErrorKind::InvalidInput,
            format!("{} has no file name", source.display()),
        )
    })?;
    fs::create_dir_all(backup_dir)?;
    let target = backup_dir.join(name);

    let mut dest = match OpenOptions::new().write(true).create_new(true).open(&target) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!(backup = %target.display(), "backup already present");
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    if let Err(e) = copy_contents(source, &mut dest) {
        drop(dest);
        let _ = fs::remove_file(&target);
        return Err(e);
    }
    Ok(true)
}

fn copy_contents(source: &Path, dest: &mut File) -> io::Result<()> {
    let mut src = File::open(source)?;
    io::copy(&mut src, dest)?;

    let meta = src.metadata()?;
    dest.set_permissions(meta.permissions())?;
    let mut times = FileTimes::new();
    if let Ok(modified) = meta.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = meta.accessed() {
        times = times.set_accessed(accessed);
    }
    dest.set_times(times)?;
    dest.sync_all()
}
