//! Routing of meaningful images into the output folder.

use crate::config::{CollisionPolicy, RouteMode};
use crate::output::RouteOutcome;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Copy or move `src` into `output_dir`, keeping its file name.
///
/// `output_dir` must already exist.
pub async fn route_image(
    src: &Path,
    output_dir: &Path,
    mode: RouteMode,
    on_conflict: CollisionPolicy,
) -> io::Result<RouteOutcome> {
    let name = src.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' has no file name", src.display()),
        )
    })?;
    let mut dest = output_dir.join(name);

    if tokio::fs::try_exists(&dest).await? {
        if same_file(src, &dest).await {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{}' is already in the output folder", src.display()),
            ));
        }
        match on_conflict {
            CollisionPolicy::Overwrite => {}
            CollisionPolicy::Skip => {
                debug!("Keeping existing {}", dest.display());
                return Ok(RouteOutcome::SkippedExisting(dest));
            }
            CollisionPolicy::Rename => dest = free_name(&dest).await?,
        }
    }

    match mode {
        RouteMode::Copy => {
            tokio::fs::copy(src, &dest).await?;
            debug!("Copied {} → {}", src.display(), dest.display());
            Ok(RouteOutcome::Copied(dest))
        }
        RouteMode::Move => {
            match tokio::fs::rename(src, &dest).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                    let (from, to) = (src.to_path_buf(), dest.clone());
                    tokio::task::spawn_blocking(move || copy_then_remove(&from, &to))
                        .await
                        .map_err(io::Error::other)??;
                }
                Err(e) => return Err(e),
            }
            debug!("Moved {} → {}", src.display(), dest.display());
            Ok(RouteOutcome::Moved(dest))
        }
    }
}

/// Move across filesystems. The copy is staged in a temp file next to
/// `dest` and only takes its name once `src` is gone, so a failure leaves
/// the image in exactly one place.
fn copy_then_remove(src: &Path, dest: &Path) -> io::Result<()> {
    let dir = dest.parent().unwrap_or(Path::new("."));
    let mut staged = NamedTempFile::new_in(dir)?;
    let mut reader = std::fs::File::open(src)?;
    io::copy(&mut reader, staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    drop(reader);

    std::fs::remove_file(src)?;

    staged.persist(dest).map_err(|e| {
        let kind = e.error.kind();
        match e.file.keep() {
            Ok((_, kept)) => io::Error::new(
                kind,
                format!(
                    "could not rename staged copy to '{}'; image kept at '{}'",
                    dest.display(),
                    kept.display()
                ),
            ),
            Err(keep) => keep.error,
        }
    })?;
    Ok(())
}

async fn same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// First of `stem_1.ext`, `stem_2.ext`, … that does not exist yet.
async fn free_name(taken: &Path) -> io::Result<PathBuf> {
    let stem = taken
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = taken
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let parent = taken.parent().unwrap_or(Path::new("."));

    for n in 1u32.. {
        let candidate = parent.join(format!("{stem}_{n}{ext}"));
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(io::Error::other("no free file name"))
}
