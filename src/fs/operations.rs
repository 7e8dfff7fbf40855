use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, warn};

/// Creates a sibling path with an extra extension. For example `projects.json` becomes
/// `projects.json.tmp`.
fn sibling_path(path: &Path, extension: &str) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("{path:?} doesn't point to a file"))?;
    let mut name = OsString::from(file_name);
    name.push(".");
    name.push(extension);
    Ok(path.with_file_name(name))
}

/// Replaces contents of a file in a way that a crash in the middle of writing leaves either the
/// old or the new contents. Data is first written into a temporary file next to the target, then
/// synced and renamed over it.
///
/// Writers are serialized through an exclusive lock on a `.lock` file living next to the target.
pub async fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let lock_path = sibling_path(path, "lock")?;
    let lock = File::options()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .await?;

    // Semi-safe acquire-release for a file
    lock.lock_exclusive()?;
    let result = replace_file(path, contents).await;
    lock.unlock_async().await?;
    result
}

async fn replace_file(path: &Path, contents: &[u8]) -> Result<()> {
    let temp_path = sibling_path(path, "tmp")?;
    debug!("Writing {} bytes into {temp_path:?}", contents.len());

    let written = async {
        let mut temp = File::create(&temp_path).await?;
        temp.write_all(contents).await?;
        temp.flush().await?;
        temp.sync_all().await?;
        fs::rename(&temp_path, path).await?;
        anyhow::Ok(())
    }
    .await;

    if written.is_err() {
        if let Err(e) = fs::remove_file(&temp_path).await {
            warn!("Couldn't clean up {temp_path:?}: {e}");
        }
    }
    written
}
