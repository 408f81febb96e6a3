//! Ledger verification (`--verify-ledger`)

use std::io::Write;
use std::path::Path;

use super::CliError;
use crate::resume::ProgressLedger;

/// Check that the ledger at `path` is readable and print what it holds.
///
/// A missing ledger is not an error: nothing has been downloaded yet.
pub fn verify_ledger(path: &Path, out: &mut impl Write) -> Result<(), CliError> {
    if !path.exists() {
        writeln!(out, "No ledger found at {}", path.display())?;
        return Ok(());
    }

    let ledger = ProgressLedger::read_strict(path)?;
    let albums: Vec<&str> = ledger.albums().collect();
    let files: usize = albums.iter().map(|album_id| ledger.len(album_id)).sum();
    writeln!(
        out,
        "Ledger OK: {} ({} albums, {} files)",
        path.display(),
        albums.len(),
        files
    )?;
    for album_id in albums {
        writeln!(out, "  {album_id}: {} files", ledger.len(album_id))?;
    }
    Ok(())
}
