//! Build generations under one persistence root.
//!
//! Every build writes its tables into a fresh `gen-*` directory. The `CURRENT`
//! file names the generation readers open and is only replaced once the new
//! tables are complete. A build keeps the generation it replaced, so indexes
//! opened before it keep reading valid files; anything older is removed.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};

use docrag_core::error::{Error, Result};

pub const CURRENT_FILE: &str = "CURRENT";
const GEN_PREFIX: &str = "gen-";

/// Generation directory named by `root/CURRENT`.
pub fn current(root: &Path) -> Result<PathBuf> {
	let pointer = root.join(CURRENT_FILE);
	let name = fs::read_to_string(&pointer)
		.map_err(|e| Error::PersistedIndexCorrupt(format!("{}: {e}", pointer.display())))?;
	let name = name.trim();
	if !name.starts_with(GEN_PREFIX) || name.contains(['/', '\\']) {
		return Err(Error::PersistedIndexCorrupt(format!("bad generation pointer '{name}'")));
	}
	let dir = root.join(name);
	if !dir.is_dir() {
		return Err(Error::PersistedIndexCorrupt(format!("generation '{name}' missing")));
	}
	Ok(dir)
}

/// Create a new, empty generation directory under `root`.
pub fn allocate(root: &Path) -> Result<PathBuf> {
	fs::create_dir_all(root)?;
	let stamp = Utc::now().timestamp_micros();
	let mut counter = 0u32;
	loop {
		let dir = root.join(format!("{GEN_PREFIX}{stamp}-{counter}"));
		match fs::create_dir(&dir) {
			Ok(()) => return Ok(dir),
			Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
			Err(e) => return Err(e.into()),
		}
	}
}

/// Point `root/CURRENT` at `dir`. The pointer is written to a temp file and renamed.
pub fn publish(root: &Path, dir: &Path) -> Result<()> {
	let name = dir
		.file_name()
		.and_then(|n| n.to_str())
		.ok_or_else(|| Error::InvalidArgument(format!("not a generation directory: {}", dir.display())))?;
	let pointer = root.join(CURRENT_FILE);
	let tmp = pointer.with_extension("tmp");
	fs::write(&tmp, name)?;
	fs::rename(&tmp, &pointer)?;
	debug!(generation = name, "published index generation");
	Ok(())
}

/// Remove every entry of `root` except `CURRENT` and the directories in `keep`.
///
/// Failures are logged; a leftover directory only costs disk space.
pub fn prune(root: &Path, keep: &[&Path]) {
	let entries = match fs::read_dir(root) {
		Ok(entries) => entries,
		Err(e) => {
			warn!(root = %root.display(), error = %e, "cannot list index generations");
			return;
		}
	};
	for entry in entries.flatten() {
		let path = entry.path();
		if entry.file_name() == CURRENT_FILE || keep.iter().any(|k| *k == path.as_path()) {
			continue;
		}
		let removed = if path.is_dir() { fs::remove_dir_all(&path) } else { fs::remove_file(&path) };
		match removed {
			Ok(()) => debug!(path = %path.display(), "removed old index generation"),
			Err(e) => warn!(path = %path.display(), error = %e, "failed to remove old index generation"),
		}
	}
}

/// Best-effort removal of a generation that was never published.
pub fn discard(dir: &Path) {
	if let Err(e) = fs::remove_dir_all(dir) {
		warn!(path = %dir.display(), error = %e, "failed to remove unpublished index generation");
	}
}
