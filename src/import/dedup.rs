/* Copyright © 2024-2025 Adam Train <adam@trainrelay.net>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */
use crate::error::ImportError;
use crate::import::entry::Entry;
use crate::parsing::filesystem::{resolve_relative, Filesystem};
use anyhow::Error;
use regex::Regex;
use std::collections::HashSet;
use std::io::{self, BufRead};
use std::path::Path;

/// Fingerprints of transactions that were already imported, either in a
/// previous run (read back from the ledger) or earlier in this one.
#[derive(Debug, Default)]
pub struct FingerprintIndex {
	fingerprints: HashSet<String>,
}

impl FingerprintIndex {
	pub fn new() -> Self {
		Self::default()
	}

	/// Scans a ledger file and everything it includes for fingerprint
	/// annotations such as `; MD5Sum: <hex>`.
	pub fn from_ledger(path: &Path) -> Result<Self, Error> {
		let mut index = FingerprintIndex::new();
		let mut scanner = LedgerScanner::new();
		scanner.scan(path, &mut index)?;

		log::info!(
			"found {} fingerprints in {}",
			index.len(),
			path.display()
		);
		Ok(index)
	}

	pub fn is_duplicate(&self, entry: &Entry) -> bool {
		self.fingerprints.contains(&entry.md5sum)
	}

	pub fn insert(&mut self, fingerprint: String) {
		self.fingerprints.insert(fingerprint);
	}

	pub fn len(&self) -> usize {
		self.fingerprints.len()
	}
}

struct LedgerScanner {
	fs: Filesystem,
	annotation: Regex,
	include: Regex,
}

impl LedgerScanner {
	fn new() -> Self {
		Self {
			fs: Filesystem::new(),
			annotation: Regex::new(
				r"(?i)^\s*[;#%|*]\s*(?:md5sum|fingerprint):\s*([0-9a-f]+)\s*$",
			)
			.unwrap(),
			include: Regex::new(r"^!?include\s+(.+?)\s*$").unwrap(),
		}
	}

	/// Include statements recurse. A file reached twice through different
	/// includes is read once; a file that includes itself, directly or not,
	/// is an error.
	fn scan(
		&mut self,
		path: &Path,
		index: &mut FingerprintIndex,
	) -> Result<(), Error> {
		if self.fs.enter_file(path)?.is_none() {
			return Ok(());
		}
		let file = self.fs.open(path)?;

		for line in io::BufReader::new(file).lines() {
			let line = line.map_err(|e| ImportError::io(path, e))?;

			if let Some(caps) = self.annotation.captures(&line) {
				index.insert(caps[1].to_lowercase());
				continue;
			}

			if let Some(caps) = self.include.captures(&line) {
				let included = resolve_relative(path, &caps[1]);
				self.scan(&included, index)?;
			}
		}

		self.fs.leave_file();
		Ok(())
	}
}
