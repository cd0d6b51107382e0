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
use crate::config::config_file::Config;
use crate::error::ImportError;
use anyhow::{bail, Error};
use dirs::home_dir;
use std::collections::HashSet;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const LOCAL_CONFIG: &str = ".ledgerize.toml";
const HOME_CONFIG: &str = ".config/ledgerize/config.toml";

pub struct Filesystem {
	/// Canonical paths of the files currently being read, outermost first.
	/// Seeing one of these again means the includes form a cycle.
	include_stack: Vec<PathBuf>,
	/// Canonical paths of every file entered so far.
	included_files: HashSet<PathBuf>,
}

impl Filesystem {
	pub fn new() -> Self {
		Self {
			include_stack: vec![],
			included_files: HashSet::new(),
		}
	}

	pub fn open(&self, file_path: &Path) -> Result<File, Error> {
		File::open(file_path)
			.map_err(|e| ImportError::io(file_path, e).into())
	}

	pub fn read_to_string(&self, file_path: &Path) -> Result<String, Error> {
		fs::read_to_string(file_path)
			.map_err(|e| ImportError::io(file_path, e).into())
	}

	/// Marks a file as being read. Returns its canonical path, or None if
	/// it was already read through another include. Errors if the file is
	/// one of its own includers.
	pub fn enter_file(
		&mut self,
		file_path: &Path,
	) -> Result<Option<PathBuf>, Error> {
		let canonical = fs::canonicalize(file_path)
			.map_err(|e| ImportError::io(file_path, e))?;

		if self.include_stack.contains(&canonical) {
			bail!("Circular file includes: {}", canonical.display())
		}
		if !self.included_files.insert(canonical.clone()) {
			return Ok(None);
		}

		self.include_stack.push(canonical.clone());
		Ok(Some(canonical))
	}

	/// Pairs with a successful `enter_file`.
	pub fn leave_file(&mut self) {
		self.include_stack.pop();
	}

	/// Locates and parses the config. With no explicit path, looks in the
	/// working directory first and then under the home directory.
	pub fn get_config(
		&self,
		custom_config_path: Option<&String>,
	) -> Result<(Config, PathBuf), Error> {
		let config_path = match custom_config_path {
			Some(p) => PathBuf::from(p),
			None => {
				let mut candidates = vec![PathBuf::from(LOCAL_CONFIG)];
				if let Some(home) = home_dir() {
					candidates.push(home.join(HOME_CONFIG));
				}

				match candidates.iter().find(|c| c.exists()) {
					Some(found) => found.clone(),
					None => {
						let searched: Vec<String> = candidates
							.iter()
							.map(|c| c.display().to_string())
							.collect();
						return Err(ImportError::config(
							LOCAL_CONFIG,
							format!(
								"can't find config file, looked in: {}",
								searched.join(", ")
							),
						)
						.into());
					},
				}
			},
		};

		let content = self.read_to_string(&config_path)?;
		let config: Config = toml::from_str(&content).map_err(|e| {
			ImportError::config(
				&config_path,
				format!("failed to parse config: {}", e),
			)
		})?;

		Ok((config, config_path))
	}
}

/// Resolves a path named inside `including` relative to that file's folder.
pub fn resolve_relative(including: &Path, named: &str) -> PathBuf {
	let named = Path::new(named);
	if named.is_absolute() {
		return named.to_path_buf();
	}
	match including.parent() {
		Some(parent) => parent.join(named),
		None => named.to_path_buf(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_enter_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("main.ledger");
		fs::write(&path, "").unwrap();
		let mut filesystem = Filesystem::new();

		let canonical = filesystem.enter_file(&path).unwrap();
		assert_eq!(canonical, Some(fs::canonicalize(&path).unwrap()));
		// still open: a cycle
		assert!(filesystem.enter_file(&path).is_err());

		filesystem.leave_file();
		// finished: just skipped
		assert_eq!(filesystem.enter_file(&path).unwrap(), None);
	}

	#[test]
	fn test_enter_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		let mut filesystem = Filesystem::new();
		assert!(filesystem.enter_file(&dir.path().join("nope")).is_err());
	}

	#[test]
	fn test_resolve_relative() {
		assert_eq!(
			resolve_relative(Path::new("books/main.ledger"), "2024.ledger"),
			PathBuf::from("books/2024.ledger")
		);
		assert_eq!(
			resolve_relative(Path::new("books/main.ledger"), "/abs.ledger"),
			PathBuf::from("/abs.ledger")
		);
	}

	#[test]
	fn test_get_config_explicit_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[accounts.\"Assets:Bank\"]\ndate = 1").unwrap();
		let path = file.path().to_string_lossy().to_string();

		let (config, found) = Filesystem::new().get_config(Some(&path)).unwrap();
		assert_eq!(found, PathBuf::from(&path));
		assert_eq!(config.accounts["Assets:Bank"].date, Some(1));
	}

	#[test]
	fn test_get_config_unparseable() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "this is not toml").unwrap();
		let path = file.path().to_string_lossy().to_string();

		assert!(Filesystem::new().get_config(Some(&path)).is_err());
	}
}
