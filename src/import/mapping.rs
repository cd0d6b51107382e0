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
use anyhow::Error;
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use regex::Regex;
use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

const TRANSFER_TO_KEY: &str = "transfer_to=";
const FILE_KEY: &str = "file=";

/// What a mapping row matches a description against. Persisted as the raw
/// description for literals, or wrapped in slashes for regexes. A literal
/// that itself looks slash-wrapped is persisted as an anchored, escaped
/// regex so it reads back as the same exact match.
#[derive(Clone, Debug)]
pub enum Pattern {
	Literal(String),
	Regex(Regex),
}

impl Pattern {
	pub fn parse(raw: &str) -> Result<Pattern, regex::Error> {
		let raw = raw.trim();
		if is_slash_wrapped(raw) {
			Ok(Pattern::Regex(Regex::new(&raw[1..raw.len() - 1])?))
		} else {
			Ok(Pattern::Literal(raw.to_string()))
		}
	}
}

fn is_slash_wrapped(raw: &str) -> bool {
	raw.len() >= 2 && raw.starts_with('/') && raw.ends_with('/')
}

impl fmt::Display for Pattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Pattern::Literal(s) if is_slash_wrapped(s) => {
				write!(f, "/^{}$/", regex::escape(s))
			},
			Pattern::Literal(s) => write!(f, "{}", s),
			Pattern::Regex(re) => write!(f, "/{}/", re.as_str()),
		}
	}
}

/// A persisted association from a description pattern to a classification.
#[derive(Clone, Debug)]
pub struct MappingRule {
	pub pattern: Pattern,
	pub payee: String,
	pub account: String,
	pub tags: Vec<String>,
	pub transfer_to: Option<String>,
	pub transfer_to_target: Option<PathBuf>,
}

impl MappingRule {
	/// Columns: pattern, payee, account, then any number of tags, then the
	/// optional `transfer_to=` and `file=` keyed columns.
	fn from_record(record: &StringRecord) -> Result<MappingRule, regex::Error> {
		let mut rule = MappingRule {
			pattern: Pattern::parse(&record[0])?,
			payee: record[1].to_string(),
			account: record.get(2).unwrap_or_default().to_string(),
			tags: vec![],
			transfer_to: None,
			transfer_to_target: None,
		};

		for column in record.iter().skip(3) {
			if let Some(account) = column.strip_prefix(TRANSFER_TO_KEY) {
				rule.transfer_to = Some(account.trim().to_string());
			} else if let Some(path) = column.strip_prefix(FILE_KEY) {
				rule.transfer_to_target = Some(PathBuf::from(path.trim()));
			} else if !column.is_empty() {
				rule.tags.push(column.to_string());
			}
		}

		Ok(rule)
	}

	fn to_record(&self) -> Vec<String> {
		let mut record =
			vec![self.pattern.to_string(), self.payee.clone(), self.account.clone()];
		record.extend(self.tags.iter().cloned());
		if let Some(transfer_to) = &self.transfer_to {
			record.push(format!("{}{}", TRANSFER_TO_KEY, transfer_to));
		}
		if let Some(target) = &self.transfer_to_target {
			record.push(format!("{}{}", FILE_KEY, target.display()));
		}
		record
	}
}

/// Ordered list of mapping rules backed by a flat CSV file. Rules stay in
/// file order; the program only ever appends.
pub struct MappingStore {
	path: PathBuf,
	rules: Vec<MappingRule>,
}

impl MappingStore {
	/// Reads every row with at least two columns. A missing file is an empty
	/// store, so the first run can start from nothing; a regex that does not
	/// compile stops the load.
	pub fn load(path: &Path) -> Result<MappingStore, Error> {
		let mut store = MappingStore {
			path: path.to_path_buf(),
			rules: vec![],
		};

		let file = match OpenOptions::new().read(true).open(path) {
			Ok(file) => file,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				log::info!(
					"mapping file {} does not exist yet, starting empty",
					path.display()
				);
				return Ok(store);
			},
			Err(e) => return Err(ImportError::io(path, e).into()),
		};

		let mut reader = ReaderBuilder::new()
			.has_headers(false)
			.flexible(true)
			.trim(Trim::All)
			.from_reader(file);

		for record in reader.records() {
			let record = record.map_err(|e| csv_to_io(path, e))?;
			if record.len() < 2 {
				continue;
			}

			let rule = MappingRule::from_record(&record).map_err(|source| {
				ImportError::MalformedRule {
					file: path.to_path_buf(),
					row: record.iter().collect::<Vec<_>>().join(","),
					source,
				}
			})?;
			store.rules.push(rule);
		}

		log::info!(
			"loaded {} mapping rules from {}",
			store.rules.len(),
			path.display()
		);
		Ok(store)
	}

	pub fn rules(&self) -> &[MappingRule] {
		&self.rules
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Adds the rule to the end of the list and writes it as one new row.
	/// Identical rules are not collapsed; the last one simply wins.
	pub fn append(&mut self, rule: MappingRule) -> Result<(), Error> {
		append_row(&self.path, &rule)?;
		self.rules.push(rule);
		Ok(())
	}
}

/// Opens the file in append mode, writes a single row and closes it again
/// before returning, so an interrupt later on can't lose the row.
pub fn append_row(path: &Path, rule: &MappingRule) -> Result<(), Error> {
	let file = OpenOptions::new()
		.append(true)
		.create(true)
		.open(path)
		.map_err(|e| ImportError::io(path, e))?;

	let mut writer = WriterBuilder::new()
		.has_headers(false)
		.flexible(true)
		.from_writer(file);
	writer
		.write_record(rule.to_record())
		.map_err(|e| csv_to_io(path, e))?;
	writer.flush().map_err(|e| ImportError::io(path, e))?;

	Ok(())
}

fn csv_to_io(path: &Path, e: csv::Error) -> ImportError {
	ImportError::io(path, io::Error::new(io::ErrorKind::InvalidData, e))
}
