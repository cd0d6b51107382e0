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
use crate::config::settings::{DuplicatePolicy, Settings};
use crate::error::ImportError;
use crate::import::dedup::FingerprintIndex;
use crate::import::entry::Entry;
use crate::import::mapping::MappingStore;
use crate::import::matcher::Classification;
use crate::import::possible_values::PossibleValues;
use crate::import::prompter::Prompter;
use crate::import::resolver::{Resolution, Resolver};
use crate::parsing::csv_input::read_rows;
use crate::reports::journal::JournalRenderer;
use anyhow::Error;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Where the CSV comes from and where the journal goes; `None` means the
/// standard streams.
pub struct ImportPaths {
	pub input: Option<PathBuf>,
	pub output: Option<PathBuf>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
	pub committed: usize,
	pub skipped: usize,
}

/// The entry point for importing a statement: reads the CSV, classifies
/// each row in order and writes journal entries as soon as they are
/// decided, so an interrupted run keeps everything written before it.
pub fn import(
	settings: &Settings,
	paths: &ImportPaths,
	prompter: &mut dyn Prompter,
) -> Result<ImportSummary, Error> {
	let entries = read_entries(settings, paths.input.as_deref())?;

	let store = MappingStore::load(&settings.mapping_file)?;

	let mut values = PossibleValues::new();
	if let Some(ledger_file) = &settings.ledger_file {
		values.add_from_ledger(ledger_file);
	}
	if let Some(accounts_file) = &settings.accounts_file {
		values.add_from_accounts_file(accounts_file)?;
	}

	let seen = match (&settings.ledger_file, settings.duplicates) {
		(Some(ledger_file), DuplicatePolicy::Skip | DuplicatePolicy::Confirm) => {
			FingerprintIndex::from_ledger(ledger_file)?
		},
		_ => FingerprintIndex::new(),
	};

	let renderer = JournalRenderer::new(settings.template_file.as_deref())?;
	let mut resolver = Resolver::new(store, values, seen, settings);
	log::debug!(
		"{} payees and {} accounts known for completion",
		resolver.values().payees.len(),
		resolver.values().accounts.len()
	);
	let mut output = open_output(paths.output.as_deref())?;
	let output_name = paths
		.output
		.clone()
		.unwrap_or_else(|| PathBuf::from("<stdout>"));

	let mut summary = ImportSummary::default();
	for entry in &entries {
		let preview = |c: &Classification| renderer.render(entry, c);
		let classification = match resolver.resolve(entry, prompter, &preview)? {
			Resolution::Committed(c) => c,
			Resolution::Skipped(reason) => {
				log::info!("skipped row {} ({:?})", entry.index, reason);
				summary.skipped += 1;
				continue;
			},
		};

		let text = renderer.render(entry, &classification)?;
		write_entry(&mut output, &text)
			.map_err(|e| ImportError::io(&output_name, e))?;

		if let Some(transfer) = renderer.render_transfer(entry, &classification)?
		{
			match &classification.transfer_to_target {
				Some(target) => append_entry(target, &transfer)?,
				None => write_entry(&mut output, &transfer)
					.map_err(|e| ImportError::io(&output_name, e))?,
			}
		}

		summary.committed += 1;
	}

	log::info!(
		"imported {} entries, skipped {}",
		summary.committed,
		summary.skipped
	);
	Ok(summary)
}

fn read_entries(
	settings: &Settings,
	input: Option<&Path>,
) -> Result<Vec<Entry>, Error> {
	let content = match input {
		Some(path) => std::fs::read_to_string(path)
			.map_err(|e| ImportError::io(path, e))?,
		None => {
			let mut buf = String::new();
			io::stdin()
				.read_to_string(&mut buf)
				.map_err(|e| ImportError::io("<stdin>", e))?;
			buf
		},
	};

	let mut rows = read_rows(&content, settings.skip_lines, settings.delimiter)?;
	if settings.reverse {
		rows.reverse();
	}

	rows.iter()
		.enumerate()
		.map(|(i, row)| Entry::from_row(&row.fields, &row.raw, settings, i + 1))
		.collect()
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, Error> {
	Ok(match path {
		Some(path) => Box::new(BufWriter::new(
			File::create(path).map_err(|e| ImportError::io(path, e))?,
		)),
		None => Box::new(io::stdout()),
	})
}

/// Entries are separated by a blank line and flushed one at a time.
fn write_entry(output: &mut dyn Write, text: &str) -> io::Result<()> {
	write!(output, "{}\n\n", text)?;
	output.flush()
}

fn append_entry(path: &Path, text: &str) -> Result<(), Error> {
	let mut file = OpenOptions::new()
		.append(true)
		.create(true)
		.open(path)
		.map_err(|e| ImportError::io(path, e))?;
	write_entry(&mut file, text).map_err(|e| ImportError::io(path, e))?;
	Ok(())
}
