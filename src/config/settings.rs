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
use crate::config::config_file::{AccountSection, Config};
use crate::error::ImportError;
use crate::Cli;
use anyhow::Error;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_EXPENSE: &str = "Expenses:Unknown";
pub const DEFAULT_CLEARED_CHARACTER: &str = "*";
pub const DEFAULT_SKIP_LINES: usize = 1;

/// What to do with a transaction whose fingerprint is already known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DuplicatePolicy {
	/// Import it anyway.
	Ignore,
	/// Drop it without asking.
	Skip,
	/// Ask whether to drop it.
	Confirm,
}

/// Fully validated settings for one import run. Built once from the config
/// file section and the command line; nothing downstream looks at either.
#[derive(Clone, Debug)]
pub struct Settings {
	/// Ledger account the statement belongs to, e.g. Assets:Bank:Current
	pub account: String,

	// 1-based column numbers; None means the column is not present
	pub date_column: usize,
	pub effective_date_column: Option<usize>,
	pub desc_column: usize,
	pub credit_column: Option<usize>,
	pub debit_column: Option<usize>,
	pub addons: BTreeMap<String, usize>,

	pub csv_date_format: String,
	pub ledger_date_format: String,
	pub csv_decimal_comma: bool,
	pub ledger_decimal_comma: bool,

	pub currency: String,
	pub cleared_character: String,
	pub default_expense: String,
	pub skip_lines: usize,
	pub delimiter: Option<u8>,
	pub reverse: bool,

	pub mapping_file: PathBuf,
	pub ledger_file: Option<PathBuf>,
	pub accounts_file: Option<PathBuf>,
	pub template_file: Option<PathBuf>,

	pub quiet: bool,
	pub tags: bool,
	pub duplicates: DuplicatePolicy,
	pub confirm_mapping: bool,
	pub entry_review: bool,
}

impl Settings {
	/// Picks the section for the account named on the command line and
	/// validates it, applying command line overrides on top.
	pub fn resolve(
		mut config: Config,
		config_path: &Path,
		args: &Cli,
	) -> Result<Settings, Error> {
		let section = config.accounts.remove(&args.account).ok_or_else(|| {
			ImportError::config(
				config_path,
				format!("no section for account '{}'", args.account),
			)
		})?;

		Settings::from_section(section, &args.account, config_path, args)
	}

	fn from_section(
		section: AccountSection,
		name: &str,
		config_path: &Path,
		args: &Cli,
	) -> Result<Settings, Error> {
		let missing = |key: &str| {
			ImportError::config(
				config_path,
				format!("section '{}' does not contain option {}", name, key),
			)
		};

		let not_a_column = |key: &str| {
			ImportError::config(
				config_path,
				format!("option {} must be a column starting at 1", key),
			)
		};

		let date_column =
			required_column(section.date, "date", &missing, &not_a_column)?;
		let desc_column =
			required_column(section.desc, "desc", &missing, &not_a_column)?;
		let credit_column = section.credit.ok_or_else(|| missing("credit"))?;
		let debit_column = section.debit.ok_or_else(|| missing("debit"))?;

		let mapping_file = args
			.mapping_file
			.clone()
			.or(section.mapping_file)
			.ok_or_else(|| missing("mapping_file"))?;

		let delimiter = match section.delimiter.as_deref() {
			None => None,
			Some("\\t") => Some(b'\t'),
			Some(d) if d.len() == 1 => Some(d.as_bytes()[0]),
			Some(d) => {
				return Err(ImportError::config(
					config_path,
					format!("delimiter must be a single character, got '{}'", d),
				)
				.into())
			},
		};

		let skip_dupes = args.skip_dupes || section.skip_dupes.unwrap_or(false);
		let confirm_dupes =
			args.confirm_dupes || section.confirm_dupes.unwrap_or(false);
		let duplicates = match (skip_dupes, confirm_dupes) {
			(true, true) => {
				return Err(ImportError::config(
					config_path,
					"skip_dupes and confirm_dupes cannot both be set",
				)
				.into())
			},
			(true, false) => DuplicatePolicy::Skip,
			(false, true) => DuplicatePolicy::Confirm,
			(false, false) => DuplicatePolicy::Ignore,
		};

		for (addon, column) in &section.addons {
			if *column == 0 {
				return Err(ImportError::config(
					config_path,
					format!("addon '{}' must name a column starting at 1", addon),
				)
				.into());
			}
		}

		Ok(Settings {
			account: section.account.unwrap_or_else(|| name.to_string()),
			date_column,
			effective_date_column: optional_column(section.effective_date),
			desc_column,
			credit_column: optional_column(Some(credit_column)),
			debit_column: optional_column(Some(debit_column)),
			addons: section.addons,
			csv_date_format: section.csv_date_format.unwrap_or_default(),
			ledger_date_format: section.ledger_date_format.unwrap_or_default(),
			csv_decimal_comma: section.csv_decimal_comma.unwrap_or(false),
			ledger_decimal_comma: section.ledger_decimal_comma.unwrap_or(false),
			currency: section.currency.unwrap_or_default(),
			cleared_character: section
				.cleared_character
				.unwrap_or(DEFAULT_CLEARED_CHARACTER.to_string()),
			default_expense: section
				.default_expense
				.unwrap_or(DEFAULT_EXPENSE.to_string()),
			skip_lines: section.skip_lines.unwrap_or(DEFAULT_SKIP_LINES),
			delimiter,
			reverse: args.reverse || section.reverse.unwrap_or(false),
			mapping_file: PathBuf::from(mapping_file),
			ledger_file: args
				.ledger_file
				.clone()
				.or(section.ledger_file)
				.map(PathBuf::from),
			accounts_file: args
				.accounts_file
				.clone()
				.or(section.accounts_file)
				.map(PathBuf::from),
			template_file: args
				.template_file
				.clone()
				.or(section.template_file)
				.map(PathBuf::from),
			quiet: args.quiet || section.quiet.unwrap_or(false),
			tags: args.tags || section.tags.unwrap_or(false),
			duplicates,
			confirm_mapping: args.confirm_mapping
				|| section.confirm_mapping.unwrap_or(false),
			entry_review: args.entry_review
				|| section.entry_review.unwrap_or(false),
		})
	}
}

/// Columns are 1-based; zero or negative means "not present".
fn optional_column(column: Option<i64>) -> Option<usize> {
	match column {
		Some(c) if c > 0 => Some(c as usize),
		_ => None,
	}
}

fn required_column<F, G>(
	column: Option<i64>,
	key: &str,
	missing: &F,
	not_a_column: &G,
) -> Result<usize, ImportError>
where
	F: Fn(&str) -> ImportError,
	G: Fn(&str) -> ImportError,
{
	let column = column.ok_or_else(|| missing(key))?;
	optional_column(Some(column)).ok_or_else(|| not_a_column(key))
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;

	const CONFIG: &str = r#"
[accounts."Assets:Bank:Current"]
date = 1
desc = 2
credit = 4
debit = 0
mapping_file = "mappings.csv"
delimiter = ";"
csv_decimal_comma = true

[accounts."Assets:Bank:Current".addons]
category = 6
"#;

	fn cli(extra: &[&str]) -> Cli {
		let args = [vec!["ledgerize"], extra.to_vec()].concat();
		Cli::parse_from(args)
	}

	fn parse(content: &str) -> Config {
		toml::from_str(content).unwrap()
	}

	#[test]
	fn test_resolve_defaults() {
		let settings =
			Settings::resolve(parse(CONFIG), Path::new("c.toml"), &cli(&[]))
				.unwrap();

		assert_eq!(settings.account, "Assets:Bank:Current");
		assert_eq!(settings.date_column, 1);
		assert_eq!(settings.credit_column, Some(4));
		assert_eq!(settings.debit_column, None);
		assert_eq!(settings.delimiter, Some(b';'));
		assert_eq!(settings.default_expense, DEFAULT_EXPENSE);
		assert_eq!(settings.cleared_character, "*");
		assert_eq!(settings.skip_lines, 1);
		assert_eq!(settings.addons.get("category"), Some(&6));
		assert_eq!(settings.duplicates, DuplicatePolicy::Ignore);
		assert!(!settings.quiet);
	}

	#[test]
	fn test_cli_overrides() {
		let settings = Settings::resolve(
			parse(CONFIG),
			Path::new("c.toml"),
			&cli(&["-q", "--skip-dupes", "-m", "other.csv"]),
		)
		.unwrap();

		assert!(settings.quiet);
		assert_eq!(settings.duplicates, DuplicatePolicy::Skip);
		assert_eq!(settings.mapping_file, PathBuf::from("other.csv"));
	}

	#[test]
	fn test_missing_section() {
		let err = Settings::resolve(
			parse(CONFIG),
			Path::new("c.toml"),
			&cli(&["-a", "Assets:Other"]),
		)
		.unwrap_err();

		assert!(matches!(
			err.downcast_ref::<ImportError>(),
			Some(ImportError::Config { .. })
		));
	}

	#[test]
	fn test_missing_required_key() {
		let config = parse(
			r#"
[accounts."Assets:Bank:Current"]
date = 1
desc = 2
credit = 3
debit = 4
"#,
		);
		let err = Settings::resolve(config, Path::new("c.toml"), &cli(&[]))
			.unwrap_err();

		assert!(err.to_string().contains("mapping_file"));
	}

	#[test]
	fn test_conflicting_duplicate_policies() {
		let config = parse(&CONFIG.replace(
			"csv_decimal_comma = true",
			"csv_decimal_comma = true\nconfirm_dupes = true",
		));
		let result = Settings::resolve(
			config,
			Path::new("c.toml"),
			&cli(&["--skip-dupes"]),
		);

		assert!(result.is_err());
	}

	#[test]
	fn test_required_column_must_be_positive() {
		let config = parse(&CONFIG.replace("date = 1", "date = 0"));
		let err = Settings::resolve(config, Path::new("c.toml"), &cli(&[]))
			.unwrap_err();

		let message = err.to_string();
		assert!(message.contains("option date must be a column starting at 1"));
		assert!(!message.contains("does not contain"));
	}
}
