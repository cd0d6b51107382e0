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
use crate::config::settings::Settings;
use anyhow::{anyhow, bail, Error};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// One transaction read from a CSV row, with everything normalized that the
/// classifier and the journal template need.
#[derive(Clone, Debug)]
pub struct Entry {
	/// 1-based position within the input, after skipped lines
	pub index: usize,
	pub date: String,
	pub effective_date: String,
	pub desc: String,
	pub credit: String,
	pub debit: String,
	/// Ledger account of the statement itself
	pub csv_account: String,
	pub currency: String,
	pub cleared_character: String,
	/// The raw CSV line, trimmed
	pub csv: String,
	/// `addon_<name>` -> value
	pub addons: BTreeMap<String, String>,
	pub md5sum: String,
}

impl Entry {
	pub fn from_row(
		fields: &[String],
		raw: &str,
		settings: &Settings,
		index: usize,
	) -> Result<Entry, Error> {
		let column = |n: usize| -> Result<String, Error> {
			fields.get(n - 1).map(|f| f.trim().to_string()).ok_or_else(|| {
				anyhow!("row {} has no column {}: {}", index, n, raw.trim())
			})
		};
		let optional_column = |n: Option<usize>| -> Result<String, Error> {
			match n {
				Some(n) => column(n),
				None => Ok(String::new()),
			}
		};

		let mut addons = BTreeMap::new();
		for (name, n) in &settings.addons {
			addons.insert(format!("addon_{}", name), column(*n)?);
		}

		let date = convert_date(&column(settings.date_column)?, settings)
			.map_err(|e| anyhow!("{} (row {})", e, index))?;
		let effective_date = match settings.effective_date_column {
			Some(n) => convert_date(&column(n)?, settings)
				.map_err(|e| anyhow!("{} (row {})", e, index))?,
			None => String::new(),
		};

		let desc = column(settings.desc_column)?;
		let credit = convert_amount(
			&optional_column(settings.credit_column)?,
			settings.csv_decimal_comma,
			settings.ledger_decimal_comma,
		);
		let debit = convert_amount(
			&optional_column(settings.debit_column)?,
			settings.csv_decimal_comma,
			settings.ledger_decimal_comma,
		);

		let md5sum =
			fingerprint(&date, &desc, &credit, &debit, &settings.account);

		Ok(Entry {
			index,
			date,
			effective_date,
			desc,
			credit,
			debit,
			csv_account: settings.account.clone(),
			currency: settings.currency.clone(),
			cleared_character: settings.cleared_character.clone(),
			csv: raw.trim().to_string(),
			addons,
			md5sum,
		})
	}

	/// One-line summary shown before prompting about this entry.
	pub fn prompt(&self) -> String {
		let amount = if !self.credit.is_empty() {
			self.credit.clone()
		} else {
			format!("-{}", self.debit)
		};
		format!("{} {:<40} {}", self.date, self.desc, amount)
	}
}

/// Hex md5 over the fields that identify a transaction. The raw line is left
/// out on purpose so reformatted exports still produce the same value.
pub fn fingerprint(
	date: &str,
	desc: &str,
	credit: &str,
	debit: &str,
	account: &str,
) -> String {
	let content = [date, desc, credit, debit, account]
		.map(str::trim)
		.join("\n");
	format!("{:x}", md5::compute(content.as_bytes()))
}

fn convert_date(value: &str, settings: &Settings) -> Result<String, Error> {
	if settings.csv_date_format == settings.ledger_date_format
		|| settings.csv_date_format.is_empty()
	{
		return Ok(value.to_string());
	}

	let date = NaiveDate::parse_from_str(value, &settings.csv_date_format)
		.map_err(|e| {
			anyhow!(
				"date '{}' does not match format '{}': {}",
				value,
				settings.csv_date_format,
				e
			)
		})?;

	if settings.ledger_date_format.is_empty() {
		bail!("csv_date_format is set but ledger_date_format is not");
	}
	Ok(date.format(&settings.ledger_date_format).to_string())
}

/// Normalizes an amount to a dot decimal separator without thousands
/// separators, then switches to a comma separator if the ledger wants one.
fn convert_amount(value: &str, csv_comma: bool, ledger_comma: bool) -> String {
	let mut value = value.trim().to_string();
	if csv_comma {
		value = value.replace('.', "").replace(',', ".");
	} else {
		value = value.replace(',', "");
	}
	if ledger_comma {
		value = value.replace('.', ",");
	}
	value
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::config::settings::{DuplicatePolicy, Settings};
	use std::path::PathBuf;

	/// Settings matching a `DATE;DESC;;AMOUNT;CURRENCY` export.
	pub(crate) fn settings() -> Settings {
		Settings {
			account: "Assets:Bank:Current".to_string(),
			date_column: 1,
			effective_date_column: None,
			desc_column: 2,
			credit_column: Some(4),
			debit_column: None,
			addons: BTreeMap::new(),
			csv_date_format: String::new(),
			ledger_date_format: String::new(),
			csv_decimal_comma: true,
			ledger_decimal_comma: false,
			currency: String::new(),
			cleared_character: "*".to_string(),
			default_expense: "Expenses:Unknown".to_string(),
			skip_lines: 0,
			delimiter: Some(b';'),
			reverse: false,
			mapping_file: PathBuf::from("mappings.csv"),
			ledger_file: None,
			accounts_file: None,
			template_file: None,
			quiet: true,
			tags: false,
			duplicates: DuplicatePolicy::Ignore,
			confirm_mapping: false,
			entry_review: false,
		}
	}

	pub(crate) fn entry_from(raw: &str) -> Entry {
		let fields: Vec<String> = raw.split(';').map(String::from).collect();
		Entry::from_row(&fields, raw, &settings(), 1).unwrap()
	}

	#[test]
	fn test_from_row() {
		let entry = entry_from("15/03/2019;SHOP PURCHASE;;-92,90;EUR");

		assert_eq!(entry.date, "15/03/2019");
		assert_eq!(entry.desc, "SHOP PURCHASE");
		assert_eq!(entry.credit, "-92.90");
		assert_eq!(entry.debit, "");
		assert_eq!(entry.csv_account, "Assets:Bank:Current");
		assert_eq!(entry.md5sum.len(), 32);
	}

	#[test]
	fn test_fingerprint_ignores_whitespace() {
		let tight = entry_from("15/03/2019;SHOP PURCHASE;;-92,90;EUR");
		let loose = entry_from("  15/03/2019 ; SHOP PURCHASE ;; -92,90 ;EUR  ");

		assert_ne!(tight.csv, loose.csv);
		assert_eq!(tight.md5sum, loose.md5sum);
	}

	#[test]
	fn test_fingerprint_depends_on_content() {
		let a = entry_from("15/03/2019;SHOP PURCHASE;;-92,90;EUR");
		let b = entry_from("15/03/2019;SHOP PURCHASE;;-92,91;EUR");
		assert_ne!(a.md5sum, b.md5sum);
	}

	#[test]
	fn test_date_conversion() {
		let mut settings = settings();
		settings.csv_date_format = "%d/%m/%Y".to_string();
		settings.ledger_date_format = "%Y/%m/%d".to_string();
		let fields: Vec<String> = "15/03/2019;X;;1,00"
			.split(';')
			.map(String::from)
			.collect();

		let entry = Entry::from_row(&fields, "", &settings, 1).unwrap();
		assert_eq!(entry.date, "2019/03/15");

		let bad: Vec<String> =
			"2019-03-15;X;;1,00".split(';').map(String::from).collect();
		assert!(Entry::from_row(&bad, "", &settings, 1).is_err());
	}

	#[test]
	fn test_missing_column() {
		let fields = vec!["15/03/2019".to_string(), "X".to_string()];
		assert!(Entry::from_row(&fields, "", &settings(), 3).is_err());
	}

	#[test]
	fn test_addons() {
		let mut settings = settings();
		settings.addons.insert("category".to_string(), 5);
		let fields: Vec<String> = "15/03/2019;X;;1,00;GROCERIES"
			.split(';')
			.map(String::from)
			.collect();

		let entry = Entry::from_row(&fields, "", &settings, 1).unwrap();
		assert_eq!(entry.addons["addon_category"], "GROCERIES");
	}

	#[test]
	fn test_convert_amount() {
		assert_eq!(convert_amount("1.234,56", true, false), "1234.56");
		assert_eq!(convert_amount("1,234.56", false, false), "1234.56");
		assert_eq!(convert_amount("1234.56", false, true), "1234,56");
		assert_eq!(convert_amount(" ", false, false), "");
	}

	#[test]
	fn test_prompt() {
		let entry = entry_from("15/03/2019;SHOP;;-92,90;EUR");
		assert!(entry.prompt().starts_with("15/03/2019 SHOP "));
		assert!(entry.prompt().ends_with(" -92.90"));
	}
}
