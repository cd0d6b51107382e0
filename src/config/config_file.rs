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
use serde::Deserialize;
use std::collections::BTreeMap;

/// Raw contents of the config file. Every field is optional here; the
/// validated form is `Settings`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub accounts: BTreeMap<String, AccountSection>,
}

/// One `[accounts."<ledger account>"]` table, describing how to read a
/// single bank's CSV export.
#[derive(Debug, Default, Deserialize)]
pub struct AccountSection {
	/// Ledger account of the statement; defaults to the section name.
	pub account: Option<String>,

	// 1-based column numbers
	pub date: Option<i64>,
	pub effective_date: Option<i64>,
	pub desc: Option<i64>,
	pub credit: Option<i64>,
	pub debit: Option<i64>,

	pub csv_date_format: Option<String>,
	pub ledger_date_format: Option<String>,
	pub csv_decimal_comma: Option<bool>,
	pub ledger_decimal_comma: Option<bool>,

	pub currency: Option<String>,
	pub cleared_character: Option<String>,
	pub default_expense: Option<String>,
	pub skip_lines: Option<usize>,
	pub delimiter: Option<String>,
	pub reverse: Option<bool>,

	pub mapping_file: Option<String>,
	pub ledger_file: Option<String>,
	pub accounts_file: Option<String>,
	pub template_file: Option<String>,

	pub quiet: Option<bool>,
	pub tags: Option<bool>,
	pub skip_dupes: Option<bool>,
	pub confirm_dupes: Option<bool>,
	pub confirm_mapping: Option<bool>,
	pub entry_review: Option<bool>,

	/// Extra columns exposed to mappings and templates as `addon_<name>`.
	#[serde(default)]
	pub addons: BTreeMap<String, usize>,
}
