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
use crate::import::matcher::Classification;
use anyhow::{anyhow, bail, Error};
use std::collections::BTreeMap;
use std::path::Path;

const DEFAULT_TEMPLATE: &str = "\
{date} {cleared_character} {payee}
    ; MD5Sum: {md5sum}
    ; CSV: {csv}
{tag_lines}    {debit_account:<60}    {debit_currency} {debit}
    {credit_account:<60}    {credit_currency} {credit}";

/// Turns classified entries into journal text. Placeholders are `{name}`,
/// optionally padded with `{name:<N}` or `{name:>N}`; `{{` and `}}` are
/// literal braces.
pub struct JournalRenderer {
	template: String,
	is_default: bool,
}

impl JournalRenderer {
	pub fn new(template_file: Option<&Path>) -> Result<Self, Error> {
		match template_file {
			None => Ok(Self {
				template: DEFAULT_TEMPLATE.to_string(),
				is_default: true,
			}),
			Some(path) => {
				let template = std::fs::read_to_string(path)
					.map_err(|e| ImportError::io(path, e))?;
				Ok(Self {
					template: template.trim_end().to_string(),
					is_default: false,
				})
			},
		}
	}

	/// The entry against the statement account.
	pub fn render(
		&self,
		entry: &Entry,
		classification: &Classification,
	) -> Result<String, Error> {
		let fields = self.fields(
			entry,
			classification,
			&classification.account,
			&entry.csv_account,
		);
		format(&self.template, &fields)
	}

	/// The mirror entry for a mapping with `transfer_to`, moving the same
	/// amounts from the classified account into the transfer account.
	pub fn render_transfer(
		&self,
		entry: &Entry,
		classification: &Classification,
	) -> Result<Option<String>, Error> {
		let Some(transfer_to) = &classification.transfer_to else {
			return Ok(None);
		};

		let fields =
			self.fields(entry, classification, transfer_to, &classification.account);
		format(&self.template, &fields).map(Some)
	}

	fn fields(
		&self,
		entry: &Entry,
		classification: &Classification,
		debit_account: &str,
		credit_account: &str,
	) -> BTreeMap<String, String> {
		let currency_if = |amount: &str| {
			if amount.is_empty() {
				String::new()
			} else {
				entry.currency.clone()
			}
		};

		let tags = classification.tags.join("\n    ; ");
		let tag_lines = if self.is_default && !tags.is_empty() {
			format!("    ; {}\n", tags)
		} else {
			String::new()
		};

		let mut fields: BTreeMap<String, String> = [
			("date", entry.date.clone()),
			("effective_date", entry.effective_date.clone()),
			("cleared_character", entry.cleared_character.clone()),
			("payee", classification.payee.clone()),
			("transaction_index", entry.index.to_string()),
			("debit_account", debit_account.to_string()),
			("debit_currency", currency_if(&entry.debit)),
			("debit", entry.debit.clone()),
			("credit_account", credit_account.to_string()),
			("credit_currency", currency_if(&entry.credit)),
			("credit", entry.credit.clone()),
			("tags", tags),
			("tag_lines", tag_lines),
			("md5sum", entry.md5sum.clone()),
			("csv", entry.csv.clone()),
			(
				"transfer_to",
				classification.transfer_to.clone().unwrap_or_default(),
			),
		]
		.into_iter()
		.map(|(k, v)| (k.to_string(), v))
		.collect();

		fields.extend(entry.addons.clone());
		fields
	}
}

/// Fills in the template and strips trailing whitespace from every line, so
/// empty amount columns do not leave padding behind.
fn format(
	template: &str,
	fields: &BTreeMap<String, String>,
) -> Result<String, Error> {
	let mut out = String::with_capacity(template.len() * 2);
	let mut chars = template.chars().peekable();

	while let Some(c) = chars.next() {
		match c {
			'{' if chars.peek() == Some(&'{') => {
				chars.next();
				out.push('{');
			},
			'}' if chars.peek() == Some(&'}') => {
				chars.next();
				out.push('}');
			},
			'{' => {
				let mut spec = String::new();
				loop {
					match chars.next() {
						Some('}') => break,
						Some(c) => spec.push(c),
						None => bail!("unterminated placeholder in template"),
					}
				}
				out.push_str(&placeholder(&spec, fields)?);
			},
			'}' => bail!("single '}}' in template"),
			_ => out.push(c),
		}
	}

	Ok(out
		.lines()
		.map(str::trim_end)
		.collect::<Vec<_>>()
		.join("\n"))
}

fn placeholder(
	spec: &str,
	fields: &BTreeMap<String, String>,
) -> Result<String, Error> {
	let (name, format_spec) = match spec.split_once(':') {
		Some((name, format_spec)) => (name, format_spec),
		None => (spec, ""),
	};

	let Some(value) = fields.get(name) else {
		bail!("unknown placeholder '{{{}}}' in template", name);
	};

	let (right_align, width) = match format_spec.chars().next() {
		Some('<') => (false, &format_spec[1..]),
		Some('>') => (true, &format_spec[1..]),
		_ => (false, format_spec),
	};
	if width.is_empty() {
		return Ok(value.clone());
	}

	let width: usize = width
		.parse()
		.map_err(|_| anyhow!("invalid width in '{{{}}}'", spec))?;
	Ok(if right_align {
		format!("{:>width$}", value, width = width)
	} else {
		format!("{:<width$}", value, width = width)
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::import::entry::tests::entry_from;

	fn classification(payee: &str, account: &str) -> Classification {
		Classification {
			payee: payee.to_string(),
			account: account.to_string(),
			tags: vec![],
			transfer_to: None,
			transfer_to_target: None,
		}
	}

	#[test]
	fn test_default_template() {
		let entry = entry_from("15/03/2019;SHOP PURCHASE;;-92,90;EUR");
		let renderer = JournalRenderer::new(None).unwrap();

		let text = renderer
			.render(&entry, &classification("My Shop", "Expenses:Dining"))
			.unwrap();

		let expected = format!(
			"15/03/2019 * My Shop\n    \
			 ; MD5Sum: {}\n    \
			 ; CSV: 15/03/2019;SHOP PURCHASE;;-92,90;EUR\n    \
			 Expenses:Dining\n    \
			 Assets:Bank:Current{}-92.90",
			entry.md5sum,
			" ".repeat(60 - "Assets:Bank:Current".len() + 5)
		);
		assert_eq!(text, expected);
	}

	#[test]
	fn test_default_template_with_tags() {
		let entry = entry_from("15/03/2019;SHOP PURCHASE;;-92,90;EUR");
		let mut c = classification("My Shop", "Expenses:Dining");
		c.tags = vec![":food:".to_string(), ":weekly:".to_string()];

		let text = JournalRenderer::new(None).unwrap().render(&entry, &c).unwrap();
		let lines: Vec<&str> = text.lines().collect();
		assert_eq!(lines[3], "    ; :food:");
		assert_eq!(lines[4], "    ; :weekly:");
		assert_eq!(lines[5], "    Expenses:Dining");
	}

	#[test]
	fn test_transfer_entry() {
		let entry = entry_from("17/03/2019;TRANSFER SENT SAVINGS ACC;;-100,00;EUR");
		let mut c = classification("Savings", "Transfers:Savings");
		let renderer = JournalRenderer::new(None).unwrap();
		assert_eq!(renderer.render_transfer(&entry, &c).unwrap(), None);

		c.transfer_to = Some("Assets:Bank:Savings".to_string());
		let text = renderer.render_transfer(&entry, &c).unwrap().unwrap();
		let lines: Vec<&str> = text.lines().collect();
		assert_eq!(lines[3], "    Assets:Bank:Savings");
		assert!(lines[4].starts_with("    Transfers:Savings "));
		assert!(lines[4].ends_with(" -100.00"));
	}

	#[test]
	fn test_custom_template() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("template.txt");
		std::fs::write(
			&path,
			"{date} ({transaction_index}) {payee} {{x}}\n  \
			 {debit_account}  {credit:>8} [{addon_category}]\n",
		)
		.unwrap();
		let renderer = JournalRenderer::new(Some(path.as_path())).unwrap();

		let mut entry = entry_from("15/03/2019;SHOP PURCHASE;;-92,90;EUR");
		entry
			.addons
			.insert("addon_category".to_string(), "FOOD".to_string());
		let text = renderer
			.render(&entry, &classification("My Shop", "Expenses:Dining"))
			.unwrap();

		assert_eq!(
			text,
			"15/03/2019 (1) My Shop {x}\n  Expenses:Dining    -92.90 [FOOD]"
		);
	}

	#[test]
	fn test_unknown_placeholder() {
		let fields = BTreeMap::new();
		assert!(format("{nope}", &fields).is_err());
		assert!(format("{unterminated", &fields).is_err());
		assert!(format("stray }", &fields).is_err());
	}
}
