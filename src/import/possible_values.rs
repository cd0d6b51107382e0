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
use crate::import::mapping::MappingRule;
use anyhow::{bail, Error};
use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;

/// Values offered for tab completion. Only ever grows; nothing here affects
/// how transactions are classified.
#[derive(Debug, Default)]
pub struct PossibleValues {
	pub payees: BTreeSet<String>,
	pub accounts: BTreeSet<String>,
	pub tags: BTreeSet<String>,
}

impl PossibleValues {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_rules(&mut self, rules: &[MappingRule]) {
		for rule in rules {
			self.payees.insert(rule.payee.clone());
			if !rule.account.is_empty() {
				self.accounts.insert(rule.account.clone());
			}
			self.tags.extend(rule.tags.iter().cloned());
		}
	}

	pub fn observe(&mut self, payee: &str, account: &str, tags: &[String]) {
		self.payees.insert(payee.to_string());
		self.accounts.insert(account.to_string());
		self.tags.extend(tags.iter().cloned());
	}

	/// Asks the `ledger` binary for the payees and accounts it knows about.
	/// This is only for convenience, so failures are logged and ignored.
	pub fn add_from_ledger(&mut self, ledger_file: &Path) {
		for (command, target) in [
			("accounts", &mut self.accounts),
			("payees", &mut self.payees),
		] {
			match query_ledger(ledger_file, command) {
				Ok(values) => target.extend(values),
				Err(e) => log::warn!(
					"could not read {} from {}: {}",
					command,
					ledger_file.display(),
					e
				),
			}
		}
	}

	/// Reads `account NAME` declarations, one per line.
	pub fn add_from_accounts_file(&mut self, path: &Path) -> Result<(), Error> {
		let content = std::fs::read_to_string(path)
			.map_err(|e| ImportError::io(path, e))?;

		for line in content.lines() {
			if let Some(account) = line.trim().strip_prefix("account ") {
				let account = account.split(';').next().unwrap_or_default();
				if !account.trim().is_empty() {
					self.accounts.insert(account.trim().to_string());
				}
			}
		}

		Ok(())
	}
}

fn query_ledger(ledger_file: &Path, command: &str) -> Result<Vec<String>, Error> {
	let output = Command::new("ledger")
		.arg("-f")
		.arg(ledger_file)
		.arg(command)
		.output()?;

	if !output.status.success() {
		bail!(
			"ledger exited with {}: {}",
			output.status,
			String::from_utf8_lossy(&output.stderr).trim()
		);
	}

	Ok(String::from_utf8_lossy(&output.stdout)
		.lines()
		.map(str::trim)
		.filter(|l| !l.is_empty())
		.map(String::from)
		.collect())
}
