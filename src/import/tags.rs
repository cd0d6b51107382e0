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
use crate::import::prompter::Prompter;
use anyhow::Error;
use std::collections::BTreeSet;

/// Turns a bare word into a ledger tag (`food` -> `:food:`). Values that
/// already contain a colon or are bracketed are left alone.
pub fn tagify(value: &str) -> String {
	if !value.contains(':') && !(value.starts_with('[') && value.ends_with(']'))
	{
		format!(":{}:", value)
	} else {
		value.to_string()
	}
}

/// Edits a tag list one answer at a time until the user answers empty.
/// `-name` removes a tag, anything else adds it.
pub fn prompt_for_tags(
	prompter: &mut dyn Prompter,
	candidates: &BTreeSet<String>,
	initial: &[String],
) -> Result<Vec<String>, Error> {
	let mut tags = initial.to_vec();

	loop {
		let value = prompter.ask("Tag", &tags.join(", "), candidates)?;
		if value.is_empty() {
			return Ok(tags);
		}

		if let Some(removed) = value.strip_prefix('-') {
			let removed = tagify(removed);
			tags.retain(|t| t != &removed);
		} else {
			let added = tagify(&value);
			if !tags.contains(&added) {
				tags.push(added);
			}
		}
	}
}
