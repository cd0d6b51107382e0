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
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Completion, Input};
use std::collections::BTreeSet;
use std::io;

/// Whatever asks the user about a transaction. The resolver only ever needs
/// to show some text and ask for a value with a default.
pub trait Prompter {
	fn show(&mut self, text: &str) -> Result<(), Error>;

	/// Asks for a value. An empty answer means "keep the default"; the
	/// caller decides what that is.
	fn ask(
		&mut self,
		label: &str,
		default: &str,
		candidates: &BTreeSet<String>,
	) -> Result<String, Error>;
}

/// Interactive prompts on the terminal, with tab completion over the
/// candidate values.
pub struct TerminalPrompter {
	theme: ColorfulTheme,
}

impl TerminalPrompter {
	pub fn new() -> Self {
		Self {
			theme: ColorfulTheme::default(),
		}
	}
}

impl Prompter for TerminalPrompter {
	fn show(&mut self, text: &str) -> Result<(), Error> {
		eprintln!("{}", text);
		Ok(())
	}

	fn ask(
		&mut self,
		label: &str,
		default: &str,
		candidates: &BTreeSet<String>,
	) -> Result<String, Error> {
		let completion = Candidates(candidates);
		let answer = Input::<String>::with_theme(&self.theme)
			.with_prompt(format!("{} [{}]", label, default))
			.allow_empty(true)
			.completion_with(&completion)
			.interact_text()
			.map_err(|e| match e {
				dialoguer::Error::IO(e) if e.kind() == io::ErrorKind::Interrupted => {
					Error::from(ImportError::UserCancelled)
				},
				dialoguer::Error::IO(e) => Error::from(e),
			})?;

		Ok(answer.trim().to_string())
	}
}

/// Case-insensitive substring completion, first candidate wins. Account
/// names contain spaces and colons, so the whole input is one word.
struct Candidates<'a>(&'a BTreeSet<String>);

impl Completion for Candidates<'_> {
	fn get(&self, input: &str) -> Option<String> {
		let needle = input.to_uppercase();
		self.0
			.iter()
			.find(|value| value.to_uppercase().contains(&needle))
			.cloned()
	}
}

/// Accepts every default without printing anything.
#[cfg(test)]
pub struct QuietPrompter;

#[cfg(test)]
impl Prompter for QuietPrompter {
	fn show(&mut self, _text: &str) -> Result<(), Error> {
		Ok(())
	}

	fn ask(
		&mut self,
		_label: &str,
		_default: &str,
		_candidates: &BTreeSet<String>,
	) -> Result<String, Error> {
		Ok(String::new())
	}
}
