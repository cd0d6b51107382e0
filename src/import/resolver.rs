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
use crate::import::dedup::FingerprintIndex;
use crate::import::entry::Entry;
use crate::import::mapping::{MappingRule, MappingStore, Pattern};
use crate::import::matcher::{suggest, Classification, Suggestion};
use crate::import::possible_values::PossibleValues;
use crate::import::prompter::Prompter;
use crate::import::tags::prompt_for_tags;
use anyhow::Error;
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
	Committed(Classification),
	Skipped(SkipReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
	/// Already present in the ledger, or earlier in this run.
	Duplicate,
	/// Dropped by the user while reviewing the rendered entry.
	Review,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReviewAction {
	Commit,
	Modify,
	Skip,
}

/// Decides the classification of each transaction in turn, asking the user
/// where needed and teaching the mapping store whatever it learns. Owns all
/// state that changes while a batch is processed, so transactions must go
/// through it one at a time and in input order.
pub struct Resolver {
	store: MappingStore,
	values: PossibleValues,
	seen: FingerprintIndex,

	default_account: String,
	quiet: bool,
	tags: bool,
	duplicates: DuplicatePolicy,
	confirm_mapping: bool,
	entry_review: bool,

	yes_no: BTreeSet<String>,
	review_choices: BTreeSet<String>,
}

impl Resolver {
	pub fn new(
		store: MappingStore,
		mut values: PossibleValues,
		seen: FingerprintIndex,
		settings: &Settings,
	) -> Self {
		values.add_rules(store.rules());

		Self {
			store,
			values,
			seen,
			default_account: settings.default_expense.clone(),
			quiet: settings.quiet,
			tags: settings.tags,
			duplicates: settings.duplicates,
			confirm_mapping: settings.confirm_mapping,
			entry_review: settings.entry_review,
			yes_no: to_set(&["Y", "N"]),
			review_choices: to_set(&["C", "M", "S"]),
		}
	}

	/// Takes one transaction from matching to either committed or skipped:
	///
	/// 1. match it against the mapping rules;
	/// 2. if it was imported before, skip it or ask, depending on policy;
	/// 3. prompt for payee, account and tags unless quiet mode is on and a
	///    rule matched;
	/// 4. optionally show the rendered entry for commit, modify or skip;
	/// 5. store a new mapping row when nothing matched or the user changed
	///    what the rules suggested.
	///
	/// `preview` renders the journal entry for the review step.
	pub fn resolve(
		&mut self,
		entry: &Entry,
		prompter: &mut dyn Prompter,
		preview: &dyn Fn(&Classification) -> Result<String, Error>,
	) -> Result<Resolution, Error> {
		let suggestion = suggest(
			&entry.desc,
			&entry.addons,
			self.store.rules(),
			&self.default_account,
		);

		if self.is_skipped_duplicate(entry, prompter)? {
			log::info!("skipping duplicate transaction: {}", entry.prompt());
			return Ok(Resolution::Skipped(SkipReason::Duplicate));
		}

		let mut classification = suggestion.classification.clone();
		let mut should_prompt = !(self.quiet && suggestion.found);
		loop {
			if should_prompt {
				classification =
					self.prompt_classification(entry, &classification, prompter)?;
			}

			if !self.entry_review {
				break;
			}

			prompter.show(&preview(&classification)?)?;
			match self.ask_review(prompter)? {
				ReviewAction::Commit => break,
				ReviewAction::Modify => should_prompt = true,
				ReviewAction::Skip => {
					return Ok(Resolution::Skipped(SkipReason::Review))
				},
			}
		}

		self.learn(entry, &suggestion, &classification, prompter)?;
		self.seen.insert(entry.md5sum.clone());

		Ok(Resolution::Committed(classification))
	}

	#[cfg(test)]
	pub fn store(&self) -> &MappingStore {
		&self.store
	}

	pub fn values(&self) -> &PossibleValues {
		&self.values
	}

	fn is_skipped_duplicate(
		&mut self,
		entry: &Entry,
		prompter: &mut dyn Prompter,
	) -> Result<bool, Error> {
		if self.duplicates == DuplicatePolicy::Ignore
			|| !self.seen.is_duplicate(entry)
		{
			return Ok(false);
		}

		match self.duplicates {
			DuplicatePolicy::Skip => Ok(true),
			DuplicatePolicy::Confirm => {
				prompter.show(&format!("\n{}", entry.prompt()))?;
				self.ask_yes_no(
					prompter,
					"Duplicate transaction detected, skip?",
				)
			},
			DuplicatePolicy::Ignore => Ok(false),
		}
	}

	/// Asks for each field in turn with the current value as default. An
	/// empty answer keeps the default.
	fn prompt_classification(
		&mut self,
		entry: &Entry,
		current: &Classification,
		prompter: &mut dyn Prompter,
	) -> Result<Classification, Error> {
		let mut next = current.clone();
		prompter.show(&format!("\n{}", entry.prompt()))?;

		let payee = prompter.ask("Payee", &next.payee, &self.values.payees)?;
		if !payee.is_empty() {
			next.payee = payee;
		}

		let account =
			prompter.ask("Account", &next.account, &self.values.accounts)?;
		if !account.is_empty() {
			next.account = account;
		}

		if self.tags {
			prompter.show(
				"End adding tags with an empty tag. Remove tag with -TAGNAME.",
			)?;
			next.tags = prompt_for_tags(prompter, &self.values.tags, &next.tags)?;
		}

		self.values.observe(&next.payee, &next.account, &next.tags);
		Ok(next)
	}

	fn ask_review(
		&self,
		prompter: &mut dyn Prompter,
	) -> Result<ReviewAction, Error> {
		loop {
			let answer = prompter.ask(
				"Commit, modify or skip? (C/M/S)",
				"C",
				&self.review_choices,
			)?;
			match answer.to_uppercase().chars().next() {
				None | Some('C') => return Ok(ReviewAction::Commit),
				Some('M') => return Ok(ReviewAction::Modify),
				Some('S') => return Ok(ReviewAction::Skip),
				Some(_) => continue,
			}
		}
	}

	/// Yes unless the answer starts with something other than `y`; an
	/// empty answer takes the default, which is yes.
	fn ask_yes_no(
		&self,
		prompter: &mut dyn Prompter,
		question: &str,
	) -> Result<bool, Error> {
		let answer = prompter.ask(question, "Y", &self.yes_no)?;
		Ok(answer.is_empty() || answer.to_uppercase().starts_with('Y'))
	}

	/// Confirming what a rule already says writes nothing; a new or changed
	/// classification becomes a new row keyed on the literal description.
	fn learn(
		&mut self,
		entry: &Entry,
		suggestion: &Suggestion,
		classification: &Classification,
		prompter: &mut dyn Prompter,
	) -> Result<(), Error> {
		let modified = classification != &suggestion.classification;
		if suggestion.found && !modified {
			return Ok(());
		}

		if self.confirm_mapping
			&& !self.ask_yes_no(prompter, "Append to mapping file?")?
		{
			return Ok(());
		}

		self.store.append(MappingRule {
			pattern: Pattern::Literal(entry.desc.clone()),
			payee: classification.payee.clone(),
			account: classification.account.clone(),
			tags: classification.tags.clone(),
			transfer_to: classification.transfer_to.clone(),
			transfer_to_target: classification.transfer_to_target.clone(),
		})?;
		self.values.observe(
			&classification.payee,
			&classification.account,
			&classification.tags,
		);

		log::info!(
			"added mapping '{}' -> {} / {} to {}",
			entry.desc,
			classification.payee,
			classification.account,
			self.store.path().display()
		);
		Ok(())
	}
}

fn to_set(values: &[&str]) -> BTreeSet<String> {
	values.iter().map(|v| v.to_string()).collect()
}
