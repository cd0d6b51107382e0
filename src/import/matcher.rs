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
use crate::import::mapping::{MappingRule, Pattern};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Joins addon values when a regex rule falls back to matching them.
pub const ADDON_SEPARATOR: &str = "|";

/// The outcome of classifying one transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
	pub payee: String,
	pub account: String,
	pub tags: Vec<String>,
	pub transfer_to: Option<String>,
	pub transfer_to_target: Option<PathBuf>,
}

/// A classification plus whether any rule produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suggestion {
	pub classification: Classification,
	pub found: bool,
}

/// Runs every rule over the description, in order. Later matches replace
/// earlier ones, so the last matching rule in the file decides. With no
/// match the payee is the description itself and the account is
/// `default_account`.
pub fn suggest(
	desc: &str,
	addons: &BTreeMap<String, String>,
	rules: &[MappingRule],
	default_account: &str,
) -> Suggestion {
	let mut suggestion = Suggestion {
		classification: Classification {
			payee: desc.to_string(),
			account: default_account.to_string(),
			tags: vec![],
			transfer_to: None,
			transfer_to_target: None,
		},
		found: false,
	};

	let joined_addons = addons
		.values()
		.map(String::as_str)
		.collect::<Vec<_>>()
		.join(ADDON_SEPARATOR);

	for (i, rule) in rules.iter().enumerate() {
		let payee = match &rule.pattern {
			Pattern::Literal(s) => {
				if desc == s || addons.values().any(|v| v == s) {
					rule.payee.clone()
				} else {
					continue;
				}
			},
			Pattern::Regex(re) => {
				if matches_at_start(re, desc) {
					substitute_payee(re, &rule.payee, desc)
				} else if addons.is_empty() {
					continue;
				} else if let Some(caps) = re.captures(&joined_addons) {
					expand_payee(re, &rule.payee, &caps)
				} else {
					continue;
				}
			},
		};

		log::debug!("'{}' matched mapping rule {} ({})", desc, i + 1, rule.pattern);

		let current = &mut suggestion.classification;
		current.payee = payee;
		// two-column rows only name a payee
		if !rule.account.is_empty() {
			current.account = rule.account.clone();
		}
		current.tags = rule.tags.clone();
		current.transfer_to = rule.transfer_to.clone();
		current.transfer_to_target = rule.transfer_to_target.clone();
		suggestion.found = true;
	}

	suggestion
}

/// Descriptions match a regex only when the match begins at their first
/// character. Leftmost-first search returns a start of 0 whenever one
/// exists.
fn matches_at_start(re: &Regex, text: &str) -> bool {
	re.find(text).is_some_and(|m| m.start() == 0)
}

/// With capture groups the configured payee is a replacement template, so
/// `Payment to \1` picks up the first group.
fn substitute_payee(re: &Regex, template: &str, subject: &str) -> String {
	if re.captures_len() <= 1 {
		return template.to_string();
	}
	re.replace_all(subject, to_replacement(template).as_str())
		.into_owned()
}

/// Addon matches only feed their groups into the template. The joined
/// addon text around the match is never part of the payee.
fn expand_payee(re: &Regex, template: &str, caps: &Captures<'_>) -> String {
	if re.captures_len() <= 1 {
		return template.to_string();
	}
	let mut payee = String::new();
	caps.expand(&to_replacement(template), &mut payee);
	payee
}

/// Converts `\1` and `\g<name>` group references to the `${1}` syntax the
/// regex crate expands, escaping any literal `$` along the way.
fn to_replacement(template: &str) -> String {
	let mut out = String::with_capacity(template.len());
	let mut chars = template.chars().peekable();

	while let Some(c) = chars.next() {
		match c {
			'$' => out.push_str("$$"),
			'\\' => match chars.peek().copied() {
				Some(d) if d.is_ascii_digit() => {
					let mut group = String::new();
					while let Some(d) = chars.peek().copied() {
						if !d.is_ascii_digit() {
							break;
						}
						group.push(d);
						chars.next();
					}
					out.push_str(&format!("${{{}}}", group));
				},
				Some('g') => {
					chars.next();
					if chars.peek() == Some(&'<') {
						chars.next();
						let name: String =
							chars.by_ref().take_while(|c| *c != '>').collect();
						out.push_str(&format!("${{{}}}", name));
					} else {
						out.push_str("\\g");
					}
				},
				Some('\\') => {
					chars.next();
					out.push('\\');
				},
				_ => out.push('\\'),
			},
			_ => out.push(c),
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	const DEFAULT: &str = "Expenses:Unknown";

	fn rule(pattern: &str, payee: &str, account: &str) -> MappingRule {
		MappingRule {
			pattern: Pattern::parse(pattern).unwrap(),
			payee: payee.to_string(),
			account: account.to_string(),
			tags: vec![],
			transfer_to: None,
			transfer_to_target: None,
		}
	}

	fn no_addons() -> BTreeMap<String, String> {
		BTreeMap::new()
	}

	#[test]
	fn test_no_match_uses_defaults() {
		let rules = vec![rule("OTHER", "Other", "Expenses:Other")];
		let s = suggest("SHOP PURCHASE", &no_addons(), &rules, DEFAULT);

		assert!(!s.found);
		assert_eq!(s.classification.payee, "SHOP PURCHASE");
		assert_eq!(s.classification.account, DEFAULT);
		assert!(s.classification.tags.is_empty());
		assert_eq!(s.classification.transfer_to, None);
	}

	#[test]
	fn test_literal_match() {
		let rules = vec![rule("SHOP PURCHASE", "My Shop", "Expenses:Dining")];
		let s = suggest("SHOP PURCHASE", &no_addons(), &rules, DEFAULT);

		assert!(s.found);
		assert_eq!(s.classification.payee, "My Shop");
		assert_eq!(s.classification.account, "Expenses:Dining");
	}

	#[test]
	fn test_literal_is_exact() {
		let rules = vec![rule("SHOP", "My Shop", "Expenses:Dining")];
		assert!(!suggest("SHOP PURCHASE", &no_addons(), &rules, DEFAULT).found);
	}

	#[test]
	fn test_last_match_wins() {
		let rules = vec![
			rule("/^SHOP/", "First", "Expenses:First"),
			rule("SHOP PURCHASE", "Second", "Expenses:Second"),
			rule("UNRELATED", "Third", "Expenses:Third"),
		];
		let s = suggest("SHOP PURCHASE", &no_addons(), &rules, DEFAULT);
		assert_eq!(s.classification.payee, "Second");
		assert_eq!(s.classification.account, "Expenses:Second");

		let reversed: Vec<MappingRule> = rules.into_iter().rev().collect();
		let s = suggest("SHOP PURCHASE", &no_addons(), &reversed, DEFAULT);
		assert_eq!(s.classification.payee, "First");
	}

	#[test]
	fn test_later_rule_clears_tags() {
		let mut tagged = rule("SHOP", "Tagged", "Expenses:A");
		tagged.tags = vec![":food:".to_string()];
		let rules = vec![tagged, rule("SHOP", "Plain", "Expenses:B")];

		let s = suggest("SHOP", &no_addons(), &rules, DEFAULT);
		assert!(s.classification.tags.is_empty());
	}

	#[test]
	fn test_regex_capture_substitution() {
		let rules = vec![rule("/^REFUND (.*)$/", "Refund: \\1", "Income:Refunds")];
		let s = suggest("REFUND ACME CORP", &no_addons(), &rules, DEFAULT);

		assert!(s.found);
		assert_eq!(s.classification.payee, "Refund: ACME CORP");
	}

	#[test]
	fn test_regex_without_groups_uses_payee() {
		let rules = vec![rule("/^CARD \\d+/", "Card $ payment", "Expenses:Card")];
		let s = suggest("CARD 1234 GROCER", &no_addons(), &rules, DEFAULT);
		assert_eq!(s.classification.payee, "Card $ payment");
	}

	#[test]
	fn test_regex_anchored_at_start() {
		let rules = vec![rule("/SHOP/", "Shop", "Expenses:Shop")];
		assert!(suggest("SHOP 12", &no_addons(), &rules, DEFAULT).found);
		assert!(!suggest("MY SHOP", &no_addons(), &rules, DEFAULT).found);
	}

	#[test]
	fn test_literal_matches_addon_value() {
		let mut addons = no_addons();
		addons.insert("addon_category".to_string(), "GROCERIES".to_string());
		let rules = vec![rule("GROCERIES", "Grocer", "Expenses:Food")];

		let s = suggest("POS 4711", &addons, &rules, DEFAULT);
		assert!(s.found);
		assert_eq!(s.classification.account, "Expenses:Food");
	}

	#[test]
	fn test_regex_falls_back_to_addons() {
		let mut addons = no_addons();
		addons.insert("addon_category".to_string(), "TRAVEL".to_string());
		addons.insert("addon_memo".to_string(), "TRAIN TICKET".to_string());
		let rules = vec![rule("/TRAIN (\\w+)/", "Train \\1", "Expenses:Travel")];

		let s = suggest("POS 4711", &addons, &rules, DEFAULT);
		assert!(s.found);
		assert_eq!(s.classification.payee, "Train TICKET");
		assert_eq!(s.classification.account, "Expenses:Travel");
	}

	#[test]
	fn test_addon_fallback_without_groups_uses_payee_as_is() {
		let mut addons = no_addons();
		addons.insert("addon_category".to_string(), "TRAVEL".to_string());
		addons.insert("addon_memo".to_string(), "TRAIN TICKET".to_string());
		let rules = vec![rule("/TRAIN/", "Railways", "Expenses:Travel")];

		let s = suggest("POS 4711", &addons, &rules, DEFAULT);
		assert_eq!(s.classification.payee, "Railways");
	}

	#[test]
	fn test_payee_only_row_keeps_account() {
		let rules = vec![
			rule("SHOP", "Shop", "Expenses:Shop"),
			rule("SHOP", "Renamed", ""),
		];
		let s = suggest("SHOP", &no_addons(), &rules, DEFAULT);
		assert_eq!(s.classification.payee, "Renamed");
		assert_eq!(s.classification.account, "Expenses:Shop");
	}

	#[test]
	fn test_to_replacement() {
		assert_eq!(to_replacement("Refund: \\1"), "Refund: ${1}");
		assert_eq!(to_replacement("\\12x"), "${12}x");
		assert_eq!(to_replacement("\\g<name> $5"), "${name} $$5");
		assert_eq!(to_replacement("a\\\\b"), "a\\b");
	}
}
