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
use crate::error::is_cancelled;
use crate::import::importer::{import, ImportPaths};
use crate::import::prompter::TerminalPrompter;
use crate::parsing::filesystem::Filesystem;
use anyhow::{bail, Error};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

mod config;
mod error;
mod import;
mod parsing;
mod reports;

#[derive(Parser)]
#[command(
	name = "ledgerize",
	version,
	about = "Read CSV bank statements and produce journal entries, learning accounts on the way"
)]
struct Cli {
	// ----------------
	// -- POSITIONAL --
	// ----------------
	/// CSV statement to read ("-" or nothing for stdin)
	infile: Option<String>,

	/// Journal file to write ("-" or nothing for stdout)
	outfile: Option<String>,

	// -----------
	// -- FLAGS --
	// -----------
	/// Custom config file location (default: ./.ledgerize.toml, then
	/// ~/.config/ledgerize/config.toml)
	#[arg(short, long)]
	config: Option<String>,

	/// The ledger account of this statement; also names the config section
	#[arg(short, long, default_value = "Assets:Bank:Current")]
	account: String,

	/// Read payees, accounts and known fingerprints from this ledger file
	#[arg(short, long)]
	ledger_file: Option<String>,

	/// File holding description to payee/account mappings
	#[arg(short, long)]
	mapping_file: Option<String>,

	/// File of `account NAME` declarations offered for completion
	#[arg(long)]
	accounts_file: Option<String>,

	/// Custom journal entry template
	#[arg(long)]
	template_file: Option<String>,

	/// Don't prompt if the account can be deduced, just use it
	#[arg(short, long)]
	quiet: bool,

	/// Prompt for transaction tags
	#[arg(short, long)]
	tags: bool,

	/// Silently skip transactions already present in the ledger file
	#[arg(long)]
	skip_dupes: bool,

	/// Ask before skipping transactions already present in the ledger file
	#[arg(long)]
	confirm_dupes: bool,

	/// Ask before adding a new mapping
	#[arg(long)]
	confirm_mapping: bool,

	/// Show each entry and ask to commit, modify or skip it
	#[arg(long)]
	entry_review: bool,

	/// Process the statement from the last row to the first
	#[arg(long)]
	reverse: bool,

	/// More log output; repeat for even more
	#[arg(short, long, action = ArgAction::Count)]
	verbose: u8,
}

impl Cli {
	/// Extra validations on top of what clap does
	fn validate(&self) -> Result<(), Error> {
		if self.skip_dupes && self.confirm_dupes {
			bail!("--skip-dupes and --confirm-dupes are mutually exclusive");
		}

		Ok(())
	}

	fn log_level(&self) -> &'static str {
		match self.verbose {
			0 => "warn",
			1 => "info",
			_ => "debug",
		}
	}
}

fn main() -> Result<(), Error> {
	let args = Cli::parse();
	args.validate()?;

	env_logger::Builder::from_env(
		env_logger::Env::default().default_filter_or(args.log_level()),
	)
	.init();

	match run(&args) {
		Err(e) if is_cancelled(&e) => {
			eprintln!("\nCancelled. Entries and mappings written so far are kept.");
			Ok(())
		},
		result => result,
	}
}

fn run(args: &Cli) -> Result<(), Error> {
	let fs = Filesystem::new();
	let (config, config_path) = fs.get_config(args.config.as_ref())?;
	let settings = Settings::resolve(config, &config_path, args)?;

	let paths = ImportPaths {
		input: stdio_path(&args.infile),
		output: stdio_path(&args.outfile),
	};

	let mut prompter = TerminalPrompter::new();
	import(&settings, &paths, &mut prompter)?;

	Ok(())
}

/// "-" and a missing argument both mean the standard stream.
fn stdio_path(arg: &Option<String>) -> Option<PathBuf> {
	match arg.as_deref() {
		None | Some("-") => None,
		Some(p) => Some(PathBuf::from(p)),
	}
}
