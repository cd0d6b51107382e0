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
use std::path::PathBuf;
use thiserror::Error;

/// Failures that callers need to tell apart. Everything else travels as a
/// plain anyhow error with a message.
#[derive(Debug, Error)]
pub enum ImportError {
	#[error("config error in {file}: {msg}")]
	Config { file: PathBuf, msg: String },

	#[error("invalid regex in mapping file {file} (row '{row}'): {source}")]
	MalformedRule {
		file: PathBuf,
		row: String,
		#[source]
		source: regex::Error,
	},

	#[error("{path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("cancelled by user")]
	UserCancelled,
}

impl ImportError {
	pub fn config(file: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
		ImportError::Config {
			file: file.into(),
			msg: msg.into(),
		}
	}

	pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		ImportError::Io {
			path: path.into(),
			source,
		}
	}
}

/// True if the error chain bottoms out in a user interrupt.
pub fn is_cancelled(err: &anyhow::Error) -> bool {
	matches!(
		err.downcast_ref::<ImportError>(),
		Some(ImportError::UserCancelled)
	)
}
