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
use anyhow::{anyhow, Error};
use csv::ReaderBuilder;

const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// How many data lines the delimiter sniffer looks at.
const SNIFF_LINES: usize = 3;

/// A parsed CSV row together with the line it came from.
#[derive(Debug, PartialEq, Eq)]
pub struct CsvRow {
	pub fields: Vec<String>,
	pub raw: String,
}

/// Splits a bank export into rows, skipping the first `skip_lines` lines
/// and any blank ones. Each line is parsed on its own so that every row
/// keeps its exact source text.
pub fn read_rows(
	content: &str,
	skip_lines: usize,
	delimiter: Option<u8>,
) -> Result<Vec<CsvRow>, Error> {
	let lines: Vec<&str> = content
		.lines()
		.skip(skip_lines)
		.filter(|l| !l.trim().is_empty())
		.collect();

	let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&lines));

	lines
		.iter()
		.enumerate()
		.map(|(i, line)| {
			let mut reader = ReaderBuilder::new()
				.has_headers(false)
				.flexible(true)
				.delimiter(delimiter)
				.from_reader(line.as_bytes());

			let record = reader
				.records()
				.next()
				.transpose()
				.map_err(|e| anyhow!("bad CSV on data line {}: {}", i + 1, e))?
				.unwrap_or_default();

			Ok(CsvRow {
				fields: record.iter().map(String::from).collect(),
				raw: line.to_string(),
			})
		})
		.collect()
}

/// Picks the candidate that shows up on every one of the first few lines,
/// preferring the highest per-line minimum; earlier candidates win ties.
/// Quoted fields can skew the counts, hence the minimum rather than an
/// exact match. Falls back to a comma.
pub fn sniff_delimiter(lines: &[&str]) -> u8 {
	let sample: Vec<&str> = lines.iter().take(SNIFF_LINES).copied().collect();

	let mut best: Option<(usize, u8)> = None;
	for d in CANDIDATE_DELIMITERS {
		let least = sample
			.iter()
			.map(|l| l.bytes().filter(|b| *b == d).count())
			.min()
			.unwrap_or(0);
		if least > 0 && best.map_or(true, |(count, _)| least > count) {
			best = Some((least, d));
		}
	}

	best.map(|(_, d)| d).unwrap_or(b',')
}
