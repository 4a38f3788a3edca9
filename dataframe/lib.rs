/*!
This crate provides a minimal table of string values loaded from CSV files, along with the row operations needed to prepare training data: merging two tables by a key column and splitting rows into training and validation sets.

Values are kept exactly as they appear in the file, apart from leading whitespace. Interpreting them as numbers, categories, or text is left to the caller.
*/

#![allow(clippy::tabs_in_doc_comments)]

use thiserror::Error;

mod load;
mod merge;
mod split;

pub use self::split::shuffle_split;

#[derive(Debug, Error)]
pub enum Error {
	#[error("failed to read csv")]
	Csv(#[from] csv::Error),
	#[error("column \"{0}\" not found")]
	ColumnNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A `Table` holds rows of string values under a list of column names. Every row has exactly one value for each column.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
	/// The column names, trimmed and lowercased.
	pub column_names: Vec<String>,
	pub rows: Vec<Vec<String>>,
}

impl Table {
	pub fn n_rows(&self) -> usize {
		self.rows.len()
	}

	/// Find the index of a column. The name is normalized the same way as the column names.
	pub fn column_index(&self, column_name: &str) -> Option<usize> {
		let column_name = normalize_column_name(column_name);
		self.column_names
			.iter()
			.position(|name| *name == column_name)
	}

	/// Retrieve the value in a row for a column. An unknown column reads as an empty value.
	pub fn get(&self, row_index: usize, column_name: &str) -> &str {
		match self.column_index(column_name) {
			Some(column_index) => &self.rows[row_index][column_index],
			None => "",
		}
	}

	/// Retrieve every value in a column, or `None` if the column does not exist.
	pub fn column<'a>(&'a self, column_name: &str) -> Option<impl Iterator<Item = &'a str>> {
		let column_index = self.column_index(column_name)?;
		Some(self.rows.iter().map(move |row| row[column_index].as_str()))
	}
}

pub(crate) fn normalize_column_name(column_name: &str) -> String {
	column_name.trim().to_lowercase()
}

#[test]
fn test_get() {
	let table = Table {
		column_names: vec!["id".to_owned(), "county".to_owned()],
		rows: vec![
			vec!["1".to_owned(), "Kiambu".to_owned()],
			vec!["2".to_owned(), "".to_owned()],
		],
	};
	assert_eq!(table.column_index(" County "), Some(1));
	assert_eq!(table.get(0, "COUNTY"), "Kiambu");
	assert_eq!(table.get(1, "county"), "");
	assert_eq!(table.get(1, "prompt"), "");
	assert_eq!(
		table.column("id").unwrap().collect::<Vec<_>>(),
		vec!["1", "2"]
	);
	assert!(table.column("prompt").is_none());
}
