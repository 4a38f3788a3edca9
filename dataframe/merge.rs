use crate::{Error, Result, Table};
use fnv::FnvHashMap;

impl Table {
	/**
	Merge two tables by the values in the column `key`. A row in `secondary` replaces the row in `primary` with the same key, and a later row replaces an earlier row with the same key in the same table.

	The merged table has the columns of `primary` followed by any columns only `secondary` has. A row from either table reads as empty in the columns its table does not have. Keys keep the order in which they first appear, with the keys of `primary` first.
	*/
	pub fn merge_by_key(primary: &Table, secondary: &Table, key: &str) -> Result<Table> {
		let mut column_names = primary.column_names.clone();
		for column_name in secondary.column_names.iter() {
			if !column_names.contains(column_name) {
				column_names.push(column_name.clone());
			}
		}
		let mut rows: Vec<Vec<String>> = Vec::new();
		let mut row_index_for_key: FnvHashMap<String, usize> = FnvHashMap::default();
		for table in &[primary, secondary] {
			let key_column_index = table
				.column_index(key)
				.ok_or_else(|| Error::ColumnNotFound(key.to_owned()))?;
			// Map each merged column to its index in this table.
			let column_indexes: Vec<Option<usize>> = column_names
				.iter()
				.map(|column_name| table.column_index(column_name))
				.collect();
			for row in table.rows.iter() {
				let merged_row: Vec<String> = column_indexes
					.iter()
					.map(|column_index| {
						column_index
							.map(|column_index| row[column_index].clone())
							.unwrap_or_default()
					})
					.collect();
				let key_value = &row[key_column_index];
				match row_index_for_key.get(key_value).copied() {
					Some(row_index) => rows[row_index] = merged_row,
					None => {
						row_index_for_key.insert(key_value.clone(), rows.len());
						rows.push(merged_row);
					}
				}
			}
		}
		Ok(Table { column_names, rows })
	}
}

#[cfg(test)]
fn table(column_names: &[&str], rows: &[&[&str]]) -> Table {
	Table {
		column_names: column_names.iter().map(|name| name.to_string()).collect(),
		rows: rows
			.iter()
			.map(|row| row.iter().map(|value| value.to_string()).collect())
			.collect(),
	}
}

#[test]
fn test_merge_by_key() {
	let primary = table(
		&["id", "county", "prompt"],
		&[&["1", "kiambu", "fever"], &["2", "nairobi", "cough"], &["3", "kisumu", "rash"]],
	);
	let secondary = table(
		&["id", "prompt", "ddx snomed"],
		&[&["4", "headache", "migraine"], &["2", "cough and fever", "pneumonia"]],
	);
	let merged = Table::merge_by_key(&primary, &secondary, "ID").unwrap();
	assert_eq!(
		merged,
		table(
			&["id", "county", "prompt", "ddx snomed"],
			&[
				&["1", "kiambu", "fever", ""],
				&["2", "", "cough and fever", "pneumonia"],
				&["3", "kisumu", "rash", ""],
				&["4", "", "headache", "migraine"],
			],
		)
	);
}

#[test]
fn test_merge_by_key_duplicates_within_a_table() {
	let primary = table(&["id", "value"], &[&["a", "1"], &["b", "2"], &["a", "3"]]);
	let secondary = table(&["id", "value"], &[]);
	let merged = Table::merge_by_key(&primary, &secondary, "id").unwrap();
	assert_eq!(merged.rows, table(&[], &[&["a", "3"], &["b", "2"]]).rows);
}

#[test]
fn test_merge_by_key_missing_key() {
	let primary = table(&["id"], &[&["1"]]);
	let secondary = table(&["name"], &[&["x"]]);
	let result = Table::merge_by_key(&primary, &secondary, "id");
	assert!(matches!(result, Err(Error::ColumnNotFound(key)) if key == "id"));
}
