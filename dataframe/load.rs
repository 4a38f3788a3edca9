use crate::{normalize_column_name, Result, Table};
use std::path::Path;

impl Table {
	pub fn from_path(path: &Path) -> Result<Table> {
		let mut reader = reader_builder().from_path(path)?;
		Table::from_csv_reader(&mut reader)
	}

	/**
	Read a table from CSV data. The first record is the header. Records may have any number of fields: missing trailing values read as empty and extra values are ignored. Leading whitespace is removed from every value.
	*/
	pub fn from_csv<R>(reader: R) -> Result<Table>
	where
		R: std::io::Read,
	{
		let mut reader = reader_builder().from_reader(reader);
		Table::from_csv_reader(&mut reader)
	}

	fn from_csv_reader<R>(reader: &mut csv::Reader<R>) -> Result<Table>
	where
		R: std::io::Read,
	{
		let column_names: Vec<String> = reader
			.headers()?
			.iter()
			.map(normalize_column_name)
			.collect();
		let n_columns = column_names.len();
		let mut rows = Vec::new();
		let mut record = csv::StringRecord::new();
		while reader.read_record(&mut record)? {
			let row = (0..n_columns)
				.map(|column_index| {
					record
						.get(column_index)
						.map(|value| value.trim_start().to_owned())
						.unwrap_or_default()
				})
				.collect();
			rows.push(row);
		}
		Ok(Table { column_names, rows })
	}
}

fn reader_builder() -> csv::ReaderBuilder {
	let mut builder = csv::ReaderBuilder::new();
	builder.flexible(true);
	builder
}

#[test]
fn test_from_csv() {
	let csv = "Master_Index, County ,Prompt,DDX SNOMED
ID_1, Kiambu,\"fever, chills\",malaria
ID_2,Nairobi
ID_3,Kakamega,cough,pneumonia,extra
";
	let table = Table::from_csv(std::io::Cursor::new(csv)).unwrap();
	insta::assert_debug_snapshot!(table, @r###"
 Table {
     column_names: [
         "master_index",
         "county",
         "prompt",
         "ddx snomed",
     ],
     rows: [
         [
             "ID_1",
             "Kiambu",
             "fever, chills",
             "malaria",
         ],
         [
             "ID_2",
             "Nairobi",
             "",
             "",
         ],
         [
             "ID_3",
             "Kakamega",
             "cough",
             "pneumonia",
         ],
     ],
 }
 "###);
}

#[test]
fn test_from_csv_empty() {
	let table = Table::from_csv(std::io::Cursor::new("a,b\n")).unwrap();
	assert_eq!(table.column_names, vec!["a", "b"]);
	assert_eq!(table.n_rows(), 0);
}

#[test]
fn test_from_path_missing_file() {
	let result = Table::from_path(Path::new("this/file/does/not/exist.csv"));
	assert!(matches!(result, Err(crate::Error::Csv(_))));
}
