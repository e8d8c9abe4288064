// src/grading/template.rs

/// Header row consumed by the importer.
pub const TEMPLATE_HEADERS: [&str; 4] = ["question", "answer", "score", "description"];

pub const TEMPLATE_FILE_NAME: &str = "answer_key_template.csv";

const EXAMPLE_ROWS: [[&str; 4]; 2] = [
    ["1", "A", "5", "Main idea of the passage"],
    ["2", "3", "10", "Optional explanation shown after grading"],
];

/// Builds the downloadable CSV template: the headers plus two example rows.
pub fn generate_template() -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(TEMPLATE_HEADERS)?;
    for row in EXAMPLE_ROWS {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
