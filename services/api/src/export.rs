//! services/api/src/export.rs
//!
//! Flattens test cases into the CSV layout used for work-item import: one row per
//! test step, with the title on the first step and the expected result on the last.

use testgen_core::domain::TestCase;

pub const CSV_HEADER: [&str; 6] = [
    "ID",
    "Work Item Type",
    "Title",
    "Test Step",
    "Step Action",
    "Step Expected",
];

const WORK_ITEM_TYPE: &str = "Test Case";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV buffer flush failed: {0}")]
    Flush(String),
    #[error("CSV output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Renders `test_cases` as CSV. Fields are quoted only when they contain a
/// delimiter, quote or line break.
pub fn render_csv(test_cases: &[TestCase]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;

    for test_case in test_cases {
        let last = test_case.steps.len().saturating_sub(1);
        for (index, step) in test_case.steps.iter().enumerate() {
            let title = if index == 0 { test_case.description.as_str() } else { "" };
            let expected = if index == last {
                test_case.expected_results.as_str()
            } else {
                ""
            };
            let step_number = (index + 1).to_string();
            writer.write_record([
                "",
                WORK_ITEM_TYPE,
                title,
                step_number.as_str(),
                step.as_str(),
                expected,
            ])?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))?;
    Ok(String::from_utf8(bytes)?)
}
