use std::fs;
use std::path::PathBuf;

use crate::errors::ParseError;
use crate::model::normalize_header;
use crate::parse_csv;

fn fixture(path: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read_to_string(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

#[test]
fn normalizes_header_names() {
    assert_eq!(normalize_header("Full Name"), "full_name");
    assert_eq!(normalize_header("  Donation   Amount "), "donation_amount");
    assert_eq!(normalize_header("EMAIL"), "email");
    assert_eq!(normalize_header("payment\tmethod"), "payment_method");
}

#[test]
fn parses_sample_fixture() {
    let content = fixture("donors_sample.csv");
    let parsed = parse_csv(&content).expect("sample parse failed");

    assert_eq!(
        parsed.headers,
        vec![
            "full_name",
            "email",
            "phone",
            "address",
            "donation_amount",
            "donation_date",
            "payment_method",
            "notes"
        ]
    );
    assert_eq!(parsed.len(), 3, "blank line must not produce a row");

    let first = &parsed.rows[0];
    assert_eq!(parsed.value(first, "full_name"), Some("Asha K"));
    assert_eq!(
        parsed.value(first, "address"),
        Some("12 Park Rd, City, State 400001")
    );
    assert_eq!(parsed.value(first, "notes"), Some(""));
    assert_eq!(
        parsed.value(&parsed.rows[1], "notes"),
        Some("Annual pledge")
    );
}

#[test]
fn trims_cell_values() {
    let content = "name , email\n  Asha  ,  asha@x.com \n";
    let parsed = parse_csv(content).expect("parse");

    assert_eq!(parsed.headers, vec!["name", "email"]);
    assert_eq!(parsed.rows[0].fields, vec!["Asha", "asha@x.com"]);
}

#[test]
fn skips_leading_and_interleaved_empty_lines() {
    let content = "\n\nemail,amount\n\na@b.co,5\n   \nc@d.co,6\n";
    let parsed = parse_csv(content).expect("parse");

    assert_eq!(parsed.headers, vec!["email", "amount"]);
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed.rows[1].get(0), Some("c@d.co"));
}

#[test]
fn header_only_file_yields_no_rows() {
    let parsed = parse_csv("full_name,email\n").expect("parse");
    assert!(parsed.is_empty());
    assert_eq!(parsed.headers.len(), 2);
}

#[test]
fn strips_byte_order_mark() {
    let parsed = parse_csv("\u{feff}Email,Phone\nx@y.io,123\n").expect("parse");
    assert_eq!(parsed.headers[0], "email");
}

#[test]
fn blank_input_has_no_header() {
    let err = parse_csv("\n  \n").expect_err("blank input must fail");
    assert!(matches!(err, ParseError::MissingHeader));
}

#[test]
fn inconsistent_column_counts_are_collected() {
    let content = "a,b,c\n1,2,3\n1,2\n1,2,3,4\n";
    let err = parse_csv(content).expect_err("ragged rows must fail");

    match &err {
        ParseError::Malformed { problems } => {
            assert_eq!(problems.len(), 2);
            assert_eq!(problems[0].line, 3);
            assert!(problems[0].message.starts_with("Too few fields"));
            assert_eq!(problems[1].line, 4);
            assert!(problems[1].message.starts_with("Too many fields"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let messages = err.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].starts_with("line 3:"));
}

#[test]
fn row_of_empty_cells_is_kept() {
    let parsed = parse_csv("a,b\n,\n").expect("parse");
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed.rows[0].fields, vec!["", ""]);
}

#[test]
fn quoted_fields_span_lines_and_keep_commas() {
    let content = "name,address\r\n\"Asha K\",\"12 Park Rd,\nCity\"\r\n";
    let parsed = parse_csv(content).expect("parse");
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed.rows[0].fields, vec!["Asha K", "12 Park Rd,\nCity"]);
}
