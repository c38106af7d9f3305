use std::fs;
use std::path::Path;

use chrono::Utc;
use pricewatch_core::config::LoadOptions;
use pricewatch_core::{Barcode, BatchEntry};
use serde::Serialize;
use serde_json::json;

use crate::commands::{load_config, with_catalog, CommandResult, EXIT_INPUT};

const COMMAND: &str = "import";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvalidLine {
    pub line: usize,
    pub content: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedImport {
    pub entries: Vec<BatchEntry>,
    pub invalid: Vec<InvalidLine>,
}

/// Parses `barcode[,;\t name]` lines. Comments, blank lines and a header
/// row on line 1 are ignored.
pub fn parse_import(text: &str) -> ParsedImport {
    let mut parsed = ParsedImport::default();

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim_start_matches('\u{feff}').trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (code, name) = match line.find(|ch: char| matches!(ch, ',' | ';' | '\t')) {
            Some(position) => (&line[..position], Some(line[position + 1..].trim())),
            None => (line, None),
        };
        let code = code.trim().trim_matches('"');

        match Barcode::parse(code) {
            Ok(barcode) => {
                let entry = BatchEntry::new(barcode);
                let entry = match name.map(|name| name.trim_matches('"').trim()) {
                    Some(name) if !name.is_empty() => entry.with_name(name),
                    _ => entry,
                };
                parsed.entries.push(entry);
            }
            Err(_) if index == 0 => {}
            Err(error) => parsed.invalid.push(InvalidLine {
                line: index + 1,
                content: line.to_string(),
                reason: error.to_string(),
            }),
        }
    }

    parsed
}

pub fn run(options: &LoadOptions, path: &Path) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "invalid_input",
                format!("could not read import file `{}`: {error}", path.display()),
                EXIT_INPUT,
            )
        }
    };

    let ParsedImport { entries, invalid } = parse_import(&text);
    let report = match with_catalog(COMMAND, &config, |catalog| {
        Ok(catalog.upsert_batch(entries, Utc::now()))
    }) {
        Ok(report) => report,
        Err(result) => return result,
    };

    CommandResult::success_with_data(
        COMMAND,
        format!(
            "imported {} new products, skipped {} already registered, {} invalid lines",
            report.added.len(),
            report.skipped.len(),
            invalid.len()
        ),
        Some(json!({
            "added": report.added,
            "skipped": report.skipped,
            "invalid": invalid,
        })),
    )
}

#[cfg(test)]
mod tests {
    use pricewatch_core::Barcode;

    use super::parse_import;

    fn barcodes(text: &str) -> Vec<String> {
        parse_import(text)
            .entries
            .iter()
            .map(|entry| entry.barcode.as_str().to_owned())
            .collect()
    }

    #[test]
    fn header_comments_and_blank_lines_are_skipped() {
        let text = "ean,name\n# pharmacy aisle\n\n7891000053508,Cafe Torrado\n7896004000015\n";

        let parsed = parse_import(text);

        assert_eq!(barcodes(text), vec!["7891000053508", "7896004000015"]);
        assert_eq!(parsed.entries[0].name.as_deref(), Some("Cafe Torrado"));
        assert_eq!(parsed.entries[1].name, None);
        assert!(parsed.invalid.is_empty());
    }

    #[test]
    fn semicolon_and_tab_separators() {
        let parsed = parse_import("111;Arroz 5kg\n222\tFeijão Preto\n333,\"Leite, integral\"\n");

        let names: Vec<Option<&str>> =
            parsed.entries.iter().map(|entry| entry.name.as_deref()).collect();
        assert_eq!(names, vec![Some("Arroz 5kg"), Some("Feijão Preto"), Some("Leite, integral")]);
    }

    #[test]
    fn non_numeric_rows_after_the_first_are_reported() {
        let parsed = parse_import("111\nabc,Broken\n222\n");

        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.invalid.len(), 1);
        assert_eq!(parsed.invalid[0].line, 2);
        assert_eq!(parsed.invalid[0].content, "abc,Broken");
    }

    #[test]
    fn mistyped_barcode_after_leading_comment_is_reported() {
        let parsed = parse_import("# my list\n\n78910-0053508,Cafe\n7896004000015\n");

        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].barcode.as_str(), "7896004000015");
        assert_eq!(parsed.invalid.len(), 1);
        assert_eq!(parsed.invalid[0].line, 3);
        assert_eq!(parsed.invalid[0].content, "78910-0053508,Cafe");
    }

    #[test]
    fn header_after_byte_order_mark_is_skipped() {
        let parsed = parse_import("\u{feff}barcode;name\n111;Arroz\n");

        assert_eq!(parsed.entries.len(), 1);
        assert!(parsed.invalid.is_empty());
    }

    #[test]
    fn duplicates_inside_the_file_are_kept_for_the_catalog_to_skip() {
        let parsed = parse_import("999\n999\n");

        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].barcode, Barcode::parse("999").expect("barcode"));
    }
}
