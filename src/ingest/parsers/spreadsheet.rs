use calamine::{open_workbook_auto, Data, Reader};
use std::collections::HashMap;
use std::path::Path;

use super::{is_empty_file, Parser};
use crate::error::{PocdeskError, Result};
use crate::model::{CandidatePoc, CandidateRecord, PocStatus};

/// Accepted headers for the company name, first non-empty match wins
const NAME_COLUMNS: &[&str] = &["name", "companyName", "company name"];
const POC_NAME_COLUMNS: &[&str] = &["pocName", "poc name"];

/// `.xlsx` / `.xls` parser. Reads the first sheet only; row 1 is the header.
pub struct SpreadsheetParser;

/// One data row keyed by header text
struct SheetRow<'a> {
    cells: HashMap<&'a str, String>,
}

impl<'a> SheetRow<'a> {
    /// A repeated header keeps its first column; later copies are ignored.
    fn new(headers: &'a [String], row: &[Data]) -> Self {
        let mut cells = HashMap::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            if header.is_empty() {
                continue;
            }
            cells
                .entry(header.as_str())
                .or_insert_with(|| cell_to_string(cell).trim().to_string());
        }
        Self { cells }
    }

    fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.is_empty())
    }

    fn get(&self, column: &str) -> Option<String> {
        self.cells
            .get(column)
            .filter(|v| !v.is_empty())
            .cloned()
    }

    fn first_of(&self, columns: &[&str]) -> Option<String> {
        columns.iter().find_map(|c| self.get(c))
    }

    fn into_candidate(self) -> Option<CandidateRecord> {
        let name = self.first_of(NAME_COLUMNS)?;
        let mut candidate = CandidateRecord::new(name);

        if let Some(profiles) = self.get("profiles") {
            candidate.profiles = split_profiles(&profiles);
        }

        if let Some(poc_name) = self.first_of(POC_NAME_COLUMNS) {
            candidate.pocs.push(CandidatePoc {
                name: poc_name,
                email: self.get("pocEmail"),
                phone: self.get("pocPhone"),
                status: self.get("pocStatus").as_deref().and_then(PocStatus::from_cell),
                remarks: self.get("pocRemarks"),
            });
        }

        Some(candidate)
    }
}

/// Split a profiles cell on `;` when present, otherwise on `,`
pub fn split_profiles(cell: &str) -> Vec<String> {
    let separator = if cell.contains(';') { ';' } else { ',' };
    cell.split(separator)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        // phone numbers typed as numbers come back as floats; 9876543210.0 prints without ".0"
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

impl Parser for SpreadsheetParser {
    fn format(&self) -> &'static str {
        "spreadsheet"
    }

    fn can_parse(&self, extension: &str) -> bool {
        matches!(extension, "xlsx" | "xls")
    }

    fn parse(&self, path: &Path) -> Result<Vec<CandidateRecord>> {
        if is_empty_file(path)? {
            return Ok(Vec::new());
        }

        let mut workbook = open_workbook_auto(path)
            .map_err(|e| PocdeskError::Parse(format!("Spreadsheet open error in {}: {}", path.display(), e)))?;

        let first_sheet = match workbook.sheet_names().first().cloned() {
            Some(name) => name,
            None => return Ok(Vec::new()),
        };

        let range = workbook
            .worksheet_range(&first_sheet)
            .map_err(|e| PocdeskError::Parse(format!("Sheet '{}' unreadable: {}", first_sheet, e)))?;

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(header) => header.iter().map(|c| cell_to_string(c).trim().to_string()).collect(),
            None => return Ok(Vec::new()),
        };

        let mut candidates = Vec::new();
        for (idx, row) in rows.enumerate() {
            let sheet_row = SheetRow::new(&headers, row);
            if sheet_row.is_blank() {
                continue;
            }
            match sheet_row.into_candidate() {
                Some(candidate) => candidates.push(candidate),
                None => log::debug!("Sheet '{}' row {}: no company name, skipping", first_sheet, idx + 2),
            }
        }

        Ok(candidates)
    }
}

/// Minimal `.xlsx` writer for fixtures (inline strings, single sheet).
#[cfg(test)]
pub(crate) fn write_xlsx(path: &Path, rows: &[&[&str]]) {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn escape(s: &str) -> String {
        s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
    }

    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            let col = (b'A' + c as u8) as char;
            sheet.push_str(&format!(
                r#"<c r="{}{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                col,
                r + 1,
                escape(value)
            ));
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let parts: [(&str, String); 5] = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#.to_string(),
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string(),
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_string(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string(),
        ),
        ("xl/worksheets/sheet1.xml", sheet),
    ];

    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, body) in parts.iter() {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_spreadsheet_parser_can_parse() {
        assert!(SpreadsheetParser.can_parse("xlsx"));
        assert!(SpreadsheetParser.can_parse("xls"));
        assert!(!SpreadsheetParser.can_parse("csv"));
    }

    #[test]
    fn test_split_profiles_prefers_semicolon() {
        assert_eq!(split_profiles("SDE; QA, Intern"), vec!["SDE", "QA, Intern"]);
        assert_eq!(split_profiles("SDE, QA"), vec!["SDE", "QA"]);
        assert_eq!(split_profiles("SDE;;"), vec!["SDE"]);
    }

    #[test]
    fn test_parse_first_sheet_rows() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("companies.xlsx");
        write_xlsx(
            &path,
            &[
                &["company name", "profiles", "poc name", "pocEmail", "pocStatus", "extra"],
                &["Acme", "SDE;QA", "Asha", "a@x.com", "rejected", "ignored"],
                &["Globex", "Analyst", "", "", "", ""],
                &["", "Orphan", "Nobody", "n@x.com", "", ""],
            ],
        );

        let candidates = SpreadsheetParser.parse(&path).unwrap();
        assert_eq!(candidates.len(), 2);

        assert_eq!(candidates[0].name, "Acme");
        assert_eq!(candidates[0].profiles, vec!["SDE", "QA"]);
        assert_eq!(candidates[0].pocs.len(), 1);
        assert_eq!(candidates[0].pocs[0].name, "Asha");
        assert_eq!(candidates[0].pocs[0].status, Some(PocStatus::Rejected));
        assert_eq!(candidates[0].pocs[0].phone, None);

        assert_eq!(candidates[1].name, "Globex");
        assert!(candidates[1].pocs.is_empty());
    }

    #[test]
    fn test_name_alias_precedence() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("aliases.xlsx");
        write_xlsx(
            &path,
            &[
                &["companyName", "name", "pocName"],
                &["Long Name Inc", "Short", "Asha"],
                &["Fallback Ltd", "", ""],
            ],
        );

        let candidates = SpreadsheetParser.parse(&path).unwrap();
        assert_eq!(candidates[0].name, "Short");
        assert_eq!(candidates[0].pocs[0].email, None);
        assert_eq!(candidates[1].name, "Fallback Ltd");
    }

    #[test]
    fn test_repeated_header_keeps_first_column() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("repeated.xlsx");
        write_xlsx(
            &path,
            &[
                &["name", "profiles", "pocName", "name"],
                &["Acme", "SDE", "Asha", ""],
                &["Globex", "QA", "", "Ignored Corp"],
            ],
        );

        let candidates = SpreadsheetParser.parse(&path).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "Acme");
        assert_eq!(candidates[0].pocs[0].name, "Asha");
        assert_eq!(candidates[1].name, "Globex");
    }

    #[test]
    fn test_header_only_sheet_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("header.xlsx");
        write_xlsx(&path, &[&["name", "profiles"]]);

        assert!(SpreadsheetParser.parse(&path).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_workbook_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.xlsx");
        std::fs::write(&path, b"this is not a zip archive").unwrap();

        let err = SpreadsheetParser.parse(&path).unwrap_err();
        assert!(matches!(err, PocdeskError::Parse(_)));
    }
}
