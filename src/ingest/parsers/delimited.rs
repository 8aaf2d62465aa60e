use std::path::Path;

use super::{is_empty_file, Parser};
use crate::error::{PocdeskError, Result};
use crate::model::{non_empty, CandidatePoc, CandidateRecord, PocStatus};

/// CSV parser. Each row carries one company, at most one profile token and
/// at most one POC (only when `pocEmail` is present).
pub struct DelimitedParser;

/// Positions of the known columns. A repeated header resolves to its first
/// column; columns not listed here are ignored.
struct CsvColumns {
    company_name: Option<usize>,
    profiles: Option<usize>,
    poc_name: Option<usize>,
    poc_email: Option<usize>,
    poc_phone: Option<usize>,
    poc_status: Option<usize>,
    poc_remarks: Option<usize>,
}

impl CsvColumns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let position = |name: &str| headers.iter().position(|h| h == name);
        Self {
            company_name: position("companyName"),
            profiles: position("profiles"),
            poc_name: position("pocName"),
            poc_email: position("pocEmail"),
            poc_phone: position("pocPhone"),
            poc_status: position("pocStatus"),
            poc_remarks: position("pocRemarks"),
        }
    }

    fn row(&self, record: &csv::StringRecord) -> CsvRow {
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).map(str::to_string);
        CsvRow {
            company_name: cell(self.company_name),
            profiles: cell(self.profiles),
            poc_name: cell(self.poc_name),
            poc_email: cell(self.poc_email),
            poc_phone: cell(self.poc_phone),
            poc_status: cell(self.poc_status),
            poc_remarks: cell(self.poc_remarks),
        }
    }
}

/// One CSV row's known cells
#[derive(Debug)]
struct CsvRow {
    company_name: Option<String>,
    profiles: Option<String>,
    poc_name: Option<String>,
    poc_email: Option<String>,
    poc_phone: Option<String>,
    poc_status: Option<String>,
    poc_remarks: Option<String>,
}

impl CsvRow {
    fn into_candidate(self, line: u64) -> Option<CandidateRecord> {
        let name = non_empty(self.company_name.as_deref())?;
        let mut candidate = CandidateRecord::new(name);

        if let Some(profile) = non_empty(self.profiles.as_deref()) {
            candidate.profiles.push(profile);
        }

        if let Some(email) = non_empty(self.poc_email.as_deref()) {
            match non_empty(self.poc_name.as_deref()) {
                Some(poc_name) => candidate.pocs.push(CandidatePoc {
                    name: poc_name,
                    email: Some(email),
                    phone: non_empty(self.poc_phone.as_deref()),
                    status: self.poc_status.as_deref().and_then(PocStatus::from_cell),
                    remarks: non_empty(self.poc_remarks.as_deref()),
                }),
                None => log::warn!("Line {}: POC {} has no name, skipping POC", line, email),
            }
        }

        Some(candidate)
    }
}

impl Parser for DelimitedParser {
    fn format(&self) -> &'static str {
        "csv"
    }

    fn can_parse(&self, extension: &str) -> bool {
        extension == "csv"
    }

    fn parse(&self, path: &Path) -> Result<Vec<CandidateRecord>> {
        if is_empty_file(path)? {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_path(path)
            .map_err(|e| PocdeskError::Parse(format!("CSV open error in {}: {}", path.display(), e)))?;

        let headers = reader
            .headers()
            .map_err(|e| PocdeskError::Parse(format!("CSV header error: {}", e)))?
            .clone();
        let columns = CsvColumns::from_headers(&headers);

        let mut candidates = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result.map_err(|e| PocdeskError::Parse(format!("CSV parse error: {}", e)))?;
            // header is line 1
            let line = idx as u64 + 2;
            match columns.row(&record).into_candidate(line) {
                Some(candidate) => candidates.push(candidate),
                None => log::debug!("Skipping CSV row without companyName"),
            }
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse_str(content: &[u8]) -> Result<Vec<CandidateRecord>> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("upload.csv");
        std::fs::write(&path, content).unwrap();
        DelimitedParser.parse(&path)
    }

    #[test]
    fn test_delimited_parser_can_parse() {
        assert!(DelimitedParser.can_parse("csv"));
        assert!(!DelimitedParser.can_parse("xlsx"));
    }

    #[test]
    fn test_rows_become_candidates() {
        let candidates = parse_str(
            b"companyName,profiles,pocName,pocEmail,pocPhone,pocStatus,pocRemarks\n\
              Acme,SDE,Asha,a@x.com,123,Ongoing,warm lead\n\
              Globex,QA,,,,,\n",
        )
        .unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "Acme");
        assert_eq!(candidates[0].profiles, vec!["SDE"]);
        let poc = &candidates[0].pocs[0];
        assert_eq!(poc.email.as_deref(), Some("a@x.com"));
        assert_eq!(poc.phone.as_deref(), Some("123"));
        assert_eq!(poc.status, Some(PocStatus::Ongoing));
        assert_eq!(poc.remarks.as_deref(), Some("warm lead"));
        assert!(candidates[1].pocs.is_empty());
    }

    #[test]
    fn test_rows_without_company_name_are_skipped() {
        let candidates = parse_str(b"companyName,profiles\n,SDE\n   ,QA\nAcme,\n").unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Acme");
        assert!(candidates[0].profiles.is_empty());
    }

    #[test]
    fn test_poc_requires_email() {
        let candidates = parse_str(b"companyName,pocName,pocEmail\nAcme,Asha,\nAcme,Bilal,b@x.com\n").unwrap();
        assert!(candidates[0].pocs.is_empty());
        assert_eq!(candidates[1].pocs.len(), 1);
        assert_eq!(candidates[1].pocs[0].status, None);
    }

    #[test]
    fn test_missing_and_extra_columns_tolerated() {
        let candidates = parse_str(b"region,companyName,notes\nAPAC,Acme,hello\n").unwrap();
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].profiles.is_empty());
        assert!(candidates[0].pocs.is_empty());
    }

    #[test]
    fn test_repeated_header_uses_first_column() {
        let candidates = parse_str(b"companyName,profiles,profiles\nAcme,SDE,QA\nGlobex,,Analyst\n").unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].profiles, vec!["SDE"]);
        assert!(candidates[1].profiles.is_empty());
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let candidates = parse_str(b"companyName,profiles,pocEmail\n").unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let err = parse_str(b"companyName,profiles\n\xff\xfe,SDE\n").unwrap_err();
        assert!(matches!(err, PocdeskError::Parse(_)));
    }
}
