pub mod delimited;
pub mod spreadsheet;

use std::path::Path;

use crate::error::{PocdeskError, Result};
use crate::model::CandidateRecord;

/// Trait for tabular upload parsers
pub trait Parser: Send + Sync {
    /// Short format name for logs
    fn format(&self) -> &'static str;

    /// Check if this parser can handle the given (lower-case) file extension
    fn can_parse(&self, extension: &str) -> bool;

    /// Parse a file into candidate records, one per accepted row.
    ///
    /// Missing optional columns read as absent, unknown columns are ignored and
    /// an empty file yields an empty list. Fails with `PocdeskError::Parse` when
    /// the file cannot be decoded in its expected structure.
    fn parse(&self, path: &Path) -> Result<Vec<CandidateRecord>>;
}

/// Parser registry that selects the parser by extension
pub struct ParserRegistry {
    parsers: Vec<Box<dyn Parser>>,
}

impl ParserRegistry {
    /// Create a new parser registry with all built-in parsers
    pub fn new() -> Self {
        let mut registry = Self {
            parsers: Vec::new(),
        };

        registry.register(Box::new(delimited::DelimitedParser));
        registry.register(Box::new(spreadsheet::SpreadsheetParser));

        registry
    }

    /// Register a parser
    pub fn register(&mut self, parser: Box<dyn Parser>) {
        self.parsers.push(parser);
    }

    /// Find a parser that can handle the given extension
    pub fn find_parser(&self, extension: &str) -> Option<&dyn Parser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(extension))
            .map(|p| p.as_ref())
    }

    /// Parse a file using the parser registered for its extension
    pub fn parse(&self, path: &Path, extension: &str) -> Result<Vec<CandidateRecord>> {
        let parser = self.find_parser(extension).ok_or_else(|| {
            PocdeskError::Validation(format!("No parser found for extension: {}", extension))
        })?;

        let candidates = parser.parse(path)?;
        log::debug!(
            "{} parser produced {} candidate row(s) from {}",
            parser.format(),
            candidates.len(),
            path.display()
        );
        Ok(candidates)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Zero-length uploads parse to nothing rather than failing in the decoder
pub(crate) fn is_empty_file(path: &Path) -> Result<bool> {
    Ok(std::fs::metadata(path)?.len() == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parser_registry() {
        let registry = ParserRegistry::new();

        assert_eq!(registry.find_parser("csv").unwrap().format(), "csv");
        assert_eq!(registry.find_parser("xlsx").unwrap().format(), "spreadsheet");
        assert_eq!(registry.find_parser("xls").unwrap().format(), "spreadsheet");
        assert!(registry.find_parser("txt").is_none());
    }

    #[test]
    fn test_registry_rejects_unknown_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.txt");
        std::fs::write(&path, "companyName\nAcme\n").unwrap();

        let err = ParserRegistry::new().parse(&path, "txt").unwrap_err();
        assert!(matches!(err, PocdeskError::Validation(_)));
    }

    #[test]
    fn test_empty_files_parse_to_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ParserRegistry::new();

        for ext in ["csv", "xlsx", "xls"] {
            let path = temp_dir.path().join(format!("empty.{}", ext));
            std::fs::write(&path, b"").unwrap();
            assert!(registry.parse(&path, ext).unwrap().is_empty(), "{} should be empty", ext);
        }
    }
}
