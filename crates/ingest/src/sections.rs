//! Section boundary detection for SEC filings.
//!
//! A fixed table of item-heading patterns is matched against the full
//! filing body; every match across every pattern becomes a boundary, and
//! each section runs from its own heading to the next boundary (or end of
//! document). Headings repeat in real filings (table of contents vs. the
//! actual section), so all matches are kept and the last occurrence of a
//! section name wins.

use std::fmt;

use indexmap::IndexMap;
use regex::Regex;

/// Sections whose heading length or stub content is at or below this many
/// characters are treated as false-positive matches and dropped.
const MIN_SECTION_CHARS: usize = 100;

/// The closed set of recognized filing sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    RiskFactors,
    ManagementDiscussion,
    Business,
    FinancialStatements,
    LegalProceedings,
    Controls,
}

impl SectionKind {
    /// The tag used in chunk ids and warehouse rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::RiskFactors => "RISK_FACTORS",
            SectionKind::ManagementDiscussion => "MD&A",
            SectionKind::Business => "BUSINESS",
            SectionKind::FinancialStatements => "FINANCIAL_STATEMENTS",
            SectionKind::LegalProceedings => "LEGAL_PROCEEDINGS",
            SectionKind::Controls => "CONTROLS",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scans filing text for known item headings and slices it into sections.
pub struct SectionExtractor {
    patterns: Vec<(SectionKind, Regex)>,
}

impl Default for SectionExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionExtractor {
    pub fn new() -> Self {
        // Case-insensitive, tolerant of optional punctuation and both
        // apostrophe variants in "Management's".
        let table: &[(SectionKind, &str)] = &[
            (SectionKind::RiskFactors, r"(?i)item\s*1a\.?\s*risk\s*factors"),
            (
                SectionKind::ManagementDiscussion,
                r"(?i)item\s*7\.?\s*management['’]?s?\s*discussion",
            ),
            (SectionKind::Business, r"(?i)item\s*1\.?\s*business"),
            (
                SectionKind::FinancialStatements,
                r"(?i)item\s*8\.?\s*financial\s*statements",
            ),
            (
                SectionKind::LegalProceedings,
                r"(?i)item\s*3\.?\s*legal\s*proceedings",
            ),
            (SectionKind::Controls, r"(?i)item\s*9a\.?\s*controls"),
        ];
        let patterns = table
            .iter()
            .map(|(kind, pattern)| {
                (*kind, Regex::new(pattern).expect("section pattern is valid"))
            })
            .collect();
        Self { patterns }
    }

    /// Slice `body` into named sections, keyed in ascending order of first
    /// appearance. When a heading matches more than once, the text of the
    /// last occurrence overwrites earlier ones while the key keeps its
    /// original position (known table-of-contents edge case, preserved for
    /// downstream id stability).
    ///
    /// No matches yields an empty map — the caller treats the filing as
    /// unsectioned, not as an error.
    pub fn extract_sections(&self, body: &str) -> IndexMap<SectionKind, String> {
        let mut boundaries: Vec<(usize, SectionKind)> = Vec::new();
        for (kind, pattern) in &self.patterns {
            for m in pattern.find_iter(body) {
                boundaries.push((m.start(), *kind));
            }
        }
        // Stable sort: ties keep pattern-table order.
        boundaries.sort_by_key(|(start, _)| *start);

        let mut sections = IndexMap::new();
        for (i, (start, kind)) in boundaries.iter().enumerate() {
            let end = boundaries
                .get(i + 1)
                .map(|(next_start, _)| *next_start)
                .unwrap_or(body.len());
            let text = body[*start..end].trim();
            if text.chars().count() > MIN_SECTION_CHARS {
                sections.insert(*kind, text.to_string());
            }
        }
        sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filler(n: usize) -> String {
        "x".repeat(n)
    }

    #[test]
    fn extracts_two_sections_with_correct_boundaries() {
        let body = format!(
            "ITEM 1A. RISK FACTORS\n{}\nITEM 7. MANAGEMENT'S DISCUSSION\n{}",
            filler(200),
            filler(200)
        );
        let extractor = SectionExtractor::new();
        let sections = extractor.extract_sections(&body);

        assert_eq!(sections.len(), 2);
        let risk = &sections[&SectionKind::RiskFactors];
        let mdna = &sections[&SectionKind::ManagementDiscussion];
        assert!(risk.starts_with("ITEM 1A. RISK FACTORS"));
        assert!(!risk.contains("MANAGEMENT"));
        assert!(mdna.starts_with("ITEM 7. MANAGEMENT'S DISCUSSION"));
    }

    #[test]
    fn sections_keyed_in_ascending_offset_order() {
        let body = format!(
            "Item 8. Financial Statements\n{}\nItem 1A. Risk Factors\n{}\nItem 3. Legal Proceedings\n{}",
            filler(150),
            filler(150),
            filler(150)
        );
        let sections = SectionExtractor::new().extract_sections(&body);
        let keys: Vec<&str> = sections.keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["FINANCIAL_STATEMENTS", "RISK_FACTORS", "LEGAL_PROCEEDINGS"]
        );
    }

    #[test]
    fn short_section_is_discarded() {
        // Risk factors heading immediately followed by the next heading:
        // the slice is under the content threshold and must not appear.
        let body = format!(
            "Item 1A. Risk Factors\nSee below.\nItem 7. Management's Discussion\n{}",
            filler(300)
        );
        let sections = SectionExtractor::new().extract_sections(&body);
        assert!(!sections.contains_key(&SectionKind::RiskFactors));
        assert!(sections.contains_key(&SectionKind::ManagementDiscussion));
    }

    #[test]
    fn repeated_heading_last_occurrence_wins_keeping_position() {
        // TOC-style mention first, real section later: the later slice
        // overwrites the earlier one, and the key keeps its first position.
        let toc_stub = filler(150);
        let real = format!("the actual risk discussion {}", filler(200));
        let body = format!(
            "Item 1A. Risk Factors {toc_stub}\nItem 7. Management's Discussion\n{}\nItem 1A. Risk Factors {real}",
            filler(200)
        );
        let sections = SectionExtractor::new().extract_sections(&body);

        let keys: Vec<&str> = sections.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["RISK_FACTORS", "MD&A"]);
        assert!(sections[&SectionKind::RiskFactors].contains("actual risk discussion"));
    }

    #[test]
    fn apostrophe_variants_match_mdna() {
        for heading in [
            "Item 7. Management's Discussion",
            "Item 7. Management\u{2019}s Discussion",
            "ITEM 7 MANAGEMENTS DISCUSSION",
        ] {
            let body = format!("{heading}\n{}", filler(200));
            let sections = SectionExtractor::new().extract_sections(&body);
            assert!(
                sections.contains_key(&SectionKind::ManagementDiscussion),
                "should match: {heading}"
            );
        }
    }

    #[test]
    fn no_headings_yields_empty_map() {
        let sections =
            SectionExtractor::new().extract_sections("plain prose with no item headings at all");
        assert!(sections.is_empty());
    }

    #[test]
    fn empty_body_yields_empty_map() {
        assert!(SectionExtractor::new().extract_sections("").is_empty());
    }
}
