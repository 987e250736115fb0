//! Field normalisation.
//!
//! Pure functions that turn raw text cells from variant-caller exports and
//! the curated sheet into canonical values: gene lists, allele-frequency
//! tokens and tumor/tissue category labels.

use std::collections::HashSet;

use crate::error::FieldError;

/// Canonical wildcard label meaning "no constraint" for a category dimension.
pub const ANY_LABEL: &str = "Any";

/// Separator used by variant callers for gene fusions, e.g. `TMPRSS2(1) - ERG(2)`.
const FUSION_SEPARATOR: &str = " - ";

/// Separator between alleles in a multi-allele frequency cell.
const ALLELE_SEPARATOR: &str = ", ";

/// Token returned for a missing allele frequency.
const MISSING_AF: &str = "nan";

// ── Genes ────────────────────────────────────────────────────────────────────

/// Parse a gene cell into an ordered, de-duplicated list of gene identifiers.
///
/// Fusion notation (`" - "`) and comma lists are checked independently and
/// their results unioned; text matching neither is returned as a single gene.
///
/// ```
/// use varinterp_common::parse_genes;
/// assert_eq!(parse_genes("TMPRSS2(1) - ERG(2)"), vec!["TMPRSS2", "ERG"]);
/// assert_eq!(parse_genes("EGFR,EGFR-AS1"), vec!["EGFR", "EGFR-AS1"]);
/// assert_eq!(parse_genes("NRAS"), vec!["NRAS"]);
/// ```
pub fn parse_genes(text: &str) -> Vec<String> {
    let mut genes = Vec::new();
    let mut seen = HashSet::new();

    if text.contains(FUSION_SEPARATOR) {
        for part in text.split(FUSION_SEPARATOR) {
            // drop the exon/breakpoint suffix: "TMPRSS2(1)" -> "TMPRSS2"
            let gene = part.find('(').map_or(part, |idx| &part[..idx]);
            push_unique(&mut genes, &mut seen, gene.trim());
        }
    }

    if text.contains(',') {
        for part in text.split(',') {
            push_unique(&mut genes, &mut seen, part.trim());
        }
    }

    if genes.is_empty() {
        genes.push(text.to_string());
    }

    genes
}

fn push_unique(genes: &mut Vec<String>, seen: &mut HashSet<String>, gene: &str) {
    if seen.insert(gene.to_string()) {
        genes.push(gene.to_string());
    }
}

// ── Allele frequencies ───────────────────────────────────────────────────────

/// Parse a `% Frequency` cell into string tokens, keeping only non-zero alleles.
///
/// `None` (or a cell that reads as missing) yields `["nan"]`. A cell without
/// `", "` is returned unchanged. A multi-allele cell is filtered down to the
/// parts whose value is non-zero; if every part is zero the cell is returned
/// unchanged so the result is never empty.
pub fn parse_allele_frequency(raw: Option<&str>) -> Result<Vec<String>, FieldError> {
    let raw = match raw {
        Some(raw) if !is_missing(raw) => raw,
        _ => return Ok(vec![MISSING_AF.to_string()]),
    };

    let parts: Vec<&str> = raw.split(ALLELE_SEPARATOR).collect();
    if parts.len() <= 1 {
        return Ok(vec![raw.to_string()]);
    }

    let mut afs = Vec::with_capacity(parts.len());
    for part in parts {
        let malformed = || FieldError::MalformedAlleleFrequency {
            raw: raw.to_string(),
            part: part.to_string(),
        };
        let mut fields = part.split('=');
        let _allele = fields.next();
        let value: f64 = fields
            .next()
            .ok_or_else(malformed)?
            .trim()
            .parse()
            .map_err(|_| malformed())?;
        if value != 0.0 {
            afs.push(part.to_string());
        }
    }

    if afs.is_empty() {
        afs.push(raw.to_string());
    }
    Ok(afs)
}

/// Cell values the variant caller (or a spreadsheet export) uses for "no value".
pub fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty()
        || cell.eq_ignore_ascii_case("nan")
        || cell.eq_ignore_ascii_case("null")
        || cell == "NA"
        || cell == "N/A"
}

// ── Category labels ──────────────────────────────────────────────────────────

/// Canonicalise a tumor or tissue type label.
///
/// Trims, title-cases unless the label is entirely upper case, and maps the
/// empty label and `All` (any casing) to [`ANY_LABEL`].
pub fn canonicalize_category(label: &str) -> String {
    let trimmed = label.trim();
    let cased = if is_upper(trimmed) {
        trimmed.to_string()
    } else {
        title_case(trimmed)
    };

    if cased.is_empty() || cased.eq_ignore_ascii_case("all") || cased.eq_ignore_ascii_case(ANY_LABEL) {
        ANY_LABEL.to_string()
    } else {
        cased
    }
}

/// Upper-case the first cased character of every word and lower-case the rest.
/// A word starts after any character that is not itself cased, so
/// `"her2-positive"` becomes `"Her2-Positive"`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_cased = false;
    for c in text.chars() {
        if prev_cased {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_cased = is_cased(c);
    }
    out
}

/// True when the text has at least one cased character and none are lower case.
fn is_upper(text: &str) -> bool {
    let mut any_cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        any_cased |= c.is_uppercase();
    }
    any_cased
}

fn is_cased(c: char) -> bool {
    c.is_uppercase() || c.is_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_parse_genes_fusion() {
        assert_eq!(parse_genes("TMPRSS2(1) - ERG(2)"), vec!["TMPRSS2", "ERG"]);
    }

    #[test]
    fn test_parse_genes_comma_list() {
        assert_eq!(parse_genes("EGFR,EGFR-AS1"), vec!["EGFR", "EGFR-AS1"]);
    }

    #[test]
    fn test_parse_genes_single() {
        assert_eq!(parse_genes("NRAS"), vec!["NRAS"]);
    }

    #[test]
    fn test_parse_genes_dedups_in_order() {
        assert_eq!(parse_genes("KRAS, NRAS, KRAS"), vec!["KRAS", "NRAS"]);
        assert_eq!(parse_genes("ERG(2) - ERG(5)"), vec!["ERG"]);
    }

    #[test]
    fn test_parse_genes_fusion_and_comma_are_unioned() {
        // both rules fire on the same text
        let genes = parse_genes("A(1) - B,C");
        assert_eq!(genes, vec!["A", "B,C", "A(1) - B", "C"]);
    }

    #[test]
    fn test_parse_af_multi_allele_keeps_non_zero() {
        let afs = parse_allele_frequency(Some("AA=0.00, AG=0.00, CG=11.27, CT=0.00, GG=0.00")).unwrap();
        assert_eq!(afs, vec!["CG=11.27"]);
    }

    #[test]
    fn test_parse_af_single_value_passthrough() {
        assert_eq!(parse_allele_frequency(Some("9.09")).unwrap(), vec!["9.09"]);
        assert_eq!(parse_allele_frequency(Some("38.44")).unwrap(), vec!["38.44"]);
        // a lone zero is not filtered
        assert_eq!(parse_allele_frequency(Some("0.00")).unwrap(), vec!["0.00"]);
    }

    #[test]
    fn test_parse_af_missing() {
        assert_eq!(parse_allele_frequency(None).unwrap(), vec!["nan"]);
        assert_eq!(parse_allele_frequency(Some("")).unwrap(), vec!["nan"]);
        assert_eq!(parse_allele_frequency(Some("NaN")).unwrap(), vec!["nan"]);
    }

    #[test]
    fn test_parse_af_all_zero_returns_cell() {
        let afs = parse_allele_frequency(Some("AA=0.00, AG=0.00")).unwrap();
        assert_eq!(afs, vec!["AA=0.00, AG=0.00"]);
    }

    #[test]
    fn test_parse_af_malformed() {
        let err = parse_allele_frequency(Some("AA=0.00, AG=high")).unwrap_err();
        assert_eq!(
            err,
            FieldError::MalformedAlleleFrequency {
                raw: "AA=0.00, AG=high".to_string(),
                part: "AG=high".to_string(),
            }
        );
        assert!(parse_allele_frequency(Some("AA, AG")).is_err());
    }

    #[test]
    fn test_canonicalize_any_sentinel() {
        assert_eq!(canonicalize_category(""), "Any");
        assert_eq!(canonicalize_category("All"), "Any");
        assert_eq!(canonicalize_category("ALL"), "Any");
        assert_eq!(canonicalize_category("  all "), "Any");
        assert_eq!(canonicalize_category("any"), "Any");
    }

    #[test]
    fn test_canonicalize_casing() {
        assert_eq!(canonicalize_category("EGFR"), "EGFR");
        assert_eq!(canonicalize_category("the rain in spain"), "The Rain In Spain");
        assert_eq!(
            canonicalize_category("adamantinomatous craniopharyngioma "),
            "Adamantinomatous Craniopharyngioma"
        );
        assert_eq!(canonicalize_category("non-small cell lung cancer"), "Non-Small Cell Lung Cancer");
    }

    #[test]
    fn test_title_case_word_boundaries() {
        assert_eq!(title_case("her2-positive"), "Her2-Positive");
        assert_eq!(title_case("mIxEd CaSe"), "Mixed Case");
        assert_eq!(title_case(""), "");
    }

    proptest! {
        #[test]
        fn prop_plain_text_is_single_gene(text in "[A-Za-z0-9()\\- ]{1,24}") {
            prop_assume!(!text.contains(" - ") && !text.contains(','));
            prop_assert_eq!(parse_genes(&text), vec![text.clone()]);
        }

        #[test]
        fn prop_parse_genes_idempotent_on_comma_lists(
            genes in proptest::collection::vec("[A-Z][A-Z0-9\\-]{0,7}", 1..6)
        ) {
            let first = parse_genes(&genes.join(","));
            let second = parse_genes(&first.join(","));
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_parse_genes_idempotent_on_fusions(
            a in "[A-Z][A-Z0-9]{0,7}", b in "[A-Z][A-Z0-9]{0,7}",
            i in 1u8..30, j in 1u8..30,
        ) {
            let first = parse_genes(&format!("{a}({i}) - {b}({j})"));
            let second = parse_genes(&first.join(","));
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_parse_af_never_empty(raw in proptest::option::of("[A-Z=0-9., ]{0,30}")) {
            if let Ok(afs) = parse_allele_frequency(raw.as_deref()) {
                prop_assert!(!afs.is_empty());
            }
        }
    }
}
