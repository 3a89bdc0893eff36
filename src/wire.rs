//! XML wire formats for the search and summary endpoints.
//!
//! These mirror the shapes returned by an Entrez-style `esearch`/`esummary`
//! pair closely enough to round-trip through `quick_xml`'s serde support;
//! fields the pipeline never reads are omitted rather than modeled.

use serde::{Deserialize, Serialize};

/// Response to an `esearch` request: a record count plus, when
/// `use_history` is set, the history-server handle (`WebEnv`/`QueryKey`)
/// used to fetch summaries without resending the search term.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename = "eSearchResult")]
pub struct ESearchResult {
    #[serde(rename = "Count", default)]
    pub count: u64,
    #[serde(rename = "RetMax", default)]
    pub ret_max: u64,
    #[serde(rename = "RetStart", default)]
    pub ret_start: u64,
    #[serde(rename = "QueryKey", default)]
    pub query_key: String,
    #[serde(rename = "WebEnv", default)]
    pub web_env: String,
}

impl ESearchResult {
    #[must_use]
    pub fn has_history(&self) -> bool {
        !self.web_env.is_empty() && !self.query_key.is_empty()
    }
}

/// Cross-reference into another database (e.g. `dbSNP`) carried on a variant.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VariationXref {
    #[serde(rename = "DbSource", default)]
    pub db_source: String,
    #[serde(rename = "DbId", default)]
    pub db_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VariationXrefs {
    #[serde(rename = "VariationXref", default)]
    pub variation_xref: Vec<VariationXref>,
}

/// One genome build's placement of a variant.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Assembly {
    #[serde(rename = "AssemblyName", default)]
    pub assembly_name: String,
    #[serde(rename = "Chr", default)]
    pub chr: String,
    #[serde(rename = "Start", default)]
    pub start: String,
    #[serde(rename = "Stop", default)]
    pub stop: String,
    #[serde(rename = "AccessionVersion", default)]
    pub accession_version: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VariationLoc {
    #[serde(rename = "AssemblySet", default)]
    pub assembly_set: Vec<Assembly>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Variation {
    #[serde(rename = "MeasureId", default)]
    pub measure_id: String,
    #[serde(rename = "CdnaChange", default)]
    pub cdna_change: String,
    #[serde(rename = "CanonicalSPDI", default)]
    pub canonical_spdi: String,
    #[serde(rename = "VariantType", default)]
    pub variant_type: String,
    #[serde(rename = "VariationXrefs", default)]
    pub variation_xrefs: VariationXrefs,
    #[serde(rename = "VariationLoc", default)]
    pub variation_loc: VariationLoc,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VariationSet {
    #[serde(rename = "Variation", default)]
    pub variation: Variation,
}

/// A single named condition a variant has been classified against.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TraitInfo {
    #[serde(rename = "Name", default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TraitSet {
    #[serde(rename = "Trait", default)]
    pub r#trait: Vec<TraitInfo>,
}

/// One of the three classification axes a document carries: germline,
/// somatic clinical impact, or oncogenicity.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Classification {
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "LastEvaluated", default)]
    pub last_evaluated: String,
    #[serde(rename = "ReviewStatus", default)]
    pub review_status: String,
    #[serde(rename = "TraitSet", default)]
    pub trait_set: TraitSet,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Gene {
    #[serde(rename = "Symbol", default)]
    pub symbol: String,
    #[serde(rename = "GeneID", default)]
    pub gene_id: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GeneList {
    #[serde(rename = "Gene", default)]
    pub gene: Vec<Gene>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConsequenceList {
    #[serde(rename = "string", default)]
    pub string: Vec<String>,
}

/// One ClinVar-style record returned by `esummary`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DocumentSummary {
    #[serde(rename = "@uid", default)]
    pub uid: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "ProteinChange", default)]
    pub protein_change: String,
    #[serde(rename = "Accession", default)]
    pub accession: String,
    #[serde(rename = "AccessionVersion", default)]
    pub accession_version: String,
    #[serde(rename = "GermlineClassification", default)]
    pub germline_classification: Classification,
    #[serde(rename = "ClinicalImpactClassification", default)]
    pub clinical_impact_classification: Classification,
    #[serde(rename = "OncogenicityClassification", default)]
    pub oncogenicity_classification: Classification,
    #[serde(rename = "VariationSet", default)]
    pub variation_set: VariationSet,
    #[serde(rename = "Genes", default)]
    pub genes: GeneList,
    #[serde(rename = "MolecularConsequenceList", default)]
    pub molecular_consequence_list: ConsequenceList,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DocumentSummarySet {
    #[serde(rename = "DocumentSummary", default)]
    pub document_summary: Vec<DocumentSummary>,
}

/// Response to an `esummary` request, possibly spanning several batched
/// requests that the pipeline concatenates into one `DocumentSummarySet`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename = "eSummaryResult")]
pub struct ESummaryResult {
    #[serde(rename = "DocumentSummarySet", default)]
    pub document_summary_set: DocumentSummarySet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_result_without_history_reports_false() {
        let result = ESearchResult { count: 5, ..Default::default() };
        assert!(!result.has_history());
    }

    #[test]
    fn search_result_with_both_handles_reports_true() {
        let result = ESearchResult {
            count: 5,
            web_env: "NCID_1".into(),
            query_key: "1".into(),
            ..Default::default()
        };
        assert!(result.has_history());
    }

    #[test]
    fn parses_minimal_esearch_xml() {
        let xml = r"<eSearchResult><Count>42</Count><RetMax>20</RetMax><RetStart>0</RetStart><QueryKey>1</QueryKey><WebEnv>NCID_1</WebEnv></eSearchResult>";
        let parsed: ESearchResult = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(parsed.count, 42);
        assert_eq!(parsed.web_env, "NCID_1");
        assert!(parsed.has_history());
    }

    #[test]
    fn parses_esummary_with_one_document() {
        let xml = r#"<eSummaryResult><DocumentSummarySet><DocumentSummary uid="12345"><Title>BRCA1 variant</Title><Accession>VCV000012345</Accession></DocumentSummary></DocumentSummarySet></eSummaryResult>"#;
        let parsed: ESummaryResult = quick_xml::de::from_str(xml).unwrap();
        let docs = &parsed.document_summary_set.document_summary;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].uid, "12345");
        assert_eq!(docs[0].title, "BRCA1 variant");
    }
}
