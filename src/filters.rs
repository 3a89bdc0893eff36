//! Search-filter registry: eight independently toggled groups, each
//! contributing search-term tokens that are OR'd together within a group
//! and AND'd across groups.
//!
//! Rather than discover active filters via reflection over a config struct
//! at runtime, each group exposes a static table of `(field, token, label)`
//! triples and an `active()` method that walks its own boolean fields. This
//! keeps the token/label mapping colocated with the field it belongs to and
//! makes the whole registry `grep`-able.

use serde::{Deserialize, Serialize};

/// One (token, label) pair contributed by an enabled filter field.
type Entry = (&'static str, &'static str);

macro_rules! filter_group {
    ($name:ident { $($field:ident => ($token:literal, $label:literal)),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
        pub struct $name {
            $(#[serde(default)] pub $field: bool,)+
        }

        impl $name {
            #[must_use]
            pub fn active(&self) -> Vec<Entry> {
                let mut out = Vec::new();
                $(if self.$field { out.push(($token, $label)); })+
                out
            }
        }
    };
}

filter_group!(ClassificationType {
    germline => ("\"germline_classification\"[PROP]", "Germline"),
    somatic => ("(\"somatic_clinical_impact_classification\"[PROP] OR \"oncogenicity_classification\"[PROP])", "Somatic"),
});

filter_group!(GermlineClassification {
    conflicting_classifications => ("\"clinsig has conflicts\"[Properties]", "Conflicting classifications"),
    benign => ("\"clinsig benign\"[Properties]", "Benign"),
    likely_benign => ("\"clinsig likely benign\"[Properties]", "Likely benign"),
    uncertain_significance => ("(\"clinsig vus\"[Properties] OR \"clinsig uncertain\"[Properties])", "Uncertain significance"),
    likely_pathogenic => ("(\"clinsig likely pathogenic\"[Properties] OR \"clinsig likely pathogenic low penetrance\"[Properties])", "Likely pathogenic"),
    pathogenic => ("(\"clinsig pathogenic\"[Properties] OR \"clinsig pathogenic low penetrance\"[Properties])", "Pathogenic"),
});

filter_group!(TypesOfConflicts {
    plp_vs_lbb => ("\"clinsig conf plp vs lbb\"[Properties]", "P/LP vs LB/B"),
    plp_vs_vus => ("\"clinsig conf plp vs vus\"[Properties]", "P/LP vs VUS"),
    vus_vs_lbb => ("\"clinsig conf vus vs lbb\"[Properties]", "VUS vs LB/B"),
});

filter_group!(MolecularConsequence {
    frameshift => ("\"frameshift variant\"[molecular consequence]", "Frameshift"),
    missense => ("(\"missense variant\"[molecular consequence] OR \"missense codon variant\"[molecular consequence])", "Missense"),
    nonsense => ("(\"nonsense variant\"[molecular consequence] OR \"stop gained\"[molecular consequence])", "Nonsense"),
    splice_site => ("(\"splice acceptor variant\"[molecular consequence] OR \"splice donor variant\"[molecular consequence])", "Splice site"),
    nc_rna => ("\"non-coding transcript variant\"[molecular consequence]", "ncRNA"),
    near_gene => ("(\"upstream transcript variant\"[molecular consequence] OR \"downstream transcript variant\"[molecular consequence])", "Near gene"),
    utr => ("(\"5 prime UTR variant\"[molecular consequence] OR \"3 prime UTR variant\"[molecular consequence])", "UTR"),
});

filter_group!(VariationType {
    deletion => ("(\"deletion\"[Properties] OR \"copy number loss\"[Properties] OR \"indel\"[Properties])", "Deletion"),
    duplication => ("(\"duplication\"[Properties] OR \"copy number gain\"[Properties])", "Duplication"),
    indel => ("\"indel\"[Properties]", "Indel"),
    insertion => ("\"insertion\"[Properties]", "Insertion"),
    single_nucleotide => ("\"single nucleotide variant\"[Properties]", "Single nucleotide"),
});

filter_group!(VariationSize {
    short_variant_less_than_50bps => ("0[VARLEN]:49[VARLEN]", "Short variant (< 50 bps)"),
    structural_variant_great_than_50bps => ("50[VARLEN]:2000000000[VARLEN]", "Structural variant (>= 50 bps)"),
});

filter_group!(VariantLength {
    less_than_1kb_single_gene => ("1[VARLEN]:1000[VARLEN] AND \"single gene\"[Properties]", "< 1kb, single gene"),
    great_than_1kb_single_gene => ("1001[VARLEN]:2000000000[VARLEN] AND \"single gene\"[Properties]", "> 1kb, single gene"),
    great_than_1kb_multiple_genes => ("1001[VARLEN]:2000000000[VARLEN] AND \"multiple genes\"[Properties]", "> 1kb, multiple genes"),
});

filter_group!(ReviewStatus {
    practice_guideline => ("\"practice guideline\"[Review status]", "Practice guideline"),
    expert_panel => ("\"reviewed by expert panel\"[Review status]", "Reviewed by expert panel"),
    multiple_submitters => ("\"criteria provided, multiple submitters, no conflicts\"[Review status]", "Multiple submitters, no conflicts"),
    single_submitter => ("\"criteria provided, single submitter\"[Review status]", "Single submitter"),
    at_least_one_star => (
        "(\"practice guideline\"[Review status] OR \"reviewed by expert panel\"[Review status] OR \"criteria provided, multiple submitters, no conflicts\"[Review status] OR \"criteria provided, single submitter\"[Review status] OR \"criteria provided, conflicting classifications\"[Review status])",
        "At least one star"
    ),
    conflicting_classifications => ("\"criteria provided, conflicting classifications\"[Review status]", "Conflicting classifications"),
});

/// The full set of filter groups loaded from the filters file.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct FiltersFile {
    #[serde(default)]
    pub classification_type: ClassificationType,
    #[serde(default)]
    pub germline_classification: GermlineClassification,
    #[serde(default)]
    pub types_of_conflicts: TypesOfConflicts,
    #[serde(default)]
    pub molecular_consequence: MolecularConsequence,
    #[serde(default)]
    pub variation_type: VariationType,
    #[serde(default)]
    pub variation_size: VariationSize,
    #[serde(default)]
    pub variant_length: VariantLength,
    #[serde(default)]
    pub review_status: ReviewStatus,
}

impl FiltersFile {
    fn groups(&self) -> [Vec<Entry>; 8] {
        [
            self.classification_type.active(),
            self.germline_classification.active(),
            self.types_of_conflicts.active(),
            self.molecular_consequence.active(),
            self.variation_type.active(),
            self.variation_size.active(),
            self.variant_length.active(),
            self.review_status.active(),
        ]
    }

    #[must_use]
    pub fn has_any_active(&self) -> bool {
        self.groups().iter().any(|g| !g.is_empty())
    }

    /// Builds the combined search-string fragment: each active group's
    /// tokens are OR'd (parenthesized only when more than one token is
    /// active), and the groups themselves are AND'd, with the whole
    /// expression wrapped in one outer set of parens. Returns an empty
    /// string when no filter is active.
    #[must_use]
    pub fn build_query_string(&self) -> String {
        let group_strings: Vec<String> = self
            .groups()
            .into_iter()
            .filter(|g| !g.is_empty())
            .map(|g| build_search_string(&g))
            .collect();

        if group_strings.is_empty() {
            return String::new();
        }

        format!("({})", group_strings.join(" AND "))
    }

    /// Human-readable, pipe-joined summary of every active filter label,
    /// for logging what was applied without re-parsing the search string.
    #[must_use]
    pub fn describe_active(&self) -> String {
        self.groups()
            .into_iter()
            .flat_map(|g| g.into_iter().map(|(_, label)| label))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

fn build_search_string(entries: &[Entry]) -> String {
    let tokens: Vec<&str> = entries.iter().map(|(token, _)| *token).collect();
    if tokens.len() == 1 {
        tokens[0].to_string()
    } else {
        format!("({})", tokens.join(" OR "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_active_filters_yields_empty_string() {
        let filters = FiltersFile::default();
        assert_eq!(filters.build_query_string(), "");
        assert!(!filters.has_any_active());
    }

    #[test]
    fn single_field_in_a_group_is_not_parenthesized_within_the_group() {
        let mut filters = FiltersFile::default();
        filters.classification_type.germline = true;
        let query = filters.build_query_string();
        assert_eq!(query, "(\"germline_classification\"[PROP])");
    }

    #[test]
    fn multiple_fields_in_one_group_are_or_joined_and_parenthesized() {
        let mut filters = FiltersFile::default();
        filters.classification_type.germline = true;
        filters.classification_type.somatic = true;
        let query = filters.build_query_string();
        assert!(query.contains(" OR "));
        assert!(query.starts_with("(("));
    }

    #[test]
    fn multiple_groups_are_and_joined() {
        let mut filters = FiltersFile::default();
        filters.classification_type.germline = true;
        filters.review_status.expert_panel = true;
        let query = filters.build_query_string();
        assert!(query.contains(" AND "));
        assert!(filters.has_any_active());
    }

    #[test]
    fn describe_active_lists_human_readable_labels() {
        let mut filters = FiltersFile::default();
        filters.classification_type.germline = true;
        filters.review_status.expert_panel = true;
        let desc = filters.describe_active();
        assert_eq!(desc, "Germline | Reviewed by expert panel");
    }

    #[test]
    fn deserializes_from_partial_yaml() {
        let yaml = "classification_type:\n  germline: true\n";
        let filters: FiltersFile = serde_yaml::from_str(yaml).unwrap();
        assert!(filters.classification_type.germline);
        assert!(!filters.classification_type.somatic);
        assert!(!filters.review_status.expert_panel);
    }
}
