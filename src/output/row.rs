//! Maps one `DocumentSummary` onto the fixed 29-column output row.

use crate::wire::DocumentSummary;

pub const COLUMN_COUNT: usize = 29;

pub const HEADERS: [&str; COLUMN_COUNT] = [
    "Name",
    "Gene(s)",
    "GeneID",
    "Protein change",
    "Condition(s)",
    "Accession",
    "Accession Version",
    "GRCh37Chromosome",
    "GRCh37Location",
    "GRCh37AssemblyAccVer",
    "GRCh38Chromosome",
    "GRCh38Location",
    "GRCh38AssemblyAccVer",
    "VariationID",
    "AlleleID(s)",
    "dbSNP ID",
    "Cdna Change",
    "Canonical SPDI",
    "Variant type",
    "Molecular consequence",
    "Germline classification",
    "Germline date last evaluated",
    "Germline review status",
    "Somatic clinical impact",
    "Somatic clinical impact date last evaluated",
    "Somatic clinical impact review status",
    "Oncogenicity classification",
    "Oncogenicity date last evaluated",
    "Oncogenicity review status",
];

const PIPE: &str = "|";

fn joined<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join(PIPE)
}

/// `start-stop` when the two differ, else the bare `start` value; empty if
/// `start` itself is empty (the assembly wasn't reported for this variant).
fn format_location(start: &str, stop: &str) -> String {
    if start.is_empty() {
        return String::new();
    }
    if start == stop || stop.is_empty() {
        start.to_string()
    } else {
        format!("{start}-{stop}")
    }
}

fn assembly<'a>(doc: &'a DocumentSummary, name: &str) -> (&'a str, String, &'a str) {
    doc.variation_set
        .variation
        .variation_loc
        .assembly_set
        .iter()
        .find(|a| a.assembly_name == name)
        .map_or(("", String::new(), ""), |a| {
            (a.chr.as_str(), format_location(&a.start, &a.stop), a.accession_version.as_str())
        })
}

#[must_use]
pub fn build_row(doc: &DocumentSummary) -> [String; COLUMN_COUNT] {
    let genes = joined(doc.genes.gene.iter().map(|g| g.symbol.as_str()));
    let gene_ids = joined(doc.genes.gene.iter().map(|g| g.gene_id.as_str()));
    let conditions = joined(doc.germline_classification.trait_set.r#trait.iter().map(|t| t.name.as_str()));
    let db_snp_ids: Vec<String> = doc
        .variation_set
        .variation
        .variation_xrefs
        .variation_xref
        .iter()
        .filter(|x| x.db_source == "dbSNP")
        .map(|x| format!("rs{}", x.db_id))
        .collect();
    let molecular_consequence = joined(doc.molecular_consequence_list.string.iter().map(String::as_str));

    let (grch37_chr, grch37_loc, grch37_ver) = assembly(doc, "GRCh37");
    let (grch38_chr, grch38_loc, grch38_ver) = assembly(doc, "GRCh38");

    [
        doc.title.clone(),
        genes,
        gene_ids,
        doc.protein_change.clone(),
        conditions,
        doc.accession.clone(),
        doc.accession_version.clone(),
        grch37_chr.to_string(),
        grch37_loc,
        grch37_ver.to_string(),
        grch38_chr.to_string(),
        grch38_loc,
        grch38_ver.to_string(),
        doc.uid.clone(),
        doc.variation_set.variation.measure_id.clone(),
        db_snp_ids.join(PIPE),
        doc.variation_set.variation.cdna_change.clone(),
        doc.variation_set.variation.canonical_spdi.clone(),
        doc.variation_set.variation.variant_type.clone(),
        molecular_consequence,
        doc.germline_classification.description.clone(),
        doc.germline_classification.last_evaluated.clone(),
        doc.germline_classification.review_status.clone(),
        doc.clinical_impact_classification.description.clone(),
        doc.clinical_impact_classification.last_evaluated.clone(),
        doc.clinical_impact_classification.review_status.clone(),
        doc.oncogenicity_classification.description.clone(),
        doc.oncogenicity_classification.last_evaluated.clone(),
        doc.oncogenicity_classification.review_status.clone(),
    ]
}
