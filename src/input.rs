//! Reads the newline-delimited search-term file and groups terms into
//! batched queries.

use crate::error::PipelineError;
use crate::query::Query;
use std::collections::HashSet;
use std::path::Path;

/// Maps a `search_type` setting onto the Entrez field tag appended to each
/// term, e.g. `"gene symbol"` terms become `BRCA1[gene]`.
fn field_tag(search_type: &str) -> &'static str {
    match search_type {
        "protein" => "protein",
        "title" => "title",
        _ => "gene",
    }
}

/// Groups raw search terms from a file into `Query` values, each an
/// OR-expression of up to `batch_size` terms tagged with the configured
/// search field.
pub struct FileParser {
    batch_size: usize,
    search_type: String,
}

impl FileParser {
    #[must_use]
    pub fn new(batch_size: usize, search_type: impl Into<String>) -> Self {
        Self { batch_size: batch_size.max(1), search_type: search_type.into() }
    }

    /// # Errors
    ///
    /// Returns [`PipelineError::Input`] if the file cannot be read or
    /// contains no usable terms, and [`PipelineError::Io`] on I/O failure.
    pub async fn parse_file(&self, path: &Path) -> Result<Vec<Query>, PipelineError> {
        let content = tokio::fs::read_to_string(path).await?;
        let terms = Self::dedupe(Self::extract_terms(&content));

        if terms.is_empty() {
            return Err(PipelineError::input(format!("no search terms found in {}", path.display())));
        }

        Ok(self.group_terms(&terms))
    }

    fn extract_terms(content: &str) -> Vec<String> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect()
    }

    /// Drops exact-match repeats, keeping each term's first occurrence.
    fn dedupe(terms: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::with_capacity(terms.len());
        terms.into_iter().filter(|term| seen.insert(term.clone())).collect()
    }

    fn group_terms(&self, terms: &[String]) -> Vec<Query> {
        let tag = field_tag(&self.search_type);
        terms
            .chunks(self.batch_size)
            .map(|chunk| {
                let content = chunk
                    .iter()
                    .map(|term| format!("{term}[{tag}]"))
                    .collect::<Vec<_>>()
                    .join(" OR ");
                Query::new(content)
            })
            .collect()
    }
}
