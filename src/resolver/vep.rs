//! Parsing of Ensembl VEP responses
//!
//! The VEP endpoint returns one annotation entry per variant allele, each
//! with an optional list of transcript consequences.
use serde::Deserialize;

use crate::{EnrichResult, GeneSet};

#[derive(Debug, Deserialize)]
struct Annotation {
    #[serde(default)]
    transcript_consequences: Vec<TranscriptConsequence>,
}

#[derive(Debug, Deserialize)]
struct TranscriptConsequence {
    gene_symbol: Option<String>,
    gene_id: Option<String>,
}

impl TranscriptConsequence {
    /// The gene symbol, or the Ensembl gene ID if no symbol is annotated
    fn gene(self) -> Option<String> {
        self.gene_symbol.or(self.gene_id)
    }
}

/// Returns the union of genes of all transcript consequences
///
/// # Errors
///
/// Returns [`crate::EnrichError::Json`] if the body is not a list of annotations
pub(super) fn genes_from_response(body: &str) -> EnrichResult<GeneSet> {
    let annotations: Vec<Annotation> = serde_json::from_str(body)?;
    Ok(annotations
        .into_iter()
        .flat_map(|entry| entry.transcript_consequences)
        .filter_map(TranscriptConsequence::gene)
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn symbols_and_ids() {
        let body = r#"[
            {"id": "rs1", "transcript_consequences": [
                {"gene_symbol": "APOE", "gene_id": "ENSG00000130203"},
                {"gene_id": "ENSG00000234906"},
                {"gene_symbol": "APOE"}
            ]},
            {"id": "rs1", "transcript_consequences": [{"gene_symbol": "TOMM40"}]},
            {"id": "rs1"}
        ]"#;
        let genes = genes_from_response(body).unwrap();
        assert_eq!(genes.len(), 3);
        assert!(genes.contains("APOE"));
        assert!(genes.contains("TOMM40"));
        assert!(genes.contains("ENSG00000234906"));
    }

    #[test]
    fn empty_annotation() {
        assert!(genes_from_response("[]").unwrap().is_empty());
    }

    #[test]
    fn consequence_without_gene() {
        let body = r#"[{"transcript_consequences": [{"impact": "MODIFIER"}]}]"#;
        assert!(genes_from_response(body).unwrap().is_empty());
    }

    #[test]
    fn malformed() {
        assert!(genes_from_response(r#"{"error": "not found"}"#).is_err());
        assert!(genes_from_response("<html>").is_err());
    }
}
