//! Parsing of MyVariant.info responses
//!
//! `gene` is either a single object or a list of objects, depending on
//! how many genes overlap the variant. Queries by rsID that match several
//! variants return a list of hits instead of a single document.
use serde::Deserialize;

use crate::{EnrichResult, GeneSet};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Response {
    Multiple(Vec<Hit>),
    Single(Hit),
}

#[derive(Debug, Deserialize)]
struct Hit {
    gene: Option<GeneField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeneField {
    Many(Vec<GeneInfo>),
    One(GeneInfo),
}

#[derive(Debug, Deserialize)]
struct GeneInfo {
    symbol: Option<String>,
}

impl Hit {
    fn symbols(self) -> Vec<String> {
        match self.gene {
            Some(GeneField::One(info)) => info.symbol.into_iter().collect(),
            Some(GeneField::Many(infos)) => infos.into_iter().filter_map(|i| i.symbol).collect(),
            None => Vec::new(),
        }
    }
}

/// Returns all gene symbols of the response
///
/// # Errors
///
/// Returns [`crate::EnrichError::Json`] if the body is not valid JSON
/// or has an unexpected shape
pub(super) fn genes_from_response(body: &str) -> EnrichResult<GeneSet> {
    let response: Response = serde_json::from_str(body)?;
    let genes = match response {
        Response::Single(hit) => hit.symbols().into_iter().collect(),
        Response::Multiple(hits) => hits.into_iter().flat_map(Hit::symbols).collect(),
    };
    Ok(genes)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_gene_object() {
        let body = r#"{"_id": "chr19:g.45411941T>C", "gene": {"symbol": "APOE"}}"#;
        let genes = genes_from_response(body).unwrap();
        assert_eq!(genes, GeneSet::from(["APOE".to_string()]));
    }

    #[test]
    fn list_of_gene_objects() {
        let body = r#"{"gene": [{"symbol": "APOE"}, {"symbol": "APOC1"}, {"geneid": 1}, {"symbol": "APOE"}]}"#;
        let genes = genes_from_response(body).unwrap();
        assert_eq!(
            genes,
            GeneSet::from(["APOE".to_string(), "APOC1".to_string()])
        );
    }

    #[test]
    fn no_gene_field() {
        let body = r#"{"_id": "chr1:g.1000A>G"}"#;
        assert!(genes_from_response(body).unwrap().is_empty());
    }

    #[test]
    fn single_hit_list() {
        let body = r#"[{"gene": {"symbol": "A"}}]"#;
        let genes = genes_from_response(body).unwrap();
        assert_eq!(genes, GeneSet::from(["A".to_string()]));
    }

    #[test]
    fn multiple_hits() {
        let body = r#"[{"gene": {"symbol": "A"}}, {"gene": [{"symbol": "B"}]}, {}]"#;
        let genes = genes_from_response(body).unwrap();
        assert_eq!(genes, GeneSet::from(["A".to_string(), "B".to_string()]));
    }

    #[test]
    fn malformed() {
        assert!(genes_from_response("not json").is_err());
    }
}
