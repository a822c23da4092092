//! Turning command-line input into classification requests.

use std::io::Read;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use varclass_classifier::ClassificationRequest;
use varclass_common::{GenomeBuild, Variant};

/// Requests read from one input document.
#[derive(Debug)]
pub struct RequestBatch {
    pub requests: Vec<ClassificationRequest>,
    /// The document held a single object rather than an array.
    pub single: bool,
}

/// Parse a JSON document holding one request or an array of them.
pub fn read_requests(mut reader: impl Read) -> Result<RequestBatch> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw).context("failed to read input")?;
    let doc: Value = serde_json::from_str(&raw).context("input is not valid JSON")?;

    let (items, single) = match doc {
        Value::Array(items) => (items, false),
        obj @ Value::Object(_) => (vec![obj], true),
        _ => bail!("input must be a request object or an array of request objects"),
    };

    let requests = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let mut request: ClassificationRequest =
                serde_json::from_value(item).with_context(|| format!("request {} is malformed", i))?;
            request.variant = request
                .variant
                .normalised()
                .with_context(|| format!("request {} has an invalid variant", i))?;
            Ok(request)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RequestBatch { requests, single })
}

pub fn parse_build(s: &str) -> Result<GenomeBuild> {
    GenomeBuild::from_str(s).with_context(|| format!("unknown genome build {:?} (expected GRCh37 or GRCh38)", s))
}

/// Parse `CHROM-POS-REF-ALT` (`:` also accepted as a separator).
pub fn parse_locus(locus: &str, build: GenomeBuild) -> Result<Variant> {
    let parts: Vec<&str> = locus.trim().split([':', '-']).collect();
    let [chromosome, position, reference, alternate] = parts.as_slice() else {
        bail!("expected CHROM-POS-REF-ALT, got {:?}", locus);
    };
    let position: u64 = position.parse().with_context(|| format!("bad position {:?}", position))?;
    Variant::new(chromosome, position, reference, alternate, build).with_context(|| format!("invalid variant {:?}", locus))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use varclass_common::Criterion;

    use super::*;

    #[test]
    fn test_single_object_is_normalised() {
        let doc = r#"{
            "variant": {"chromosome": "chr17", "position": 7673802, "reference": "c", "alternate": "t", "gene": " tp53 "},
            "phenotypes": ["HP:0100013"]
        }"#;
        let batch = read_requests(doc.as_bytes()).unwrap();
        assert!(batch.single);
        assert_eq!(batch.requests.len(), 1);
        let variant = &batch.requests[0].variant;
        assert_eq!(variant.key(), "GRCh38:17-7673802-C-T");
        assert_eq!(variant.gene.as_deref(), Some("TP53"));
    }

    #[test]
    fn test_array_with_interactive_evidence() {
        let doc = r#"[
            {"variant": {"chromosome": "13", "position": 32340301, "reference": "G", "alternate": "A", "build": "GRCh37"}},
            {"variant": {"chromosome": "17", "position": 43057062, "reference": "C", "alternate": "T"},
             "evidence": [{"criterion": "PS3", "strength": "strong", "confidence": "high",
                           "source": "PMID:1", "rationale": "assay"}]}
        ]"#;
        let batch = read_requests(doc.as_bytes()).unwrap();
        assert!(!batch.single);
        assert_eq!(batch.requests[0].variant.build, GenomeBuild::GRCh37);
        assert_eq!(batch.requests[1].evidence[0].criterion(), Criterion::PS3);
    }

    #[test]
    fn test_invalid_variant_names_the_request() {
        let doc = r#"[{"variant": {"chromosome": "1", "position": 0, "reference": "A", "alternate": "G"}}]"#;
        let err = read_requests(doc.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("request 0"));
    }

    #[test]
    fn test_scalar_document_is_rejected() {
        assert!(read_requests("42".as_bytes()).is_err());
    }

    #[test]
    fn test_locus_separators() {
        let dash = parse_locus("17-7673802-C-T", GenomeBuild::GRCh38).unwrap();
        let colon = parse_locus("chr17:7673802:c:t", GenomeBuild::GRCh38).unwrap();
        assert_eq!(dash.key(), colon.key());
        assert!(parse_locus("17-7673802-C", GenomeBuild::GRCh38).is_err());
        assert!(parse_locus("17-x-C-T", GenomeBuild::GRCh38).is_err());
        assert_eq!(parse_build("hg19").unwrap(), GenomeBuild::GRCh37);
    }
}
