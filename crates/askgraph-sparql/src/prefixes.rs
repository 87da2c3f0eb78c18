//! Namespace prefixes shared by every submitted query.

/// Prepended to every query body, regardless of engine.
pub const PREFIX_HEADER: &str = "\
PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX oeo: <https://openenergyplatform.org/ontology/oeo/>
PREFIX obo: <http://purl.obolibrary.org/obo/>
PREFIX oekg: <https://openenergyplatform.org/ontology/oekg/>
PREFIX dc: <http://purl.org/dc/terms/>
PREFIX XSD: <http://www.w3.org/2001/XMLSchema#>
";

const SHORT_PREFIXES: &[(&str, &str)] = &[
    ("https://openenergyplatform.org/ontology/oeo/", "oeo:"),
    ("https://openenergyplatform.org/ontology/oekg/", "oekg:"),
    ("http://www.w3.org/2000/01/rdf-schema#", "rdfs:"),
    ("http://purl.org/dc/terms/", "dc:"),
    ("http://purl.obolibrary.org/obo/", "obo:"),
    ("http://www.w3.org/1999/02/22-rdf-syntax-ns#", "rdf:"),
    ("http://www.w3.org/2001/XMLSchema#", "XSD:"),
];

/// Shorten a full IRI to its prefixed form (`oeo:OEO_00000365`) when the
/// namespace is one of the header prefixes; other strings pass through.
pub fn shorten_uri(uri: &str) -> String {
    for (full, prefix) in SHORT_PREFIXES {
        if let Some(rest) = uri.strip_prefix(full) {
            return format!("{prefix}{rest}");
        }
    }
    uri.to_string()
}

/// A query body under the fixed prefix header.
///
/// The body is what the synthesizer produces and what repair replaces; the
/// header never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredQuery {
    body: String,
}

impl StructuredQuery {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn replace_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    /// Header, blank line, body: the exact text submitted to an engine.
    pub fn full_text(&self) -> String {
        format!("{PREFIX_HEADER}\n{}", self.body)
    }
}
