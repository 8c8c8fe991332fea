use crate::vectorizer::document::Document;

/// Search query
/// A document (in the corpus or not), a raw string, or a token sequence.
/// Strings and tokens are wrapped into an ephemeral document.
#[derive(Debug, Clone)]
pub enum Query<'a> {
    Document(&'a Document),
    Text(&'a str),
    Tokens(Vec<String>),
}

impl<'a> From<&'a Document> for Query<'a> {
    fn from(document: &'a Document) -> Self {
        Query::Document(document)
    }
}

impl<'a> From<&'a str> for Query<'a> {
    fn from(text: &'a str) -> Self {
        Query::Text(text)
    }
}

impl<'a> From<Vec<String>> for Query<'a> {
    fn from(tokens: Vec<String>) -> Self {
        Query::Tokens(tokens)
    }
}

impl<'a> From<&[&str]> for Query<'a> {
    fn from(tokens: &[&str]) -> Self {
        Query::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }
}

impl<'a, const N: usize> From<[&str; N]> for Query<'a> {
    fn from(tokens: [&str; N]) -> Self {
        Query::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }
}
