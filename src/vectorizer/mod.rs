pub mod analyzer;
pub mod corpus;
pub mod document;
pub mod evaluate;
pub mod label;
pub mod lsa;
pub mod serde;
pub mod term;
pub mod vector;

use ::serde::{Deserialize, Serialize};

/// Weighting scheme of document vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Weighting {
    /// Term frequency
    /// count(word) / total count
    Tf,
    /// Term frequency * inverse document frequency
    /// Degrades to `Tf` for a document without a corpus.
    #[default]
    TfIdf,
}
