use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::vectorizer::corpus::Corpus;
use crate::vectorizer::label::Label;

/// Tabular export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Tab-separated: one column per feature, then `name` and `class`
    Tsv,
    /// Weka ARFF: numeric attributes per feature and a nominal class
    Arff,
}

impl Corpus {
    /// Write the document vectors as a table
    pub fn export(&self, path: impl AsRef<Path>, format: ExportFormat) -> Result<()> {
        let table = match format {
            ExportFormat::Tsv => self.to_tsv(),
            ExportFormat::Arff => {
                let relation = path
                    .as_ref()
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("corpus")
                    .to_string();
                self.to_arff(&relation)
            }
        };
        fs::write(path, table)?;
        Ok(())
    }

    /// Tab-separated table
    /// Header row with the features, `name` and `class`; one row per document.
    pub fn to_tsv(&self) -> String {
        let features = self.features();
        let mut out = String::new();
        let mut header: Vec<&str> = features.iter().map(|f| f.as_str()).collect();
        header.extend(["name", "class"]);
        out.push_str(&header.join("\t"));
        out.push('\n');
        for document in self.documents() {
            let vector = document.vector();
            let mut row: Vec<String> = features.iter().map(|f| vector.weight(f).to_string()).collect();
            row.push(clean_tsv(document.name().unwrap_or("")));
            row.push(document.label().map(|l| clean_tsv(&l.to_string())).unwrap_or_default());
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
        out
    }

    /// ARFF table
    /// `@ATTRIBUTE <feature> NUMERIC` per feature and a nominal `class` attribute
    /// listing every label; `?` for documents without a label.
    pub fn to_arff(&self, relation: &str) -> String {
        let features = self.features();
        let mut labels: Vec<&Label> = Vec::new();
        for document in self.documents() {
            if let Some(label) = document.label() {
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
        }

        let mut out = String::new();
        let _ = writeln!(out, "@RELATION {}", quote(relation));
        out.push('\n');
        for feature in &features {
            let _ = writeln!(out, "@ATTRIBUTE {} NUMERIC", quote(feature));
        }
        let classes: Vec<String> = labels.iter().map(|l| quote(&l.to_string())).collect();
        let _ = writeln!(out, "@ATTRIBUTE class {{{}}}", classes.join(","));
        out.push('\n');
        out.push_str("@DATA\n");
        for document in self.documents() {
            let vector = document.vector();
            let mut row: Vec<String> = features.iter().map(|f| vector.weight(f).to_string()).collect();
            row.push(
                document
                    .label()
                    .map(|l| quote(&l.to_string()))
                    .unwrap_or_else(|| "?".to_string()),
            );
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }
}

fn clean_tsv(s: &str) -> String {
    s.replace(['\t', '\n'], " ")
}

/// Quote an ARFF identifier or value when it contains separators
fn quote(s: &str) -> String {
    if s.is_empty() || s.contains([' ', ',', '\'', '"', '{', '}', '%', '\t']) {
        format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
    } else {
        s.to_string()
    }
}
