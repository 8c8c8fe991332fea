use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use crate::vectorizer::term::TermFrequency;

/// Characters stripped from both ends of every token
pub const PUNCTUATION: &str = "#[]():;,.!?\n\r\t\u{c} ";

/// Built-in English stop words
const STOPWORDS: &str = "a, about, above, across, after, afterwards, again, against, all, almost, \
alone, along, already, also, although, always, am, among, amongst, an, and, another, any, anyhow, \
anyone, anything, anyway, anywhere, are, around, as, at, be, became, because, become, becomes, \
becoming, been, before, behind, being, below, beside, besides, between, beyond, both, but, by, can, \
cannot, could, did, do, does, doing, done, down, during, each, either, else, elsewhere, enough, \
etc, even, ever, every, everyone, everything, everywhere, except, few, for, from, further, had, \
has, have, having, he, hence, her, here, hers, herself, him, himself, his, how, however, i, if, in, \
indeed, into, is, it, its, itself, just, last, least, less, many, may, me, meanwhile, might, more, \
moreover, most, mostly, much, must, my, myself, neither, never, nevertheless, next, no, nobody, \
none, nor, not, nothing, now, nowhere, of, off, often, on, once, one, only, onto, or, other, \
others, otherwise, our, ours, ourselves, out, over, own, per, perhaps, rather, same, she, should, \
since, so, some, somehow, someone, something, sometime, sometimes, somewhere, still, such, than, \
that, the, their, theirs, them, themselves, then, thence, there, thereafter, thereby, therefore, \
therein, these, they, this, those, though, through, throughout, thus, to, together, too, toward, \
towards, under, until, up, upon, us, very, via, was, we, well, were, what, whatever, when, whence, \
whenever, where, whereas, whereby, wherein, whether, which, while, who, whoever, whole, whom, \
whose, why, will, with, within, without, would, yet, you, your, yours, yourself, yourselves";

/// The built-in stop word set
pub fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.split(',').map(str::trim).collect())
}

/// Stemming or lemmatization function, `token -> canonical token`
/// Supplied by an external NLP collaborator.
pub type Stemmer = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Token filter, `true` keeps the token
pub type TokenFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Reduction of a word to its base form before counting
#[derive(Clone, Default)]
pub enum Stemming {
    /// Count words as they are (lowercased)
    #[default]
    None,
    /// Use the lemma of tagged words, plain tokens are kept as they are
    Lemma,
    /// Apply an injected stemmer to every word
    Stem(Stemmer),
}

impl Debug for Stemming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stemming::None => write!(f, "None"),
            Stemming::Lemma => write!(f, "Lemma"),
            Stemming::Stem(_) => write!(f, "Stem(..)"),
        }
    }
}

/// A word annotated by an external tagger
pub trait TaggedWord {
    /// Surface form
    fn string(&self) -> &str;
    /// Base form, if the tagger produced one
    fn lemma(&self) -> Option<&str>;
    /// Part-of-speech tag
    fn tag(&self) -> Option<&str>;
}

/// Owned tagged word
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub string: String,
    pub lemma: Option<String>,
    pub tag: Option<String>,
}

impl Word {
    pub fn new(string: impl Into<String>) -> Self {
        Word {
            string: string.into(),
            lemma: None,
            tag: None,
        }
    }

    pub fn with_lemma(mut self, lemma: impl Into<String>) -> Self {
        self.lemma = Some(lemma.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn from_tagged<W: TaggedWord + ?Sized>(word: &W) -> Self {
        Word {
            string: word.string().to_string(),
            lemma: word.lemma().map(str::to_string),
            tag: word.tag().map(str::to_string),
        }
    }
}

impl TaggedWord for Word {
    fn string(&self) -> &str {
        &self.string
    }

    fn lemma(&self) -> Option<&str> {
        self.lemma.as_deref()
    }

    fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }
}

/// Document construction options
/// Controls the pipeline: split -> filter -> stop words -> stem -> count -> prune.
#[derive(Clone)]
pub struct AnalyzerOptions {
    /// Token filter, `None` keeps alphabetic tokens longer than one character
    pub filter: Option<TokenFilter>,
    /// Characters stripped from token ends
    pub punctuation: String,
    /// Keep stop words
    pub keep_stopwords: bool,
    /// Words never counted
    pub exclude: HashSet<String>,
    pub stemming: Stemming,
    /// Terms with a count `<= threshold` are dropped
    pub threshold: f64,
    /// Keep only the most frequent terms
    pub top: Option<usize>,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        AnalyzerOptions {
            filter: None,
            punctuation: PUNCTUATION.to_string(),
            keep_stopwords: false,
            exclude: HashSet::new(),
            stemming: Stemming::None,
            threshold: 0.0,
            top: None,
        }
    }
}

impl Debug for AnalyzerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerOptions")
            .field("filter", &self.filter.as_ref().map(|_| ".."))
            .field("punctuation", &self.punctuation)
            .field("keep_stopwords", &self.keep_stopwords)
            .field("exclude", &self.exclude)
            .field("stemming", &self.stemming)
            .field("threshold", &self.threshold)
            .field("top", &self.top)
            .finish()
    }
}

impl AnalyzerOptions {
    /// Options that count tokens verbatim
    /// No filtering, no stop word removal, no stemming, no pruning.
    pub fn verbatim() -> Self {
        AnalyzerOptions {
            filter: Some(Arc::new(|w: &str| !w.is_empty())),
            punctuation: String::new(),
            keep_stopwords: true,
            ..Default::default()
        }
    }

    pub fn with_stemmer<F>(mut self, stemmer: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.stemming = Stemming::Stem(Arc::new(stemmer));
        self
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    fn keep(&self, word: &str) -> bool {
        match &self.filter {
            Some(filter) => filter(word),
            None => word.chars().count() > 1 && word.chars().all(char::is_alphabetic),
        }
    }

    fn is_ignored(&self, word: &str) -> bool {
        (!self.keep_stopwords && stopwords().contains(word)) || self.exclude.contains(word)
    }

    fn stem(&self, word: &str, lemma: Option<&str>) -> String {
        match &self.stemming {
            Stemming::None => word.to_string(),
            Stemming::Lemma => lemma.map(str::to_string).unwrap_or_else(|| word.to_string()),
            Stemming::Stem(stemmer) => stemmer(word),
        }
    }
}

/// Split a string into words
/// Splits on whitespace, strips punctuation from both ends of each token and
/// a trailing possessive `'s`, then keeps the tokens accepted by the filter.
///
/// # Arguments
/// * `text` - input text
/// * `options` - filter and punctuation
pub fn words(text: &str, options: &AnalyzerOptions) -> Vec<String> {
    let punctuation: Vec<char> = options.punctuation.chars().collect();
    text.replace('\u{2019}', "'")
        .split_whitespace()
        .map(|w| {
            let w = w.trim_matches(punctuation.as_slice());
            w.strip_suffix("'s").unwrap_or(w)
        })
        .filter(|w| options.keep(w))
        .map(str::to_string)
        .collect()
}

/// Count words into a TermFrequency
/// Words are lowercased, stop words and excluded words are skipped,
/// the rest is stemmed and counted, then the counts are pruned.
pub fn count<T>(words: &[T], options: &AnalyzerOptions) -> TermFrequency
where
    T: AsRef<str>,
{
    count_with_lemmas(words.iter().map(|w| (w.as_ref(), None)), options)
}

/// Count tagged words, using their lemma with `Stemming::Lemma`
pub fn count_tagged<W>(words: &[W], options: &AnalyzerOptions) -> TermFrequency
where
    W: TaggedWord,
{
    count_with_lemmas(words.iter().map(|w| (w.string(), w.lemma())), options)
}

fn count_with_lemmas<'a, I>(words: I, options: &AnalyzerOptions) -> TermFrequency
where
    I: Iterator<Item = (&'a str, Option<&'a str>)>,
{
    let mut freq = TermFrequency::new();
    for (word, lemma) in words {
        let lower = word.to_lowercase();
        if options.is_ignored(&lower) {
            continue;
        }
        freq.add_term(&options.stem(&lower, lemma));
    }
    freq.prune(options.threshold, options.top);
    freq
}
