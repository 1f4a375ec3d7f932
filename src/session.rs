//! The interactive search session.
//!
//! A session builds the corpus once, encodes it once, then answers queries
//! until the user stops:
//!
//! ```text
//! Init -> CorpusBuilt -> ModelReady -> AwaitingQuery <-> Ranked -> Done
//! ```
//!
//! Bad input (a missing directory, a blank query, an unrecognized answer
//! to "search again?") is re-prompted in place. Failing to load the model
//! or encode the corpus ends the session with an error. Closing stdin ends
//! it cleanly at any prompt.

use std::{
    io::{BufRead, Write},
    path::PathBuf,
};

use crate::{
    corpus::{self, Corpus, Document},
    doc_id::DocumentId,
    embedding::Embedder,
    encoder::{self, DEFAULT_BATCH_SIZE},
    error::{Error, Result},
    matrix::EmbeddingMatrix,
    progress::{ProgressEvent, ProgressObserver},
    ranker,
    table,
    text_util::{self, DEFAULT_PREVIEW_LINES, DEFAULT_PREVIEW_MAX_CHARS},
};

/// Number of results shown per query unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 5;

const RULE: &str =
    "--------------------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    CorpusBuilt,
    ModelReady,
    AwaitingQuery,
    Ranked,
    Done,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Results shown per query; fewer when the corpus is smaller.
    pub top_k: usize,
    /// Documents per embedding call while encoding the corpus.
    pub batch_size: usize,
    /// Where to write the corpus table, if anywhere.
    pub corpus_table: Option<PathBuf>,
    /// Where to write the embedding table, if anywhere.
    pub embeddings_table: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            batch_size: DEFAULT_BATCH_SIZE,
            corpus_table: None,
            embeddings_table: None,
        }
    }
}

/// What a finished session did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub documents: usize,
    pub queries: usize,
}

/// Parse an answer to the "search again?" prompt.
pub fn parse_continue(answer: &str) -> Result<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(true),
        "n" | "no" => Ok(false),
        other => Err(Error::InvalidContinueInput(other.to_string())),
    }
}

/// Line-oriented prompts over any reader/writer pair.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    /// Print `text` followed by a newline.
    pub fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{text}")?;
        Ok(())
    }

    /// Print `prompt` and read one line, without its line ending.
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than rejected.
    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut raw = Vec::new();
        if self.input.read_until(b'\n', &mut raw)? == 0 {
            return Err(Error::InputClosed);
        }
        let line = String::from_utf8_lossy(&raw);
        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }

    /// Ask for a directory until one can be collected into a corpus.
    pub fn prompt_directory(
        &mut self,
        progress: &dyn ProgressObserver,
    ) -> Result<(PathBuf, Corpus)> {
        loop {
            let answer =
                self.ask("Enter the directory you wish to search within: ")?;
            let root = PathBuf::from(answer.trim());

            match corpus::collect(&root, progress) {
                Ok(corpus) => return Ok((root, corpus)),
                Err(e @ Error::DirectoryNotFound(_)) => {
                    tracing::warn!("{e}");
                    self.say(
                        "The directory you specified does not exist. \
                         Please try again.",
                    )?;
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("{e}");
                    self.say(&format!("{e}. Please try again."))?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Ask for a query until a non-blank one is given.
    pub fn prompt_query(&mut self) -> Result<String> {
        loop {
            let query = self.ask("Enter your search query: ")?;
            if !query.trim().is_empty() {
                return Ok(query.trim().to_string());
            }
            tracing::warn!("{}", Error::EmptyQuery);
            self.say("The query is empty. Please try again.")?;
        }
    }

    /// Ask whether to search again until the answer is yes or no.
    pub fn prompt_continue(&mut self) -> Result<bool> {
        loop {
            let answer = self.ask("Would you like to search again? (y/n): ")?;
            match parse_continue(&answer) {
                Ok(again) => return Ok(again),
                Err(e) => {
                    tracing::warn!("{e}");
                    self.say("Invalid input. Please answer y or n.")?;
                }
            }
        }
    }

    /// Print the results of one query.
    pub fn present(&mut self, query: &str, hits: &[SearchHit<'_>]) -> Result<()> {
        let out = &mut self.output;
        writeln!(out, "{RULE}")?;

        if hits.is_empty() {
            writeln!(out, "No results found for \"{query}\".")?;
            writeln!(out, "{RULE}")?;
            return Ok(());
        }

        writeln!(out, "Top {} results for \"{query}\":", hits.len())?;
        for hit in hits {
            let score = match hit.similarity {
                Some(s) => format!("{s:.3}"),
                None => "  n/a".to_string(),
            };
            writeln!(out)?;
            writeln!(
                out,
                "{:>3}. [{score}] {} {}",
                hit.rank, hit.document.name, hit.id
            )?;
            if let Some(path) = &hit.document.path {
                writeln!(out, "     {}", path.display())?;
            }
            if let Some(snippet) = text_util::preview(
                &hit.document.content,
                DEFAULT_PREVIEW_LINES,
                DEFAULT_PREVIEW_MAX_CHARS,
            ) {
                writeln!(out, "{}", text_util::indent(&snippet, 7))?;
            }
        }
        writeln!(out, "{RULE}")?;
        Ok(())
    }
}

/// One presented search result.
#[derive(Debug, Clone)]
pub struct SearchHit<'a> {
    /// 1-based position in the result list.
    pub rank: usize,
    pub index: usize,
    pub document: &'a Document,
    pub id: DocumentId,
    pub distance: f32,
    /// `1 - distance`, absent for degenerate embeddings.
    pub similarity: Option<f32>,
}

/// An encoded corpus ready to answer queries.
///
/// The corpus and matrix are fixed once the session is built; queries only
/// read them.
pub struct SearchSession<E> {
    corpus: Corpus,
    matrix: EmbeddingMatrix,
    embedder: E,
    top_k: usize,
}

impl<E: Embedder> SearchSession<E> {
    /// Fails with [`Error::Integrity`] if `matrix` is not row-aligned with
    /// `corpus`, or [`Error::DimensionMismatch`] if its width differs from
    /// the embedder's.
    pub fn new(
        corpus: Corpus,
        matrix: EmbeddingMatrix,
        embedder: E,
        top_k: usize,
    ) -> Result<Self> {
        encoder::ensure_aligned(&corpus, &matrix)?;
        if matrix.dimension() != embedder.dimension() {
            return Err(Error::DimensionMismatch {
                expected: embedder.dimension(),
                actual: matrix.dimension(),
            });
        }
        Ok(Self {
            corpus,
            matrix,
            embedder,
            top_k,
        })
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn matrix(&self) -> &EmbeddingMatrix {
        &self.matrix
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embed `query`, rank the whole corpus and keep the best `top_k`.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit<'_>>> {
        if query.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }

        let vector = self.embedder.embed_one(query)?;
        let ranked = ranker::score(&self.matrix, &vector)?;

        ranked
            .into_iter()
            .take(self.top_k)
            .enumerate()
            .map(|(i, r)| {
                let document =
                    self.corpus.get(r.index).ok_or(Error::Integrity {
                        rows: self.matrix.rows(),
                        documents: self.corpus.len(),
                    })?;
                Ok(SearchHit {
                    rank: i + 1,
                    index: r.index,
                    document,
                    id: document.id(),
                    distance: r.distance,
                    similarity: r.similarity(),
                })
            })
            .collect()
    }
}

fn advance(state: &mut SessionState, next: SessionState) {
    tracing::debug!(from = ?*state, to = ?next, "session state");
    *state = next;
}

/// Run one interactive session on `console`.
///
/// `load_embedder` is called once, after the corpus is built. Closing the
/// input at any prompt ends the session normally.
pub fn run<R, W, E, L>(
    console: &mut Console<R, W>,
    config: &SessionConfig,
    load_embedder: L,
    progress: &dyn ProgressObserver,
) -> Result<SessionSummary>
where
    R: BufRead,
    W: Write,
    E: Embedder,
    L: FnOnce() -> Result<E>,
{
    let mut state = SessionState::Init;
    let mut summary = SessionSummary {
        documents: 0,
        queries: 0,
    };

    console.say(RULE)?;
    console.say("Lost Files semantic search")?;
    console.say(RULE)?;

    let (root, corpus) = match console.prompt_directory(progress) {
        Ok(found) => found,
        Err(Error::InputClosed) => {
            advance(&mut state, SessionState::Done);
            return Ok(summary);
        }
        Err(e) => return Err(e),
    };
    summary.documents = corpus.len();
    tracing::info!(root = %root.display(), documents = corpus.len(), "corpus built");

    if corpus.is_empty() {
        console.say(&format!(
            "No text files were found under {}; every search will return \
             zero results.",
            root.display()
        ))?;
    } else {
        console.say(&format!("Gathered {} text files.", corpus.len()))?;
    }
    advance(&mut state, SessionState::CorpusBuilt);

    let embedder = load_embedder()?;
    let matrix = match &config.embeddings_table {
        Some(path) => encoder::encode_and_store(
            &corpus,
            &embedder,
            config.batch_size,
            path,
            progress,
        )?,
        None => encoder::encode(&corpus, &embedder, config.batch_size, progress)?,
    };
    // Written only once the embeddings exist, so the two tables on disk
    // always describe the same corpus.
    if let Some(path) = &config.corpus_table {
        let rows = table::write_corpus(path, &corpus)?;
        progress.report(ProgressEvent::Persisted {
            path: path.clone(),
            rows,
        });
    }
    let session = SearchSession::new(corpus, matrix, embedder, config.top_k)?;
    advance(&mut state, SessionState::ModelReady);

    console.say("Search engine ready.")?;
    loop {
        advance(&mut state, SessionState::AwaitingQuery);
        let query = match console.prompt_query() {
            Ok(query) => query,
            Err(Error::InputClosed) => break,
            Err(e) => return Err(e),
        };

        let hits = session.search(&query)?;
        console.present(&query, &hits)?;
        summary.queries += 1;
        advance(&mut state, SessionState::Ranked);

        match console.prompt_continue() {
            Ok(true) => continue,
            Ok(false) | Err(Error::InputClosed) => break,
            Err(e) => return Err(e),
        }
    }

    advance(&mut state, SessionState::Done);
    Ok(summary)
}
