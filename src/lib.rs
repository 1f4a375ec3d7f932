//! lostfiles - find a text file by describing what it says.
//!
//! lostfiles gathers every `.txt` and `.md` file under a directory, embeds
//! each one with a pretrained sentence model (run locally through
//! [candle](https://github.com/huggingface/candle)), and ranks them against
//! free-text queries by cosine distance.
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use lostfiles::{DataDir, ModelManager, SearchSession, corpus, encoder};
//! use lostfiles::progress::LogProgress;
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let corpus = corpus::collect(Path::new("notes"), &LogProgress).unwrap();
//! let model = ModelManager::new(data_dir.models_dir())
//!     .load(&LogProgress)
//!     .unwrap();
//! let matrix = encoder::encode(&corpus, &model, 32, &LogProgress).unwrap();
//!
//! let session = SearchSession::new(corpus, matrix, model, 5).unwrap();
//! for hit in session.search("grocery list for the party").unwrap() {
//!     println!("{}. {} ({:?})", hit.rank, hit.document.name, hit.similarity);
//! }
//! ```

pub mod cli;
pub mod corpus;
pub mod data_dir;
pub mod doc_id;
pub mod embedding;
pub mod encoder;
pub mod error;
pub mod matrix;
pub mod model_manager;
pub mod progress;
pub mod ranker;
pub mod session;
pub mod table;
pub mod text_util;
pub mod walker;

pub use corpus::{Corpus, Document};
pub use data_dir::DataDir;
pub use doc_id::DocumentId;
pub use embedding::Embedder;
pub use error::{Error, Result};
pub use matrix::EmbeddingMatrix;
pub use model_manager::{ModelManager, SentenceEncoder};
pub use session::{SearchSession, SessionConfig, SessionSummary};
