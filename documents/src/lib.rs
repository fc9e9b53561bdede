//! # Documents
//!
//! Turns structured statistics records (teams, players, games, coaches) into
//! flat, self-contained text documents that can be embedded and retrieved.
//!
//! ## Architecture
//!
//! ```text
//! RecordSource ──► Corpus ──► CorpusBuilder ──► BuildReport
//!                                 │
//!         ┌──────────────┬────────┴─────┬───────────────┐
//!         ▼              ▼              ▼               ▼
//!   TeamDocuments  PlayerDocuments  GameDocuments  CoachDocuments
//!                                   SeasonSummaries
//! ```
//!
//! Builders are pure: they return documents and never write to an index.

pub mod builder;
pub mod coach;
pub mod document;
pub mod error;
pub mod game;
pub mod player;
pub mod record;
pub mod source;
pub mod team;

mod table;

pub use builder::{
    BuildFailure, BuildReport, BuilderConfig, CorpusBuilder, DocumentBuilder, TeamDirectory,
};
pub use coach::CoachDocuments;
pub use document::{Document, Metadata};
pub use error::{DocumentError, Result};
pub use game::{GameDocuments, SeasonSummaries};
pub use player::PlayerDocuments;
pub use record::{
    CoachCareer, CoachRecord, CoachTenure, Corpus, GameRecord, PlayerRecord, Record, RecordKind,
    StatTable, TeamRecord, TeamSeason,
};
pub use source::{JsonRecordSource, RecordSource, StaticRecordSource};
pub use team::TeamDocuments;
