//! Conversion of records into documents.
//!
//! Each record kind has its own [`DocumentBuilder`]; [`CorpusBuilder`]
//! dispatches on [`Record`] and absorbs per-record failures so that one bad
//! record never aborts a corpus build.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::coach::CoachDocuments;
use crate::document::Document;
use crate::error::{DocumentError, Result};
use crate::game::{GameDocuments, SeasonSummaries};
use crate::player::PlayerDocuments;
use crate::record::{Corpus, Record, RecordKind, TeamRecord};
use crate::team::TeamDocuments;

/// Converts one record of a known kind into documents.
pub trait DocumentBuilder {
    /// The record type this builder reads.
    type Record;

    /// Kind tag stamped on every produced document.
    const KIND: RecordKind;

    /// Build every document for `record`.
    ///
    /// Fails when the record lacks its identity fields; never partially
    /// succeeds.
    fn build(&self, record: &Self::Record) -> Result<Vec<Document>>;
}

/// Tunables for document building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Maximum table rows per statistics document before it is split.
    pub max_table_rows: usize,

    /// Number of teams listed in a season summary.
    pub season_summary_teams: usize,

    /// Whether to emit per-season summaries aggregated from game records.
    pub season_summaries: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            max_table_rows: 20,
            season_summary_teams: 10,
            season_summaries: true,
        }
    }
}

/// Maps team abbreviations to full names so game text stays self-contained.
#[derive(Debug, Clone, Default)]
pub struct TeamDirectory {
    names: HashMap<String, String>,
}

impl TeamDirectory {
    /// Build a directory from team records; records without identity are ignored.
    pub fn from_teams<'a>(teams: impl IntoIterator<Item = &'a TeamRecord>) -> Self {
        let names = teams
            .into_iter()
            .filter(|t| !t.abbreviation.trim().is_empty() && !t.name.trim().is_empty())
            .map(|t| (t.abbreviation.trim().to_uppercase(), t.name.trim().to_string()))
            .collect();
        Self { names }
    }

    /// Register a single team.
    pub fn insert(&mut self, abbreviation: &str, name: &str) {
        self.names
            .insert(abbreviation.trim().to_uppercase(), name.trim().to_string());
    }

    /// Full name for an abbreviation, if known.
    pub fn name(&self, abbreviation: &str) -> Option<&str> {
        self.names
            .get(&abbreviation.trim().to_uppercase())
            .map(String::as_str)
    }

    /// Human-readable label: the full name with its abbreviation, or the
    /// abbreviation explicitly marked as such.
    pub fn describe(&self, abbreviation: &str) -> String {
        let abbreviation = abbreviation.trim();
        match self.name(abbreviation) {
            Some(name) => format!("{name} ({abbreviation})"),
            None => format!("team with abbreviation {abbreviation}"),
        }
    }

    /// Short label for tables: the full name or the bare abbreviation.
    pub fn short(&self, abbreviation: &str) -> String {
        self.name(abbreviation)
            .map(str::to_string)
            .unwrap_or_else(|| abbreviation.trim().to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A record that was skipped during a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildFailure {
    pub kind: RecordKind,
    pub source_id: Option<String>,
    pub reason: String,
}

impl BuildFailure {
    fn from_error(kind: RecordKind, err: DocumentError) -> Self {
        match err {
            DocumentError::Build {
                source_id, reason, ..
            } => Self {
                kind,
                source_id,
                reason,
            },
            other => Self {
                kind,
                source_id: None,
                reason: other.to_string(),
            },
        }
    }
}

/// Outcome of building documents for a whole corpus.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Documents in deterministic build order.
    pub documents: Vec<Document>,

    /// Number of records that produced no documents because they failed.
    pub skipped: usize,

    /// Why each skipped record failed.
    pub failures: Vec<BuildFailure>,
}

impl BuildReport {
    /// Document counts per record kind.
    pub fn counts_by_kind(&self) -> BTreeMap<RecordKind, usize> {
        let mut counts = BTreeMap::new();
        for doc in &self.documents {
            *counts.entry(doc.doc_type).or_insert(0) += 1;
        }
        counts
    }
}

/// Builds documents for every record in a corpus.
#[derive(Debug, Clone, Default)]
pub struct CorpusBuilder {
    config: BuilderConfig,
}

impl CorpusBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with custom configuration.
    pub fn with_config(config: BuilderConfig) -> Self {
        Self { config }
    }

    /// Build documents for one record using the given team directory.
    pub fn build_record(&self, record: &Record, teams: &TeamDirectory) -> Result<Vec<Document>> {
        match record {
            Record::Team(team) => TeamDocuments.build(team),
            Record::Player(player) => PlayerDocuments::new(self.config.max_table_rows).build(player),
            Record::Game(game) => GameDocuments::new(teams).build(game),
            Record::Coach(coach) => {
                CoachDocuments::new(teams, self.config.max_table_rows).build(coach)
            }
        }
    }

    /// Build documents for a whole corpus.
    ///
    /// Failing records are counted and reported, never fatal. A record whose
    /// document ids collide with an earlier record is also skipped.
    pub fn build(&self, corpus: &Corpus) -> BuildReport {
        let teams = TeamDirectory::from_teams(&corpus.teams);
        let mut report = BuildReport {
            skipped: corpus.rejected.len(),
            failures: corpus.rejected.clone(),
            ..BuildReport::default()
        };
        let mut seen: HashSet<String> = HashSet::new();

        for record in corpus.records() {
            let kind = record.kind();
            match self.build_record(&record, &teams) {
                Ok(documents) => {
                    if let Some(dup) = documents.iter().find(|d| seen.contains(&d.id)) {
                        warn!("Skipping {kind} record: duplicate document id {}", dup.id);
                        report.skipped += 1;
                        report.failures.push(BuildFailure {
                            kind,
                            source_id: Some(dup.source_id.clone()),
                            reason: format!("duplicate document id {}", dup.id),
                        });
                        continue;
                    }
                    seen.extend(documents.iter().map(|d| d.id.clone()));
                    report.documents.extend(documents);
                }
                Err(err) => {
                    warn!("Skipping record: {err}");
                    report.skipped += 1;
                    report.failures.push(BuildFailure::from_error(kind, err));
                }
            }
        }

        if self.config.season_summaries {
            let summaries = SeasonSummaries::new(&teams, self.config.season_summary_teams)
                .build(&corpus.games);
            debug!("Built {} season summary documents", summaries.len());
            for summary in summaries {
                if seen.insert(summary.id.clone()) {
                    report.documents.push(summary);
                }
            }
        }

        info!(
            "Built {} documents from {} records ({} skipped)",
            report.documents.len(),
            corpus.len(),
            report.skipped
        );
        report
    }
}

/// Reject blank identity fields.
pub(crate) fn require<'a>(
    kind: RecordKind,
    source_id: Option<&str>,
    field: &str,
    value: &'a str,
) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(DocumentError::build(
            kind,
            source_id.filter(|s| !s.trim().is_empty()),
            format!("missing required field `{field}`"),
        ))
    } else {
        Ok(trimmed)
    }
}
