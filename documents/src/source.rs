//! Bulk-read boundary with the record store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::fs;
use tracing::{info, warn};

use crate::builder::BuildFailure;
use crate::error::{DocumentError, Result};
use crate::record::{Corpus, RecordKind};

/// Supplies a complete enumeration of every record kind at build time.
///
/// The core never queries the record store record-by-record and never
/// touches it at query time.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Human-readable description used in logs.
    fn describe(&self) -> String;

    /// Read every team, player, game and coach record.
    async fn load_all(&self) -> Result<Corpus>;
}

/// Reads a JSON export of the record store.
///
/// The file holds one object with `teams`, `players`, `games` and `coaches`
/// arrays; missing arrays are treated as empty.
#[derive(Debug, Clone)]
pub struct JsonRecordSource {
    path: PathBuf,
}

impl JsonRecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSource for JsonRecordSource {
    fn describe(&self) -> String {
        format!("json export {}", self.path.display())
    }

    async fn load_all(&self) -> Result<Corpus> {
        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            DocumentError::Source(format!("failed to read {}: {e}", self.path.display()))
        })?;
        let corpus = decode_export(&content)?;
        info!(
            "Loaded {} teams, {} players, {} games, {} coaches from {} ({} rejected)",
            corpus.teams.len(),
            corpus.players.len(),
            corpus.games.len(),
            corpus.coaches.len(),
            self.path.display(),
            corpus.rejected.len()
        );
        Ok(corpus)
    }
}

/// Export layout with records left undecoded.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawExport {
    teams: Vec<Value>,
    players: Vec<Value>,
    games: Vec<Value>,
    coaches: Vec<Value>,
}

/// Decode an export record by record.
///
/// Only a malformed top level fails the load; a record with a wrong-typed
/// field is rejected on its own and carried in [`Corpus::rejected`].
pub(crate) fn decode_export(content: &str) -> Result<Corpus> {
    let raw: RawExport = serde_json::from_str(content)?;
    let mut rejected = Vec::new();
    let teams = decode_records(RecordKind::Team, raw.teams, &mut rejected);
    let players = decode_records(RecordKind::Player, raw.players, &mut rejected);
    let games = decode_records(RecordKind::Game, raw.games, &mut rejected);
    let coaches = decode_records(RecordKind::Coach, raw.coaches, &mut rejected);
    Ok(Corpus {
        teams,
        players,
        games,
        coaches,
        rejected,
    })
}

fn decode_records<T: DeserializeOwned>(
    kind: RecordKind,
    values: Vec<Value>,
    rejected: &mut Vec<BuildFailure>,
) -> Vec<T> {
    let mut records = Vec::with_capacity(values.len());
    for value in values {
        let source_id = record_id(&value);
        match serde_json::from_value::<T>(value) {
            Ok(record) => records.push(record),
            Err(err) => {
                warn!(
                    "Rejecting {kind} record {}: {err}",
                    source_id.as_deref().unwrap_or("<unknown>")
                );
                rejected.push(BuildFailure {
                    kind,
                    source_id,
                    reason: format!("malformed record: {err}"),
                });
            }
        }
    }
    records
}

/// Best-effort identifier of an undecodable record.
fn record_id(value: &Value) -> Option<String> {
    ["id", "abbreviation"]
        .into_iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// A record source over an in-memory corpus.
#[derive(Debug, Clone, Default)]
pub struct StaticRecordSource {
    corpus: Corpus,
}

impl StaticRecordSource {
    pub fn new(corpus: Corpus) -> Self {
        Self { corpus }
    }
}

#[async_trait]
impl RecordSource for StaticRecordSource {
    fn describe(&self) -> String {
        format!("in-memory corpus ({} records)", self.corpus.len())
    }

    async fn load_all(&self) -> Result<Corpus> {
        Ok(self.corpus.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_json_source_reads_partial_export() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(
            &path,
            r#"{"teams": [{"abbreviation": "LAL", "name": "Los Angeles Lakers"}]}"#,
        )
        .unwrap();

        let corpus = JsonRecordSource::new(&path).load_all().await.unwrap();
        assert_eq!(corpus.teams.len(), 1);
        assert!(corpus.players.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_typed_record_is_rejected_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(
            &path,
            r#"{
                "teams": [
                    {"abbreviation": "LAL", "name": "Los Angeles Lakers", "wins": "52"},
                    {"abbreviation": "BOS", "name": "Boston Celtics", "wins": 3400}
                ],
                "games": [
                    {"id": "g1", "season": "twenty", "date": "2020-01-05", "home_team": "LAL", "away_team": "BOS"},
                    ["not", "a", "record"]
                ]
            }"#,
        )
        .unwrap();

        let corpus = JsonRecordSource::new(&path).load_all().await.unwrap();
        assert_eq!(corpus.teams.len(), 1);
        assert_eq!(corpus.teams[0].abbreviation, "BOS");
        assert!(corpus.games.is_empty());
        assert_eq!(corpus.len(), 4);

        let rejected: Vec<(RecordKind, Option<&str>)> = corpus
            .rejected
            .iter()
            .map(|f| (f.kind, f.source_id.as_deref()))
            .collect();
        assert_eq!(
            rejected,
            vec![
                (RecordKind::Team, Some("LAL")),
                (RecordKind::Game, Some("g1")),
                (RecordKind::Game, None),
            ]
        );
        assert!(corpus.rejected[0].reason.starts_with("malformed record"));

        let report = crate::builder::CorpusBuilder::new().build(&corpus);
        assert_eq!(report.skipped, 3);
    }

    #[tokio::test]
    async fn test_malformed_top_level_fails_the_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(&path, r#"{"teams": {"abbreviation": "LAL"}}"#).unwrap();

        let result = JsonRecordSource::new(&path).load_all().await;
        assert!(matches!(result, Err(DocumentError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_json_source_missing_file() {
        let result = JsonRecordSource::new("/nonexistent/corpus.json")
            .load_all()
            .await;
        assert!(matches!(result, Err(DocumentError::Source(_))));
    }
}
