//! Structured records read from the statistics record store.
//!
//! Records are consumed, never owned: the record store hands over a complete
//! snapshot at build time and the builders only read from it. Identity fields
//! are deserialized leniently (missing values become empty strings or `None`)
//! so that one malformed record fails its own build instead of the whole load.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::builder::BuildFailure;

/// The four kinds of record the corpus is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Team,
    Player,
    Game,
    Coach,
}

impl RecordKind {
    /// All kinds, in build order.
    pub const ALL: [RecordKind; 4] = [Self::Team, Self::Player, Self::Game, Self::Coach];

    /// Lower-case label used in document ids and attributions.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Team => "team",
            Self::Player => "player",
            Self::Game => "game",
            Self::Coach => "coach",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A record of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Team(TeamRecord),
    Player(PlayerRecord),
    Game(GameRecord),
    Coach(CoachRecord),
}

impl Record {
    /// The kind of this record.
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Team(_) => RecordKind::Team,
            Self::Player(_) => RecordKind::Player,
            Self::Game(_) => RecordKind::Game,
            Self::Coach(_) => RecordKind::Coach,
        }
    }
}

/// A franchise and its history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamRecord {
    /// Short code used by game records (e.g. `LAL`). Identity field.
    pub abbreviation: String,
    /// Full franchise name. Identity field.
    pub name: String,
    pub city: Option<String>,
    pub founded_year: Option<i32>,
    pub league: Option<String>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub games: Option<u32>,
    pub wins: Option<u32>,
    pub losses: Option<u32>,
    pub win_loss_pct: Option<f64>,
    pub years_playoffs: Option<u32>,
    pub years_div_champs: Option<u32>,
    pub years_conf_champs: Option<u32>,
    pub years_league_champs: Option<u32>,
    /// Season-by-season results.
    pub seasons: Vec<TeamSeason>,
}

/// One regular season of a franchise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamSeason {
    /// Year the season ended in (the 2019-20 season is `2020`).
    pub season: i32,
    pub wins: u32,
    pub losses: u32,
    pub playoff_result: Option<String>,
    pub champion: bool,
}

/// A tabular statistics block scraped from a profile page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl StatTable {
    /// Rows that carry at least one non-empty cell.
    pub fn populated_rows(&self) -> impl Iterator<Item = &Vec<Option<String>>> {
        self.rows.iter().filter(|row| {
            row.iter()
                .any(|cell| cell.as_deref().is_some_and(|c| !c.trim().is_empty()))
        })
    }
}

/// A player with biography and statistics tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerRecord {
    /// Record store identifier. Identity field.
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<String>,
    pub bio: BTreeMap<String, String>,
    /// Statistics tables keyed by table id (e.g. `per_game`, `advanced`).
    pub stats: BTreeMap<String, StatTable>,
}

impl PlayerRecord {
    /// First and last name joined, trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// A single scheduled or completed game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRecord {
    /// Record store identifier; derived from date and teams when absent.
    pub id: Option<String>,
    pub season: Option<i32>,
    /// ISO date of the game. Identity field.
    pub date: String,
    /// Abbreviation of the home team. Identity field.
    pub home_team: String,
    /// Abbreviation of the visiting team. Identity field.
    pub away_team: String,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub league: Option<String>,
}

impl GameRecord {
    /// Stable identifier for this game.
    pub fn source_id(&self) -> String {
        match &self.id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => format!(
                "{}-{}-{}",
                self.date.trim(),
                self.away_team.trim(),
                self.home_team.trim()
            ),
        }
    }

    /// Final score as `(home, away)` when the game has been played.
    pub fn final_score(&self) -> Option<(u32, u32)> {
        self.home_score.zip(self.away_score)
    }
}

/// A head coach with career aggregates and tenures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachRecord {
    /// Record store identifier. Identity field.
    pub id: String,
    /// Identity field.
    pub full_name: String,
    pub bio: BTreeMap<String, String>,
    pub career: Option<CoachCareer>,
    pub tenures: Vec<CoachTenure>,
    pub stats: BTreeMap<String, StatTable>,
}

/// Aggregated career numbers for a coach.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachCareer {
    pub seasons: u32,
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub playoff_wins: u32,
    pub playoff_losses: u32,
    pub championships: u32,
}

/// A stint coaching one team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachTenure {
    /// Team abbreviation or full name.
    pub team: String,
    pub from_season: i32,
    pub to_season: i32,
    pub wins: u32,
    pub losses: u32,
    pub playoff_appearances: u32,
}

/// A complete enumeration of every record kind, as read from the record store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Corpus {
    pub teams: Vec<TeamRecord>,
    pub players: Vec<PlayerRecord>,
    pub games: Vec<GameRecord>,
    pub coaches: Vec<CoachRecord>,
    /// Records present in the export that could not be decoded. They are
    /// reported as build failures.
    #[serde(skip)]
    pub rejected: Vec<BuildFailure>,
}

impl Corpus {
    /// Total number of records across kinds, rejected ones included.
    pub fn len(&self) -> usize {
        self.teams.len()
            + self.players.len()
            + self.games.len()
            + self.coaches.len()
            + self.rejected.len()
    }

    /// Whether the corpus holds no records at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten the corpus into tagged records, teams first.
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.teams
            .iter()
            .cloned()
            .map(Record::Team)
            .chain(self.players.iter().cloned().map(Record::Player))
            .chain(self.games.iter().cloned().map(Record::Game))
            .chain(self.coaches.iter().cloned().map(Record::Coach))
    }
}

/// Win percentage with three decimals, or `None` when no games were played.
pub(crate) fn win_pct(wins: u32, losses: u32) -> Option<f64> {
    let games = wins + losses;
    if games == 0 {
        None
    } else {
        Some(f64::from(wins) / f64::from(games))
    }
}
