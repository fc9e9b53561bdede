//! Game records: one document per game, plus per-season summaries
//! aggregated across all completed games.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::builder::{DocumentBuilder, TeamDirectory, require};
use crate::document::Document;
use crate::error::{DocumentError, Result};
use crate::record::{GameRecord, RecordKind, win_pct};

/// Builds one document per game.
#[derive(Debug, Clone, Copy)]
pub struct GameDocuments<'a> {
    teams: &'a TeamDirectory,
}

impl<'a> GameDocuments<'a> {
    pub fn new(teams: &'a TeamDirectory) -> Self {
        Self { teams }
    }
}

impl DocumentBuilder for GameDocuments<'_> {
    type Record = GameRecord;
    const KIND: RecordKind = RecordKind::Game;

    fn build(&self, game: &GameRecord) -> Result<Vec<Document>> {
        let source_id = game.source_id();
        let id = Some(source_id.as_str());
        let date = require(Self::KIND, id, "date", &game.date)?;
        let home = require(Self::KIND, id, "home_team", &game.home_team)?;
        let away = require(Self::KIND, id, "away_team", &game.away_team)?;
        let season = game
            .season
            .ok_or_else(|| DocumentError::build(Self::KIND, id, "missing required field `season`"))?;

        let home_label = self.teams.describe(home);
        let away_label = self.teams.describe(away);
        let league = game.league.as_deref().unwrap_or("NBA");

        let mut text = format!(
            "{league} game on {date} in the {season} season: {away_label} visited {home_label}."
        );
        match game.final_score() {
            Some((home_score, away_score)) => {
                text.push_str(&format!(
                    "\nFinal score: {} {away_score}, {} {home_score}.",
                    self.teams.short(away),
                    self.teams.short(home)
                ));
                match home_score.cmp(&away_score) {
                    Ordering::Greater => text.push_str(&format!(
                        "\n{home_label} beat {away_label} {home_score}-{away_score}."
                    )),
                    Ordering::Less => text.push_str(&format!(
                        "\n{away_label} beat {home_label} {away_score}-{home_score}."
                    )),
                    Ordering::Equal => text.push_str(&format!(
                        "\nThe recorded score is tied {home_score}-{away_score}."
                    )),
                }
            }
            None => text.push_str("\nNo final score is recorded for this game."),
        }

        let doc = Document::new(format!("game:{source_id}"), Self::KIND, source_id.clone(), text)
            .with_meta("section", "game")
            .with_meta("season", season)
            .with_meta("date", date)
            .with_meta("home_team", self.teams.short(home))
            .with_meta("away_team", self.teams.short(away))
            .with_opt_meta("home_score", game.home_score)
            .with_opt_meta("away_score", game.away_score);
        Ok(vec![doc])
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct TeamTally {
    wins: u32,
    losses: u32,
    ties: u32,
    points_for: u64,
    points_against: u64,
}

impl TeamTally {
    /// Add one completed game seen from this team's side.
    fn record(&mut self, scored: u32, allowed: u32, result: Ordering) {
        self.points_for += u64::from(scored);
        self.points_against += u64::from(allowed);
        match result {
            Ordering::Greater => self.wins += 1,
            Ordering::Less => self.losses += 1,
            Ordering::Equal => self.ties += 1,
        }
    }
}

/// Aggregates completed games into one summary document per season.
#[derive(Debug, Clone, Copy)]
pub struct SeasonSummaries<'a> {
    teams: &'a TeamDirectory,
    top_teams: usize,
}

impl<'a> SeasonSummaries<'a> {
    pub fn new(teams: &'a TeamDirectory, top_teams: usize) -> Self {
        Self { teams, top_teams }
    }

    /// Build summaries, newest season first. Games without identity or
    /// season are ignored here; they are reported by [`GameDocuments`].
    pub fn build(&self, games: &[GameRecord]) -> Vec<Document> {
        let mut seasons: BTreeMap<i32, Vec<&GameRecord>> = BTreeMap::new();
        for game in games {
            let valid = !game.date.trim().is_empty()
                && !game.home_team.trim().is_empty()
                && !game.away_team.trim().is_empty();
            if let (true, Some(season)) = (valid, game.season) {
                seasons.entry(season).or_default().push(game);
            }
        }

        seasons
            .into_iter()
            .rev()
            .map(|(season, games)| self.summarize(season, &games))
            .collect()
    }

    fn summarize(&self, season: i32, games: &[&GameRecord]) -> Document {
        let mut tallies: BTreeMap<String, TeamTally> = BTreeMap::new();
        let mut completed = 0usize;

        for game in games {
            let Some((home_score, away_score)) = game.final_score() else {
                continue;
            };
            completed += 1;
            let home = game.home_team.trim().to_uppercase();
            let away = game.away_team.trim().to_uppercase();
            let result = home_score.cmp(&away_score);

            let h = tallies.entry(home).or_default();
            h.record(home_score, away_score, result);
            let a = tallies.entry(away).or_default();
            a.record(away_score, home_score, result.reverse());
        }

        let league = games
            .first()
            .and_then(|g| g.league.as_deref())
            .unwrap_or("NBA");
        let mut text = format!(
            "{league} season {season} statistics\nTotal games: {}\nCompleted games: {completed}",
            games.len()
        );

        // Stable: ties on wins keep abbreviation order.
        let mut ranked: Vec<(&String, &TeamTally)> = tallies.iter().collect();
        ranked.sort_by(|a, b| b.1.wins.cmp(&a.1.wins));

        if !ranked.is_empty() {
            text.push_str("\nTeam performance (most wins first):");
        }
        for (abbr, tally) in ranked.iter().take(self.top_teams) {
            let pct = win_pct(tally.wins, tally.losses).unwrap_or(0.0);
            let ties = if tally.ties > 0 {
                format!(", {} ties", tally.ties)
            } else {
                String::new()
            };
            text.push_str(&format!(
                "\n{}: {} wins, {} losses{ties} ({pct:.3}), points for {}, points against {}",
                self.teams.describe(abbr),
                tally.wins,
                tally.losses,
                tally.points_for,
                tally.points_against
            ));
        }

        let source_id = format!("season_{season}");
        Document::new(
            format!("game:{source_id}:summary"),
            RecordKind::Game,
            source_id,
            text,
        )
        .with_meta("section", "season_summary")
        .with_meta("season", season)
        .with_meta("total_games", games.len())
        .with_meta("completed_games", completed)
    }
}
