//! Team records: a franchise profile plus one document per season.

use crate::builder::{DocumentBuilder, require};
use crate::document::Document;
use crate::error::Result;
use crate::record::{RecordKind, TeamRecord, TeamSeason, win_pct};

/// Builds team documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeamDocuments;

fn line<T: std::fmt::Display>(text: &mut String, label: &str, value: Option<T>) {
    if let Some(value) = value {
        text.push_str(&format!("\n{label}: {value}"));
    }
}

impl TeamDocuments {
    fn profile(&self, team: &TeamRecord, abbr: &str, name: &str) -> Document {
        let mut text = format!("Team: {name} (abbreviation {abbr})");
        line(&mut text, "City", team.city.as_deref());
        line(&mut text, "Founded", team.founded_year);
        line(&mut text, "League", team.league.as_deref());
        match (team.year_min, team.year_max) {
            (Some(from), Some(to)) => text.push_str(&format!("\nYears active: {from} - {to}")),
            (Some(from), None) => text.push_str(&format!("\nYears active: since {from}")),
            _ => {}
        }
        line(&mut text, "Total games", team.games);
        line(&mut text, "Total wins", team.wins);
        line(&mut text, "Total losses", team.losses);
        line(
            &mut text,
            "Win percentage",
            team.win_loss_pct.map(|p| format!("{p:.3}")),
        );
        line(&mut text, "Playoff appearances", team.years_playoffs);
        line(&mut text, "Division championships", team.years_div_champs);
        line(&mut text, "Conference championships", team.years_conf_champs);
        line(&mut text, "League championships", team.years_league_champs);

        let titles: Vec<String> = team
            .seasons
            .iter()
            .filter(|s| s.champion)
            .map(|s| s.season.to_string())
            .collect();
        if !titles.is_empty() {
            text.push_str(&format!(
                "\nChampionship seasons: {}",
                titles.join(", ")
            ));
        }

        Document::new(
            format!("team:{abbr}:profile"),
            RecordKind::Team,
            abbr,
            text,
        )
        .with_meta("section", "profile")
        .with_meta("team_name", name)
        .with_meta("abbreviation", abbr)
        .with_opt_meta("city", team.city.clone())
        .with_opt_meta("founded_year", team.founded_year)
        .with_opt_meta("year_min", team.year_min)
        .with_opt_meta("year_max", team.year_max)
    }

    fn season(&self, abbr: &str, name: &str, season: &TeamSeason) -> Document {
        let mut text = format!(
            "{name} won {} games and lost {} games in the {} season ({}-{:02}).",
            season.wins,
            season.losses,
            season.season,
            season.season - 1,
            season.season.rem_euclid(100)
        );
        if let Some(pct) = win_pct(season.wins, season.losses) {
            text.push_str(&format!("\nWin percentage: {pct:.3}"));
        }
        if let Some(result) = season
            .playoff_result
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
        {
            text.push_str(&format!("\nPlayoffs: {result}"));
        }
        if season.champion {
            text.push_str(&format!("\n{name} won the league championship in {}.", season.season));
        }

        Document::new(
            format!("team:{abbr}:season:{}", season.season),
            RecordKind::Team,
            abbr,
            text,
        )
        .with_meta("section", "season")
        .with_meta("team_name", name)
        .with_meta("abbreviation", abbr)
        .with_meta("season", season.season)
        .with_meta("champion", season.champion)
    }
}

impl DocumentBuilder for TeamDocuments {
    type Record = TeamRecord;
    const KIND: RecordKind = RecordKind::Team;

    fn build(&self, team: &TeamRecord) -> Result<Vec<Document>> {
        let abbr = require(Self::KIND, None, "abbreviation", &team.abbreviation)?;
        let name = require(Self::KIND, Some(abbr), "name", &team.name)?;

        let mut documents = Vec::with_capacity(1 + team.seasons.len());
        documents.push(self.profile(team, abbr, name));

        let mut seasons: Vec<&TeamSeason> = team.seasons.iter().collect();
        seasons.sort_by_key(|s| s.season);
        seasons.dedup_by_key(|s| s.season);
        documents.extend(seasons.into_iter().map(|s| self.season(abbr, name, s)));

        Ok(documents)
    }
}
