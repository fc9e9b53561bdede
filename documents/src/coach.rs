//! Coach records: biography, career aggregate, one document per tenure,
//! and any scraped statistics tables.

use crate::builder::{DocumentBuilder, TeamDirectory, require};
use crate::document::Document;
use crate::error::Result;
use crate::record::{CoachCareer, CoachRecord, CoachTenure, RecordKind, win_pct};
use crate::table::render_table;

/// Builds coach documents.
#[derive(Debug, Clone, Copy)]
pub struct CoachDocuments<'a> {
    teams: &'a TeamDirectory,
    max_table_rows: usize,
}

impl<'a> CoachDocuments<'a> {
    pub fn new(teams: &'a TeamDirectory, max_table_rows: usize) -> Self {
        Self {
            teams,
            max_table_rows,
        }
    }

    fn team_label(&self, team: &str) -> String {
        // Tenures may carry either an abbreviation or a full name.
        match self.teams.name(team) {
            Some(_) => self.teams.describe(team),
            None => team.trim().to_string(),
        }
    }

    fn career(&self, id: &str, name: &str, career: &CoachCareer) -> Document {
        let mut text = format!(
            "Coach: {name}\nCareer regular season record: {} wins, {} losses over {} games in {} seasons",
            career.wins, career.losses, career.games, career.seasons
        );
        if let Some(pct) = win_pct(career.wins, career.losses) {
            text.push_str(&format!("\nCareer win percentage: {pct:.3}"));
        }
        text.push_str(&format!(
            "\nPlayoff record: {} wins, {} losses\nChampionships won as head coach: {}",
            career.playoff_wins, career.playoff_losses, career.championships
        ));

        Document::new(format!("coach:{id}:career"), RecordKind::Coach, id, text)
            .with_meta("section", "career")
            .with_meta("full_name", name)
            .with_meta("wins", career.wins)
            .with_meta("losses", career.losses)
            .with_meta("championships", career.championships)
    }

    fn tenure(&self, id: &str, name: &str, tenure: &CoachTenure) -> Document {
        let team = self.team_label(&tenure.team);
        let mut text = format!(
            "Coach: {name}\nTenure: head coach of {team} from the {} season through the {} season",
            tenure.from_season, tenure.to_season
        );
        text.push_str(&format!(
            "\nRecord with {}: {} wins, {} losses",
            self.teams.short(&tenure.team),
            tenure.wins,
            tenure.losses
        ));
        if let Some(pct) = win_pct(tenure.wins, tenure.losses) {
            text.push_str(&format!(" ({pct:.3})"));
        }
        text.push_str(&format!(
            "\nPlayoff appearances: {}",
            tenure.playoff_appearances
        ));

        let team_key = tenure.team.trim().replace(' ', "_");
        Document::new(
            format!("coach:{id}:tenure:{team_key}:{}", tenure.from_season),
            RecordKind::Coach,
            id,
            text,
        )
        .with_meta("section", "tenure")
        .with_meta("full_name", name)
        .with_meta("team", self.teams.short(&tenure.team))
        .with_meta("from_season", tenure.from_season)
        .with_meta("to_season", tenure.to_season)
    }
}

impl DocumentBuilder for CoachDocuments<'_> {
    type Record = CoachRecord;
    const KIND: RecordKind = RecordKind::Coach;

    fn build(&self, coach: &CoachRecord) -> Result<Vec<Document>> {
        let id = require(Self::KIND, None, "id", &coach.id)?;
        let name = require(Self::KIND, Some(id), "full_name", &coach.full_name)?;

        let mut bio = format!("Coach: {name}");
        for (key, value) in &coach.bio {
            let (key, value) = (key.trim(), value.trim());
            if !key.is_empty() && !value.is_empty() {
                bio.push_str(&format!("\n{key}: {value}"));
            }
        }
        if !coach.tenures.is_empty() {
            let teams: Vec<String> = coach
                .tenures
                .iter()
                .map(|t| self.teams.short(&t.team))
                .collect();
            bio.push_str(&format!("\nTeams coached: {}", teams.join(", ")));
        }

        let mut documents = vec![
            Document::new(format!("coach:{id}:bio"), Self::KIND, id, bio)
                .with_meta("section", "bio")
                .with_meta("full_name", name),
        ];

        if let Some(career) = &coach.career {
            documents.push(self.career(id, name, career));
        }

        let mut tenures: Vec<&CoachTenure> = coach
            .tenures
            .iter()
            .filter(|t| !t.team.trim().is_empty())
            .collect();
        tenures.sort_by_key(|t| t.from_season);
        for tenure in tenures {
            let doc = self.tenure(id, name, tenure);
            // Two stints with the same team starting the same season collapse.
            if !documents.iter().any(|d| d.id == doc.id) {
                documents.push(doc);
            }
        }

        let subject = format!("Coach: {name}");
        for (table_id, table) in &coach.stats {
            for part in render_table(&subject, table_id, table, self.max_table_rows) {
                let doc_id = if part.parts > 1 {
                    format!("coach:{id}:stats:{table_id}:{}", part.part)
                } else {
                    format!("coach:{id}:stats:{table_id}")
                };
                documents.push(
                    Document::new(doc_id, Self::KIND, id, part.text)
                        .with_meta("section", "stats")
                        .with_meta("full_name", name)
                        .with_meta("table", table_id.as_str())
                        .with_meta("part", part.part)
                        .with_meta("parts", part.parts),
                );
            }
        }

        Ok(documents)
    }
}
