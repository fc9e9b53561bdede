//! Player records: one biography document and one document per statistics
//! table, so a career's worth of numbers never lands in a single unit.

use crate::builder::{DocumentBuilder, require};
use crate::document::Document;
use crate::error::Result;
use crate::record::{PlayerRecord, RecordKind};
use crate::table::render_table;

/// Builds player documents.
#[derive(Debug, Clone, Copy)]
pub struct PlayerDocuments {
    max_table_rows: usize,
}

impl PlayerDocuments {
    pub fn new(max_table_rows: usize) -> Self {
        Self { max_table_rows }
    }
}

impl DocumentBuilder for PlayerDocuments {
    type Record = PlayerRecord;
    const KIND: RecordKind = RecordKind::Player;

    fn build(&self, player: &PlayerRecord) -> Result<Vec<Document>> {
        let id = require(Self::KIND, None, "id", &player.id)?;
        let full_name = player.full_name();
        let name = require(Self::KIND, Some(id), "first_name/last_name", &full_name)?;

        let mut bio = format!("Player: {name}");
        if let Some(birth) = player.birth_date.as_deref().filter(|b| !b.trim().is_empty()) {
            bio.push_str(&format!("\nBirth date: {}", birth.trim()));
        }
        for (key, value) in &player.bio {
            let (key, value) = (key.trim(), value.trim());
            if !key.is_empty() && !value.is_empty() {
                bio.push_str(&format!("\n{key}: {value}"));
            }
        }

        let mut documents = vec![
            Document::new(format!("player:{id}:bio"), Self::KIND, id, bio)
                .with_meta("section", "bio")
                .with_meta("player_name", name)
                .with_meta("first_name", player.first_name.trim())
                .with_meta("last_name", player.last_name.trim())
                .with_opt_meta("birth_date", player.birth_date.clone()),
        ];

        let subject = format!("Player: {name}");
        for (table_id, table) in &player.stats {
            for part in render_table(&subject, table_id, table, self.max_table_rows) {
                let doc_id = if part.parts > 1 {
                    format!("player:{id}:stats:{table_id}:{}", part.part)
                } else {
                    format!("player:{id}:stats:{table_id}")
                };
                documents.push(
                    Document::new(doc_id, Self::KIND, id, part.text)
                        .with_meta("section", "stats")
                        .with_meta("player_name", name)
                        .with_meta("table", table_id.as_str())
                        .with_meta("part", part.part)
                        .with_meta("parts", part.parts)
                        .with_meta("rows", part.rows),
                );
            }
        }

        Ok(documents)
    }
}
