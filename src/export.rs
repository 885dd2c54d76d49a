//! Periodic snapshot export.
//!
//! Serializes the whole portal dataset into a flat text report for the
//! facilities team's offline tooling. One record per line, tab-separated,
//! grouped into sections. The export loop rewrites the file in place on
//! every run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use crate::error::{PortalError, Result};
use crate::store::PortalStore;
use crate::store::types::{Card, Category, Contact, Task, parse_entries};

/// Writes point-in-time snapshots of the portal dataset.
pub struct SnapshotExporter {
    store: Arc<dyn PortalStore>,
    output_path: PathBuf,
}

impl SnapshotExporter {
    pub fn new(store: Arc<dyn PortalStore>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            output_path: output_path.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Read everything and rewrite the snapshot file.
    ///
    /// Creates parent directories as needed. Errors propagate to the export
    /// loop, which logs them and waits for the next tick.
    pub async fn export_once(&self, generated_at: DateTime<Utc>) -> Result<()> {
        let cards = self.store.cards().await?;
        let tasks = self.store.tasks().await?;
        let categories = self.store.categories().await?;
        let contacts = self.store.contacts().await?;

        let report = render_report(generated_at, &cards, &tasks, &categories, &contacts);

        if let Some(parent) = self.output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PortalError::Export(format!("create {}: {e}", parent.display()))
            })?;
        }
        std::fs::write(&self.output_path, report).map_err(|e| {
            PortalError::Export(format!("write {}: {e}", self.output_path.display()))
        })?;

        info!(
            path = %self.output_path.display(),
            cards = cards.len(),
            tasks = tasks.len(),
            contacts = contacts.len(),
            "snapshot exported"
        );
        Ok(())
    }
}

fn render_report(
    generated_at: DateTime<Utc>,
    cards: &[Card],
    tasks: &[Task],
    categories: &[Category],
    contacts: &[Contact],
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# wallboard snapshot {}\n",
        generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));

    out.push_str("\n[cards]\nid\ttitle\tsubtitle\timage\tentries\n");
    for card in cards {
        let entries = match card.schedule_entries.as_deref() {
            None => "0".to_owned(),
            Some(blob) => match parse_entries(blob) {
                Ok(list) => list.len().to_string(),
                Err(_) => "?".to_owned(),
            },
        };
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\n",
            card.id,
            field(&card.title),
            field(&card.subtitle),
            card.image.as_deref().unwrap_or("-"),
            entries,
        ));
    }

    out.push_str("\n[tasks]\nid\ttitle\tdone\tcategory\tdue\n");
    for task in tasks {
        let category = task
            .category_id
            .and_then(|id| categories.iter().find(|c| c.id == id))
            .map(|c| c.name.as_str())
            .unwrap_or("-");
        let due = task
            .due_date
            .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| "-".to_owned());
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\n",
            task.id,
            field(&task.title),
            if task.done { "yes" } else { "no" },
            field(category),
            due,
        ));
    }

    out.push_str("\n[categories]\nid\tname\n");
    for category in categories {
        out.push_str(&format!("{}\t{}\n", category.id, field(&category.name)));
    }

    out.push_str("\n[contacts]\nid\tname\tdepartment\tphone\temail\n");
    for contact in contacts {
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\n",
            contact.id,
            field(&contact.name),
            field(&contact.department),
            field(&contact.phone),
            field(&contact.email),
        ));
    }

    out
}

// Free-text fields must not break the column layout.
fn field(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}
