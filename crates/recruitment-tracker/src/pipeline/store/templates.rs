use rusqlite::{params, OptionalExtension};

use super::SqliteStore;
use crate::pipeline::outreach::EmailTemplate;
use crate::pipeline::repository::{RepositoryError, TemplateRepository};

impl TemplateRepository for SqliteStore {
    fn template_for(&self, name: &str) -> Result<Option<EmailTemplate>, RepositoryError> {
        let conn = self.get_conn()?;
        let template = conn
            .query_row(
                "SELECT name, subject, body FROM email_templates WHERE name = ?1",
                params![name],
                |row| {
                    Ok(EmailTemplate {
                        name: row.get(0)?,
                        subject: row.get(1)?,
                        body: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(template)
    }

    fn save_template(&self, template: &EmailTemplate) -> Result<(), RepositoryError> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO email_templates (name, subject, body) VALUES (?1, ?2, ?3)
             ON CONFLICT (name) DO UPDATE SET subject = excluded.subject, body = excluded.body",
            params![template.name, template.subject, template.body],
        )?;
        Ok(())
    }
}
