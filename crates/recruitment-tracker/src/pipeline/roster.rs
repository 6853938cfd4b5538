use serde::{Deserialize, Deserializer, Serialize};
use std::io::Read;
use std::path::Path;

/// One row handed over by the spreadsheet importer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRow {
    #[serde(alias = "Name", alias = "full_name")]
    pub name: String,
    #[serde(alias = "Email")]
    pub email: String,
    #[serde(alias = "Phone", default, deserialize_with = "empty_string_as_none")]
    pub phone: Option<String>,
    #[serde(
        alias = "Degree",
        alias = "degree_type",
        rename = "degreeType",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub degree_type: Option<String>,
}

impl RosterRow {
    pub(crate) fn normalized(&self) -> Result<RosterRow, RosterError> {
        let name = self.name.trim();
        let email = self.email.trim().to_ascii_lowercase();

        if email.is_empty() || !email.contains('@') {
            return Err(RosterError::InvalidEmail {
                value: self.email.clone(),
            });
        }
        if name.is_empty() {
            return Err(RosterError::MissingName { email });
        }

        Ok(RosterRow {
            name: name.to_string(),
            email,
            phone: self.phone.as_deref().map(str::trim).map(str::to_string),
            degree_type: self
                .degree_type
                .as_deref()
                .map(str::trim)
                .map(str::to_string),
        })
    }
}

/// Counters returned by the upsert-by-email import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub processed: usize,
    pub inserted: usize,
    pub updated: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to read roster: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid roster CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("roster row has an invalid email '{value}'")]
    InvalidEmail { value: String },
    #[error("roster row for {email} has no name")]
    MissingName { email: String },
}

/// CSV adapter for roster exports with `Name,Email,Phone,Degree` headers.
pub struct RosterCsv;

impl RosterCsv {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RosterRow>, RosterError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<RosterRow>, RosterError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut rows = Vec::new();

        for record in csv_reader.deserialize::<RosterRow>() {
            rows.push(record?);
        }

        Ok(rows)
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spreadsheet_headers() {
        let csv = "Name,Email,Phone,Degree\n\
Joana Prates,joana@example.org,912345678,Master\n\
Luis Faria,LUIS@example.org,,\n";

        let rows = RosterCsv::from_reader(csv.as_bytes()).expect("csv parses");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Joana Prates");
        assert_eq!(rows[0].degree_type.as_deref(), Some("Master"));
        assert!(rows[1].phone.is_none());
        assert!(rows[1].degree_type.is_none());
    }

    #[test]
    fn normalization_lowercases_email() {
        let row = RosterRow {
            name: " Luis Faria ".to_string(),
            email: " LUIS@example.org".to_string(),
            phone: None,
            degree_type: Some("Bachelor ".to_string()),
        };
        let normalized = row.normalized().expect("valid row");
        assert_eq!(normalized.email, "luis@example.org");
        assert_eq!(normalized.name, "Luis Faria");
        assert_eq!(normalized.degree_type.as_deref(), Some("Bachelor"));
    }

    #[test]
    fn rows_without_email_are_invalid() {
        let row = RosterRow {
            name: "No Mail".to_string(),
            email: "n/a".to_string(),
            phone: None,
            degree_type: None,
        };
        assert!(matches!(
            row.normalized(),
            Err(RosterError::InvalidEmail { .. })
        ));
    }

    #[test]
    fn json_rows_accept_camel_case_degree() {
        let row: RosterRow = serde_json::from_str(
            r#"{ "name": "Ines", "email": "ines@example.org", "phone": "1", "degreeType": "PhD" }"#,
        )
        .expect("json row");
        assert_eq!(row.degree_type.as_deref(), Some("PhD"));
    }
}
