//! CSV rendering of exported leads.

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use thiserror::Error;

use crate::models::lead;

pub const CSV_HEADER: &str = "fullName,email,phone,city,propertyType,bhk,purpose,budgetMin,budgetMax,timeline,source,notes,tags,status";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write CSV row: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to finish CSV document: {0}")]
    Flush(String),
}

/// `buyer-leads-YYYY-MM-DD.csv`
pub fn export_filename(date: NaiveDate) -> String {
    format!("buyer-leads-{}.csv", date.format("%Y-%m-%d"))
}

/// Renders the header line followed by one fully quoted row per lead.
///
/// Absent optional values become empty quoted cells.
pub fn render_csv(leads: &[lead::Model]) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::with_capacity(CSV_HEADER.len() + 1 + leads.len() * 128);
    buffer.extend_from_slice(CSV_HEADER.as_bytes());
    buffer.push(b'\n');

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(buffer);

    for lead in leads {
        let budget_min = lead.budget_min.map(|v| v.to_string()).unwrap_or_default();
        let budget_max = lead.budget_max.map(|v| v.to_string()).unwrap_or_default();

        writer.write_record([
            lead.full_name.as_str(),
            lead.email.as_deref().unwrap_or(""),
            lead.phone.as_str(),
            lead.city.as_str(),
            lead.property_type.as_str(),
            lead.bhk.as_ref().map(|b| b.as_str()).unwrap_or(""),
            lead.purpose.as_str(),
            budget_min.as_str(),
            budget_max.as_str(),
            lead.timeline.as_str(),
            lead.source.as_str(),
            lead.notes.as_deref().unwrap_or(""),
            lead.tags.as_str(),
            lead.status.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|err| ExportError::Flush(err.error().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bhk, City, LeadStatus, PropertyType, Purpose, Source, Timeline};
    use chrono::Utc;
    use uuid::Uuid;

    fn lead() -> lead::Model {
        let now = Utc::now().into();
        lead::Model {
            id: Uuid::new_v4(),
            full_name: "John \"JD\" Doe".to_string(),
            email: Some("john@example.com".to_string()),
            phone: "9876543210".to_string(),
            city: City::Mohali,
            property_type: PropertyType::Apartment,
            bhk: Some(Bhk::Two),
            purpose: Purpose::Buy,
            budget_min: Some(5_000_000),
            budget_max: None,
            timeline: Timeline::Exploring,
            source: Source::Website,
            status: LeadStatus::New,
            notes: Some("wants, a view".to_string()),
            tags: "hot,nri".to_string(),
            owner_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_export_is_just_the_header() {
        let csv = String::from_utf8(render_csv(&[]).unwrap()).unwrap();
        assert_eq!(csv, format!("{}\n", CSV_HEADER));
    }

    #[test]
    fn rows_quote_every_cell_and_double_embedded_quotes() {
        let csv = String::from_utf8(render_csv(&[lead()]).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "\"John \"\"JD\"\" Doe\",\"john@example.com\",\"9876543210\",\"MOHALI\",\"APARTMENT\",\"TWO\",\"BUY\",\"5000000\",\"\",\"EXPLORING\",\"WEBSITE\",\"wants, a view\",\"hot,nri\",\"NEW\""
        );
    }

    #[test]
    fn filename_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(export_filename(date), "buyer-leads-2024-03-07.csv");
    }
}
