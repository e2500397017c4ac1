use std::collections::BTreeMap;

use gridcast_client::domain::{GridRecord, FIELD_COUNT, FIELD_NAMES, TS_FORMAT};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::PrimitiveDateTime;

use crate::error::SyncError;
use crate::fetch::RawBatch;

/// Source-side name of the timestamp column. The only column whose absence
/// (or an unparseable value in it) fails the batch: a row without a key
/// cannot be upserted.
pub const TS_COLUMN: &str = "Data e Hora";

/// Source column names, aligned index-for-index with
/// `gridcast_client::domain::FIELD_NAMES`. Lookup is always by header name;
/// the source reordering or appending columns cannot shift values into the
/// wrong field.
pub const SOURCE_FIELD_NAMES: [&str; FIELD_COUNT] = [
    "Hídrica",               // hydro
    "Eólica",                // wind
    "Solar",                 // solar
    "Biomassa",              // biomass
    "Ondas",                 // waves
    "Gás Natural - Ciclo Combinado", // gas_combined
    "Gás natural - Cogeração",       // gas_cogeneration; lowercase n per the source
    "Carvão",                // coal
    "Outra Térmica",         // other_thermal
    "Importação",            // import
    "Exportação",            // export
    "Bombagem",              // pumped_storage
    "Injeção de Baterias",   // battery_injection
    "Consumo Baterias",      // battery_consumption; no "de" per the source
    "Consumo",               // consumption
];

/// Timestamp layouts observed in the export, canonical first.
const SOURCE_TS_FORMATS: [&[BorrowedFormatItem<'static>]; 3] = [
    TS_FORMAT,
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
    format_description!("[day]-[month]-[year] [hour]:[minute]"),
];

fn parse_timestamp(s: &str) -> Option<PrimitiveDateTime> {
    SOURCE_TS_FORMATS
        .iter()
        .find_map(|fmt| PrimitiveDateTime::parse(s, fmt).ok())
}

/// Coerce a locale-formatted numeric cell. Empty and placeholder cells are
/// null, as is anything that fails to parse; a production figure the source
/// did not publish must not become a zero.
fn parse_locale_f64(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    if trimmed.contains(',') {
        // pt-PT: decimal comma, '.' as thousands separator.
        trimmed.replace('.', "").replace(',', ".").parse().ok()
    } else {
        trimmed.parse().ok()
    }
}

/// Map raw rows onto canonical records: keyed by parsed timestamp,
/// deduplicated keep-last, returned in ascending timestamp order.
pub fn normalize_batch(batch: &RawBatch) -> Result<Vec<GridRecord>, SyncError> {
    let header_pos = |name: &str| batch.headers.iter().position(|h| h.trim() == name);

    let ts_idx = header_pos(TS_COLUMN).ok_or_else(|| {
        SyncError::Normalize(format!("timestamp column {TS_COLUMN:?} missing from payload"))
    })?;

    // A mapped column absent from this payload leaves its field null for the
    // whole batch rather than failing it. Loudly, though: a quiet all-null
    // column is indistinguishable from a source outage.
    let field_idx: [Option<usize>; FIELD_COUNT] = SOURCE_FIELD_NAMES.map(header_pos);
    for (i, idx) in field_idx.iter().enumerate() {
        if idx.is_none() {
            tracing::warn!(
                column = SOURCE_FIELD_NAMES[i],
                field = FIELD_NAMES[i],
                "mapped column absent from payload, field will be null"
            );
        }
    }

    let mut by_ts: BTreeMap<PrimitiveDateTime, GridRecord> = BTreeMap::new();
    for row in &batch.rows {
        let raw_ts = row.get(ts_idx).unwrap_or("").trim();
        let ts = parse_timestamp(raw_ts).ok_or_else(|| {
            SyncError::Normalize(format!("unparseable timestamp {raw_ts:?}"))
        })?;

        let mut values = [None; FIELD_COUNT];
        for (slot, idx) in values.iter_mut().zip(field_idx) {
            if let Some(i) = idx {
                *slot = row.get(i).and_then(parse_locale_f64);
            }
        }
        by_ts.insert(ts, GridRecord::from_values(ts, values));
    }

    Ok(by_ts.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use csv::StringRecord;
    use time::macros::datetime;

    fn batch(headers: &[&str], rows: &[&[&str]]) -> RawBatch {
        RawBatch {
            headers: StringRecord::from(headers.to_vec()),
            rows: rows.iter().map(|r| StringRecord::from(r.to_vec())).collect(),
        }
    }

    #[test]
    fn maps_columns_by_name_not_position() {
        // Consumption ahead of hydro, plus an unknown extra column.
        let b = batch(
            &["Consumo", "Extra", "Data e Hora", "Hídrica"],
            &[&["5000", "x", "2024-03-01 00:00:00", "120,5"]],
        );
        let recs = normalize_batch(&b).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].ts, datetime!(2024-03-01 00:00:00));
        assert_eq!(recs[0].hydro, Some(120.5));
        assert_eq!(recs[0].consumption, Some(5000.0));
        assert_eq!(recs[0].wind, None);
    }

    #[test]
    fn coerces_locale_numbers_and_nulls() {
        let b = batch(
            &["Data e Hora", "Hídrica", "Eólica", "Solar", "Consumo"],
            &[&["2024-03-01 00:00:00", "1.234,56", "", "-", "abc"]],
        );
        let recs = normalize_batch(&b).unwrap();
        assert_eq!(recs[0].hydro, Some(1234.56));
        assert_eq!(recs[0].wind, None);
        assert_eq!(recs[0].solar, None);
        assert_eq!(recs[0].consumption, None);
    }

    #[test]
    fn matches_source_spelling_of_cogeneration_and_battery_columns() {
        // The source spells these with a lowercase n and without "de";
        // an exact-match miss here would leave the fields null forever.
        let b = batch(
            &["Data e Hora", "Gás natural - Cogeração", "Consumo Baterias"],
            &[&["2024-03-01 00:00:00", "55,5", "7,5"]],
        );
        let recs = normalize_batch(&b).unwrap();
        assert_eq!(recs[0].gas_cogeneration, Some(55.5));
        assert_eq!(recs[0].battery_consumption, Some(7.5));
    }

    #[test]
    fn accepts_minute_precision_and_day_first_timestamps() {
        let b = batch(
            &["Data e Hora", "Hídrica"],
            &[
                &["2024-03-01 00:15", "1"],
                &["01-03-2024 00:30", "2"],
            ],
        );
        let recs = normalize_batch(&b).unwrap();
        assert_eq!(recs[0].ts, datetime!(2024-03-01 00:15:00));
        assert_eq!(recs[1].ts, datetime!(2024-03-01 00:30:00));
    }

    #[test]
    fn missing_timestamp_column_fails_the_batch() {
        let b = batch(&["Hídrica", "Consumo"], &[&["1", "2"]]);
        let err = normalize_batch(&b).unwrap_err();
        assert!(matches!(err, SyncError::Normalize(_)));
    }

    #[test]
    fn unparseable_timestamp_fails_the_batch() {
        let b = batch(
            &["Data e Hora", "Hídrica"],
            &[
                &["2024-03-01 00:00:00", "1"],
                &["not a time", "2"],
            ],
        );
        let err = normalize_batch(&b).unwrap_err();
        assert!(matches!(err, SyncError::Normalize(_)));
    }

    #[test]
    fn sorts_ascending_and_keeps_last_duplicate() {
        let b = batch(
            &["Data e Hora", "Hídrica"],
            &[
                &["2024-03-01 00:30:00", "3"],
                &["2024-03-01 00:00:00", "1"],
                &["2024-03-01 00:30:00", "9"],
            ],
        );
        let recs = normalize_batch(&b).unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].ts, datetime!(2024-03-01 00:00:00));
        assert_eq!(recs[1].ts, datetime!(2024-03-01 00:30:00));
        assert_eq!(recs[1].hydro, Some(9.0));
    }
}
