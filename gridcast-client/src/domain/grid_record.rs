use sqlx::{sqlite::SqliteRow, FromRow, Row};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::PrimitiveDateTime;

/// Canonical timestamp layout used as the store's TEXT primary key.
///
/// Lexicographic order on this layout matches chronological order, so
/// `MAX(date_time)` and `ORDER BY date_time` stay correct without any
/// driver-level datetime mapping.
pub const TS_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Canonical per-category field names, in stored column order.
pub const FIELD_NAMES: [&str; 15] = [
    "hydro",
    "wind",
    "solar",
    "biomass",
    "waves",
    "gas_combined",
    "gas_cogeneration",
    "coal",
    "other_thermal",
    "import",
    "export",
    "pumped_storage",
    "battery_injection",
    "battery_consumption",
    "consumption",
];

pub const FIELD_COUNT: usize = FIELD_NAMES.len();

/// One grid observation at a single 15-minute timestamp.
///
/// All category fields are nullable: the source omits values it has not
/// published (or cannot parse), and null means "not reported", not zero.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRecord {
    pub ts: PrimitiveDateTime,
    pub hydro: Option<f64>,
    pub wind: Option<f64>,
    pub solar: Option<f64>,
    pub biomass: Option<f64>,
    pub waves: Option<f64>,
    pub gas_combined: Option<f64>,
    pub gas_cogeneration: Option<f64>,
    pub coal: Option<f64>,
    pub other_thermal: Option<f64>,
    pub import: Option<f64>,
    pub export: Option<f64>,
    pub pumped_storage: Option<f64>,
    pub battery_injection: Option<f64>,
    pub battery_consumption: Option<f64>,
    pub consumption: Option<f64>,
}

impl GridRecord {
    pub fn from_values(ts: PrimitiveDateTime, v: [Option<f64>; FIELD_COUNT]) -> Self {
        Self {
            ts,
            hydro: v[0],
            wind: v[1],
            solar: v[2],
            biomass: v[3],
            waves: v[4],
            gas_combined: v[5],
            gas_cogeneration: v[6],
            coal: v[7],
            other_thermal: v[8],
            import: v[9],
            export: v[10],
            pumped_storage: v[11],
            battery_injection: v[12],
            battery_consumption: v[13],
            consumption: v[14],
        }
    }

    /// Field values in `FIELD_NAMES` order.
    pub fn values(&self) -> [Option<f64>; FIELD_COUNT] {
        [
            self.hydro,
            self.wind,
            self.solar,
            self.biomass,
            self.waves,
            self.gas_combined,
            self.gas_cogeneration,
            self.coal,
            self.other_thermal,
            self.import,
            self.export,
            self.pumped_storage,
            self.battery_injection,
            self.battery_consumption,
            self.consumption,
        ]
    }
}

/// Comma-separated canonical column list for SELECT/INSERT statements.
pub fn column_list() -> String {
    FIELD_NAMES.join(", ")
}

impl<'r> FromRow<'r, SqliteRow> for GridRecord {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let ts_text: String = row.try_get("date_time")?;
        let ts = PrimitiveDateTime::parse(&ts_text, TS_FORMAT).map_err(|e| {
            sqlx::Error::ColumnDecode {
                index: "date_time".into(),
                source: Box::new(e),
            }
        })?;

        let mut values = [None; FIELD_COUNT];
        for (slot, name) in values.iter_mut().zip(FIELD_NAMES) {
            *slot = row.try_get(name)?;
        }

        Ok(GridRecord::from_values(ts, values))
    }
}
