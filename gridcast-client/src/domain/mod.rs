pub mod grid_record;

pub use grid_record::{column_list, GridRecord, FIELD_COUNT, FIELD_NAMES, TS_FORMAT};
