//! Backend adapters.
//!
//! One [`BackendAdapter`] implementation per backend shape:
//! - Paginated JSON stock API (`PaginatedJsonAdapter`)
//! - JSONP stock API (`StockQueryAdapter`)
//! - Calendar widget month documents (`CalendarWidgetAdapter`)
//! - Legacy server-rendered pages (`LegacyHtmlAdapter`)

mod adapter;
mod jsonp;
pub mod legacy;
mod paginated;
pub mod stock;
pub mod widget;

pub use adapter::{BackendAdapter, BackendOutcome, build_adapter, fetch_and_parse};
pub use jsonp::{StockQueryAdapter, clean_payload, extract_envelope, parse_jsonp};
pub use legacy::LegacyHtmlAdapter;
pub use paginated::PaginatedJsonAdapter;
pub use widget::CalendarWidgetAdapter;
