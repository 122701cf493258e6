/*!
# IT Risk Dashboard

A browser-based dashboard for IT risk registers, built in Rust.

## Overview

Analysts upload a risk register exported from Excel, narrow it down by risk
level, risk type and free-text search, read a short summary, look at the
distribution charts and export the filtered rows again as Excel, as a PDF
report or into a local SQLite store. The interface is available in Persian
(the default, right-to-left) and English.

## Architecture

### Frontend Layer
- **Technologies**: HTML, CSS, Handlebars templates rendered on the server
- **Key Components**:
  - Sidebar with upload, filter multi-selects and keyword search
  - Summary metrics, data table, chart and export tabs
  - Language selector and stored-table browser

### Backend Layer
- **Technologies**: Rust, axum, tokio
- **Core Components**:
  - Tabular Loader - Reads the first worksheet of an xlsx upload
  - Filter Engine - Category filters followed by a keyword search
  - Summary - Totals and share of high-level risks
  - Graphs - Pie and bar charts rendered to PNG with plotters
  - Exporters - XLSX and PDF reports
  - Credential Store - Fixed accounts checked against SHA-256 digests

### Data Persistence Layer
- SQLite file (`risk_data.db` by default), one table per export named
  `risk_YYYYMMDD_HHMMSS`

## Modules

- **table**: In-memory risk table and cell values
- **loader**: Excel parsing
- **filter**: Category filters and keyword search
- **summary**: Summary statistics
- **graph**: Chart data and PNG rendering
- **downloader**: XLSX and PDF export
- **saving**: SQLite persistence
- **login**: Credentials, sessions and the authentication middleware
- **i18n**: Display texts for each supported language
- **dashboard**: One render's worth of derived data
- **config**: Runtime settings
- **app**: Routing and handlers (feature `web`)

## REST API Endpoints

- `/login`, `/logout` - Session handling
- `/` - Dashboard, filtered by `level`, `type`, `q` and `applied` query parameters
- `/upload` - Multipart upload of an xlsx file
- `/charts/pie.png`, `/charts/bar.png` - Charts of the filtered rows
- `/export/xlsx`, `/export/pdf`, `/export/db` - Exports of the filtered rows
- `/admin/tables`, `/admin/tables/{name}` - Stored exports
*/

pub mod config;
pub mod dashboard;
pub mod downloader;
pub mod filter;
pub mod graph;
pub mod i18n;
pub mod loader;
pub mod login;
pub mod saving;
pub mod summary;
pub mod table;

#[cfg(feature = "web")]
pub mod app;

/// Re-export the types most callers need
pub use config::Config;
pub use filter::{FilterLabels, FilterSelection};
pub use i18n::{Locale, Texts};
pub use loader::LoadError;
pub use login::AuthError;
pub use saving::PersistError;
pub use summary::SummaryStats;
pub use table::{CellValue, RiskTable};
