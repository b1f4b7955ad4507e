/*!
# Family Tree Dashboard

A browser-based family tree viewer for a one-sheet genealogy table, built in Rust.

## Overview

Each row of the sheet describes one person: an id, a name, a sex, the id of the
person's father and optional birth and death dates. Any other column is kept as a
free-form attribute and shown in the hover text. The dashboard lets a visitor pick
a person, walk that person's descendants, ancestors or both for a bounded number of
generations, and see the result as a sunburst chart where each wedge is a person and
each ring a generation.

## Architecture

### Data Layer
- **Loader** - Reads CSV files, XLSX workbooks or a published CSV URL into a raw
  table, maps header aliases onto the canonical columns and drops rows without an id
- **Record Store** - Keeps records in sheet order with an id index and a
  father → children index
- **Cache** - Holds the cleaned store per (source, version) so a reload only
  happens when the version changes

### Core Layer
- **Genealogy** - Bounded breadth-first walks down (children) and up (fathers),
  with a seen-set cycle guard, and the signed-generation merge of both walks
- **Flatten** - Turns a generation map into parallel id/label/parent/sex/hover
  sequences where every parent precedes its children
- **Sunburst** - Leaf-weighted angular layout and the plotters renderer for SVG
  and raster output
- **Statistics** - Gender ratio, age buckets, births per decade and lineage depth

### Web Layer
- **Technologies**: Rust, axum, handlebars
- Per-session zoom kept in a cookie-keyed session store
- PNG, PDF and SVG chart downloads plus CSV/XLSX downloads of the flattened tree

## Modules

- **person**: Person records, ids, sex and date parsing
- **records**: In-memory record store and selection labels
- **loader**: CSV/XLSX/remote loading and cleaning
- **cache**: Versioned store cache
- **genealogy**: Descendant/ancestor extraction and merge
- **flatten**: Hierarchical sequences for the chart
- **sunburst**: Layout and rendering
- **session**: Zoom state and derived canvas/font sizes
- **stats**: Statistics page figures
- **graph**: Bar charts for the statistics page
- **pdf**: Single-page PDF wrapping of a rendered raster
- **downloader**: Export functionality (PNG, PDF, SVG, CSV, XLSX)
- **config**: Environment and command line settings
- **app**: Routing and handlers

## REST API Endpoints

- `/tree` - Dashboard page with the chart and its controls
- `/stats` - Statistics page
- `/api/people` - Selection list, `"[id] name"` per person
- `/api/tree` - Generation map and flattened tree as JSON
- `/api/export/{format}` - Chart or table download
- `/api/stats`, `/api/stats/{chart}` - Statistics as JSON or as a PNG chart
- `/api/zoom/in`, `/api/zoom/out` - Step the session zoom
- `/api/reload` - Drop the cached store and load the source again
*/

pub mod cache;
pub mod config;
pub mod downloader;
pub mod flatten;
pub mod genealogy;
pub mod loader;
pub mod pdf;
pub mod person;
pub mod records;
pub mod session;
pub mod stats;
pub mod sunburst;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod graph;

pub use cache::{CacheKey, RecordCache};
pub use config::Config;
pub use downloader::{ExportFile, ExportFormat};
pub use flatten::{FlatNode, FlattenedTree, flatten};
pub use genealogy::{Direction, GenerationMap, ascend, descend, extract, merge};
pub use loader::{LoadError, RecordSource};
pub use person::{PersonId, PersonRecord, Sex};
pub use records::RecordStore;
pub use session::{RenderContext, SessionStore};
pub use stats::FamilyStatistics;
pub use sunburst::{SexColors, SunburstLayout};
