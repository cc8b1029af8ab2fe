//! # cfbridge
//!
//! Reads and writes model exchange items from and to CF-convention NetCDF
//! files.
//!
//! A simulation model or data assimilation engine hands the bridge exchange
//! items (a named quantity, optionally varying over time and space) and gets
//! back values without knowing how the file lays out its variables and
//! dimensions. Files written through the bridge stay convention compliant, so
//! other CF readers find their time and grid coordinates again.
//!
//! ## Architecture
//!
//! - **Discovery**: finds the time, latitude and longitude coordinates of a
//!   data variable and builds shared time/geometry axis objects
//! - **Codec and windows**: turns raw stored values into doubles and reads or
//!   writes single time, station or realization slices
//! - **Synthesis**: declares dimensions, coordinate variables and data
//!   variables for new items, reusing them across items sharing an axis
//! - **Storage**: the narrow file interface, with an in-memory backend and a
//!   NetCDF backend behind the `netcdf` feature

pub mod codec;
pub mod config;
pub mod convention;
pub mod discovery;
pub mod error;
pub mod exchange;
pub mod grid_item;
pub mod logging;
pub mod metadata_writer;
pub mod reader;
pub mod storage;
pub mod synthesis;
pub mod time;
pub mod window;
pub mod writer;

pub use config::{Config, ReaderConfig, WriterConfig};
pub use discovery::{DiscoveryCache, GridStartCorner};
pub use error::{BridgeError, Result};
pub use exchange::{
    ExchangeItem, GeometryInfo, QuantityInfo, Role, TimeInfo, ValueType, VectorExchangeItem,
};
pub use grid_item::GridTimeSeriesExchangeItem;
pub use logging::{
    init_tracing, log_error, log_operation_end, log_operation_start, log_timed_operation,
};
pub use reader::{grid_exchange_items, read_station_ids};
pub use storage::{AttributeValue, DataType, Dimension, MemoryStorage, Storage, Variable};
#[cfg(feature = "netcdf")]
pub use storage::NetcdfStorage;
pub use synthesis::WriteSession;
pub use window::Window;
pub use writer::ExchangeItemWriter;
