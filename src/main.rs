//! cfbridge - inspect how the bridge sees a CF NetCDF file
//!
//! Prints, per data variable, the discovered time, latitude and longitude
//! coordinates, the dimension flipped for the configured grid start corner,
//! and the station ids stored in the file.

use tracing::{error, info};

use cfbridge::discovery::{
    create_time_info, dimension_index_to_flip, find_latitude_variable, find_longitude_variable,
    find_time_variable,
};
use cfbridge::time::mjd_to_datetime;
use cfbridge::{
    grid_exchange_items, init_tracing, log_error, read_station_ids, Config, DiscoveryCache,
    ExchangeItem, NetcdfStorage, Result, Storage,
};

fn main() -> Result<()> {
    let (config, netcdf_path) = Config::load().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        e
    })?;

    init_tracing(&config.log_level);
    info!("Starting cfbridge v{}", env!("CARGO_PKG_VERSION"));

    let storage = NetcdfStorage::open(&netcdf_path).map_err(|e| {
        log_error(&e, "opening NetCDF file");
        e
    })?;

    println!("File: {}", netcdf_path.display());
    println!("Grid start corner: {}", config.reader.grid_start_corner);

    let mut cache = DiscoveryCache::new();
    println!("\nVariables:");
    for variable in storage.variables() {
        if variable.is_coordinate_variable() {
            continue;
        }

        let name_of = |found: Option<cfbridge::Variable>| {
            found.map_or_else(|| "-".to_string(), |var| var.name)
        };
        let time = name_of(find_time_variable(&storage, &variable));
        let latitude = name_of(find_latitude_variable(&storage, &variable));
        let longitude = name_of(find_longitude_variable(&storage, &variable));
        let flip = dimension_index_to_flip(&storage, &variable, config.reader.grid_start_corner)?;

        println!(
            "  {} {:?}: time={} lat={} lon={} flip={}",
            variable.name,
            variable.shape(),
            time,
            latitude,
            longitude,
            flip.map_or_else(|| "-".to_string(), |dim| dim.to_string())
        );

        match create_time_info(&storage, &variable, &mut cache) {
            Ok(Some(time_info)) if !time_info.is_empty() => {
                let first = time_info.times()[0];
                let last = time_info.times()[time_info.len() - 1];
                println!(
                    "    {} times, {} .. {}",
                    time_info.len(),
                    format_mjd(first),
                    format_mjd(last)
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!(variable = %variable.name, error = %e, "Could not read time axis");
            }
        }
    }

    let items = grid_exchange_items(&storage, &config.reader, &mut cache)?;
    println!("\nGrid exchange items:");
    for item in &items {
        let cells = item
            .geometry_info()
            .map_or_else(|| "-".to_string(), |geometry| geometry.cell_count().to_string());
        println!(
            "  {} [{}] time dimension {} cells {}",
            item.id(),
            item.quantity_info().map(|q| q.unit.as_str()).unwrap_or_default(),
            item.time_dimension_index(),
            cells
        );
    }

    let station_ids = read_station_ids(&storage)?;
    if !station_ids.is_empty() {
        println!("\nStations:");
        for (index, id) in station_ids.iter().enumerate() {
            println!("  {}: {}", index, id);
        }
    }

    info!(
        items = items.len(),
        stations = station_ids.len(),
        "Inspection finished"
    );
    Ok(())
}

fn format_mjd(mjd: f64) -> String {
    mjd_to_datetime(mjd)
        .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| format!("MJD {}", mjd))
}
