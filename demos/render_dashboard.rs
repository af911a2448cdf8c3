//! demos/render_dashboard.rs
//!
//! Loads a temperature and dew point grid pair, computes every heat-stress
//! indicator for the most recent timestamp and writes the rendered maps
//! (plus their colorbars) as PNG files.
//!
//! To run this example:
//! cargo run --example render_dashboard --features demos -- \
//!     data/t_2m.parquet data/t_2m.json data/td_2m.parquet data/td_2m.json

use std::error::Error;
use std::path::PathBuf;

use heatstress::{
    grayscale, surface_relief, GridSource, HeatIndexKind, HeatStress, MapLayer,
    SURFACE_Z_EXAGGERATION,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1).map(PathBuf::from);
    let (t_data, t_meta, td_data, td_meta) = match (args.next(), args.next(), args.next(), args.next()) {
        (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
        _ => {
            eprintln!("usage: render_dashboard <t2m.parquet> <t2m.json> <td2m.parquet> <td2m.json>");
            std::process::exit(2);
        }
    };

    let client = HeatStress::new().await?;

    let temperature = client
        .grid_series()
        .source(&GridSource::Parquet {
            data: t_data,
            metadata: t_meta,
        })
        .call()
        .await?;
    let dew_point = client
        .grid_series()
        .source(&GridSource::Parquet {
            data: td_data,
            metadata: td_meta,
        })
        .call()
        .await?;

    let at = *temperature
        .times()
        .last()
        .ok_or("temperature series is empty")?;
    println!("Rendering snapshot at {at}");

    let snapshot = client
        .snapshot()
        .temperature(&temperature)
        .dew_point(&dew_point)
        .at(at)
        .call()?;

    // The statistical summary, one row per threshold index.
    for row in snapshot.summary() {
        println!(
            "{:<25} mean {:6.1}  median {:6.1}  p95 {:6.1}  p99 {:6.1}  max {:6.1}  ({})",
            row.kind.to_string(),
            row.mean,
            row.median,
            row.p95,
            row.p99,
            row.max,
            row.kind.threshold_caption(),
        );
    }

    let layers = [
        MapLayer::Temperature,
        MapLayer::RelativeHumidity,
        MapLayer::Index(HeatIndexKind::Humidex),
        MapLayer::Index(HeatIndexKind::Wbgt),
        MapLayer::Index(HeatIndexKind::LethalHeatStress),
        MapLayer::Index(HeatIndexKind::Utci),
    ];

    for layer in layers {
        let render = client
            .render_map()
            .field(snapshot.field(layer))
            .metadata(temperature.metadata())
            .layer(layer)
            .call()
            .await?;

        let stem = layer.label().to_lowercase().replace(' ', "_");
        render.image.save(format!("{stem}.png"))?;
        render.colorbar.save(format!("{stem}_colorbar.png"))?;
        println!(
            "{}: {:.1}..{:.1} {} -> {stem}.png",
            layer.label(),
            render.vmin,
            render.vmax,
            layer.unit(),
        );
    }

    // The 3D surface view: a grayscale underlay plus the inverted relief
    // heights (hottest cells sit lowest).
    let humidex_layer = MapLayer::Index(HeatIndexKind::Humidex);
    let render = client
        .render_map()
        .field(snapshot.field(humidex_layer))
        .metadata(temperature.metadata())
        .layer(humidex_layer)
        .call()
        .await?;
    grayscale(&render.image).save("humidex_surface_underlay.png")?;

    let relief = surface_relief(snapshot.field(humidex_layer), SURFACE_Z_EXAGGERATION);
    let peak = relief.z.iter().copied().filter(|z| !z.is_nan()).fold(0.0, f64::max);
    println!(
        "Surface relief: {}x{} cells, z in 0..{peak:.3} (exaggeration {})",
        relief.ny, relief.nx, relief.z_exaggeration,
    );

    Ok(())
}
