//! demos/trend_charts.rs
//!
//! Loads the historical statistics archive and plots, for each index, the
//! yearly count of days above its danger threshold plus the daily-maximum
//! curve for one year, using the `plotlars` crate.
//!
//! To run this example:
//! cargo run --example trend_charts --features demos -- data/stats_1981_2023.csv 2023

use std::error::Error;
use std::path::PathBuf;

use heatstress::{ArchiveSource, HeatIndexKind, HeatStress, STAT_LABEL};
use plotlars::{BarPlot, Plot, Rgb, Text, TimeSeriesPlot};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let csv = PathBuf::from(args.next().unwrap_or_else(|| "data/stats_1981_2023.csv".into()));
    let year: i32 = args.next().unwrap_or_else(|| "2023".into()).parse()?;

    let client = HeatStress::new().await?;
    let archive = client
        .trend_archive()
        .source(&ArchiveSource::Csv(csv))
        .call()
        .await?;

    for kind in HeatIndexKind::ALL {
        let (r, g, b) = kind.chart_color();

        let exceedances = archive.annual_exceedances(kind)?;
        let bars = exceedances.to_dataframe()?;
        BarPlot::builder()
            .data(&bars)
            .labels("Year")
            .values("Exceedances")
            .colors(vec![Rgb(r, g, b)])
            .plot_title(Text::from(format!("{kind}: days above {:.0} °C per year", kind.threshold_c())))
            .x_title("Year")
            .y_title("Days")
            .build()
            .plot();

        let daily = archive.daily_max_series(kind, year)?;
        let curve = daily.to_dataframe()?;
        TimeSeriesPlot::builder()
            .data(&curve)
            .x("Date")
            .y("DailyMax")
            .colors(vec![Rgb(r, g, b)])
            .plot_title(Text::from(format!("{kind} {year}: daily max of the {STAT_LABEL}")))
            .x_title("Date")
            .y_title("°C")
            .build()
            .plot();
    }

    println!("Charts shown in browser.");
    Ok(())
}
