//! Ephemeris command - solar orientation angles for a date

use anyhow::{Context, Result};

use crate::EphemerisArgs;
use helio_core::UtcDateTime;
use helio_math::solar_params;

pub fn run(args: EphemerisArgs) -> Result<()> {
    let date = match &args.date {
        Some(text) => UtcDateTime::parse_iso8601(text)
            .with_context(|| format!("not an ISO-8601 instant: {text}"))?,
        None => UtcDateTime::now(),
    };

    let eph = solar_params(date.julian_day());
    println!("{}  (JD {:.5})", date.iso8601(), date.julian_day());
    println!("  P:  {:+8.3}°", eph.p.degrees());
    println!("  B0: {:+8.3}°", eph.b0.degrees());
    println!("  L0: {:8.3}°", eph.l0.degrees());
    println!("  Carrington rotation: {}", eph.carrington_rotation);
    Ok(())
}
