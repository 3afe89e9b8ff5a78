//! Stats command - whole-image or disk-masked statistics

use anyhow::{bail, Result};

use crate::{commands::load_image, StatsArgs};
use helio_ops::stats::{background, compute_stats, masked_stats};

pub fn run(args: StatsArgs) -> Result<()> {
    let image = load_image(&args.input)?;
    let mono = image.to_mono();

    let stats = if args.masked {
        let Some(ellipse) = image.metadata().ellipse() else {
            bail!(
                "{}: no disk ellipse in metadata, cannot mask",
                args.input.display()
            );
        };
        masked_stats(mono.data(), mono.width(), ellipse)
    } else {
        compute_stats(mono.data())
    };

    println!("{}", args.input.display());
    println!("  samples: {}", stats.count);
    println!("  min:     {:.2}", stats.min);
    println!("  max:     {:.2}", stats.max);
    println!("  mean:    {:.2}", stats.mean);
    println!("  median:  {:.2}", stats.median);
    println!("  stddev:  {:.2}", stats.stddev);
    println!("  mad:     {:.2}", stats.mad);
    if !args.masked {
        println!("  background: {:.2}", background(&mono));
    }
    Ok(())
}
