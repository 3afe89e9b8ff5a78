//! Info command - image and metadata summary

use anyhow::Result;

use crate::{commands::load_image, InfoArgs};
use helio_ops::stats::compute_stats;

pub fn run(args: InfoArgs) -> Result<()> {
    let image = load_image(&args.input)?;

    println!("{}", args.input.display());
    println!(
        "  {} {}x{}",
        image.kind_name(),
        image.width(),
        image.height()
    );

    let bag = image.metadata();
    if bag.is_empty() {
        println!("  no metadata");
    } else {
        println!("  metadata:");
        for (kind, _) in bag.iter() {
            println!("    {}", kind.fits_tag());
        }
        if let Some(ellipse) = bag.ellipse() {
            let c = ellipse.center();
            let (sa, sb) = ellipse.semi_axis();
            println!(
                "  disk: center ({:.1}, {:.1}), semi-axes ({:.1}, {:.1})",
                c.x, c.y, sa, sb
            );
        }
        if let Some(shift) = bag.pixel_shift() {
            println!("  pixel shift: {shift}");
        }
        if let Some(history) = bag.transformation_history() {
            println!("  transforms: {}", history.join(" -> "));
        }
    }

    if args.stats {
        let mono = image.to_mono();
        let s = compute_stats(mono.data());
        println!(
            "  stats: min {:.1}  max {:.1}  mean {:.1}  median {:.1}  stddev {:.1}",
            s.min, s.max, s.mean, s.median, s.stddev
        );
    }

    Ok(())
}
