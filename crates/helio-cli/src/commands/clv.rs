//! Clv command - center-to-limb variation curve

use anyhow::{bail, Result};

use crate::{commands::load_image, ClvArgs};
use helio_spectral::center_to_limb;

pub fn run(args: ClvArgs) -> Result<()> {
    let image = load_image(&args.input)?;
    let Some(ellipse) = image.metadata().ellipse().copied() else {
        bail!(
            "{}: no disk ellipse in metadata, cannot compute limb curve",
            args.input.display()
        );
    };

    let curve = center_to_limb(&image.to_mono(), &ellipse, args.bins);
    if curve.is_empty() {
        bail!("{}: disk does not cover any pixel", args.input.display());
    }

    println!("# mu  mean_intensity");
    for (mu, mean) in curve {
        println!("{mu:.4}  {mean:.2}");
    }
    Ok(())
}
