//! Mask command - fill the fitted disk ellipse

use anyhow::{bail, Result};

use crate::{
    commands::{load_image, save_image},
    MaskArgs,
};
use helio_ops::fill::fill_ellipse;

pub fn run(args: MaskArgs, verbose: u8) -> Result<()> {
    let input = load_image(&args.input)?;

    let Some(ellipse) = input.metadata().ellipse().copied() else {
        bail!(
            "{}: no disk ellipse in metadata, cannot mask",
            args.input.display()
        );
    };

    let result = fill_ellipse(&input, &ellipse, args.fill, args.outside);
    save_image(&args.output, &result)?;
    if verbose > 0 {
        println!("Saved: {}", args.output.display());
    }
    Ok(())
}
