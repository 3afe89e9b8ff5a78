//! Autostretch command - SIRIL-style MTF stretch

use anyhow::Result;

use crate::{
    commands::{load_image, save_image},
    AutostretchArgs,
};
use helio_ops::stretch::autostretch;

pub fn run(args: AutostretchArgs, verbose: u8) -> Result<()> {
    let input = load_image(&args.input)?;

    if verbose > 0 {
        println!(
            "Autostretch: target background {}, shadow clip {} MAD",
            args.target_background, args.shadows_clip
        );
    }

    let result = autostretch(&input, args.target_background, args.shadows_clip)?;
    save_image(&args.output, &result)?;
    if verbose > 0 {
        println!("Saved: {}", args.output.display());
    }
    Ok(())
}
