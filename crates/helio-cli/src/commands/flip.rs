//! Flip command - horizontal / vertical mirror

use anyhow::Result;

use crate::{
    commands::{load_image, save_image},
    FlipArgs, FlipDirection,
};
use helio_ops::flip::{hflip, vflip};

pub fn run(args: FlipArgs, verbose: u8) -> Result<()> {
    let input = load_image(&args.input)?;

    let result = match args.direction {
        FlipDirection::Horizontal => hflip(&input),
        FlipDirection::Vertical => vflip(&input),
    };

    save_image(&args.output, &result)?;
    if verbose > 0 {
        println!("Saved: {}", args.output.display());
    }
    Ok(())
}
