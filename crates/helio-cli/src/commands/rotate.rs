//! Rotate command - arbitrary angle rotation

use anyhow::Result;

use crate::{
    commands::{load_image, save_image},
    RotateArgs,
};
use helio_ops::rotate::{rotate, RotateOptions};

pub fn run(args: RotateArgs, verbose: u8) -> Result<()> {
    if verbose > 0 {
        println!("Loading: {}", args.input.display());
    }
    let input = load_image(&args.input)?;

    if verbose > 0 {
        println!("Size: {}x{}", input.width(), input.height());
        println!("Rotation: {}°", args.angle);
    }

    let result = rotate(
        &input,
        args.angle.to_radians(),
        RotateOptions {
            resize: args.resize,
            blackpoint: args.blackpoint,
        },
    )?;

    if verbose > 0 {
        println!("New size: {}x{}", result.width(), result.height());
    }
    save_image(&args.output, &result)?;
    if verbose > 0 {
        println!("Saved: {}", args.output.display());
    }
    Ok(())
}
