//! Metadata propagation shared by the geometric transforms.
//!
//! A transform that moves pixels must move the geometry-bearing metadata
//! the same way. This helper applies one point map and one conic map to
//! every entry that carries coordinates, appends the operation to the
//! `ReferenceCoords` log and the transform name to `TransformationHistory`.
//!
//! A metadata update that produces garbage (non-finite conic) never
//! discards the pixel result: the previous value is kept and a warning is
//! logged.

use helio_core::{CoordOp, Ellipse, MetadataBag, MetadataValue, Point2D};
use tracing::warn;

/// Builds the updated bag for a transform.
///
/// `map_point` is the forward affine applied to pixel coordinates;
/// `map_ellipse` the matching conic transform. `op` is appended to the
/// geometric log, `history_entry` to the name log.
pub(crate) fn updated_bag(
    source: &MetadataBag,
    map_point: impl Fn(Point2D) -> Point2D + Copy,
    map_ellipse: impl FnOnce(&Ellipse) -> Ellipse,
    op: CoordOp,
    history_entry: &str,
) -> MetadataBag {
    let mut bag = source.clone();

    if let Some(ellipse) = source.ellipse() {
        let moved = map_ellipse(ellipse);
        if moved.coefficients().iter().all(|v| v.is_finite()) {
            bag.insert(MetadataValue::Ellipse(moved));
        } else {
            warn!(
                transform = history_entry,
                "ellipse update produced a non-finite conic, keeping previous value"
            );
        }
    }

    if let Some(areas) = source.redshifts() {
        let moved = areas.iter().map(|a| a.map_points(map_point)).collect();
        bag.insert(MetadataValue::Redshifts(moved));
    }

    if let Some(points) = source.active_regions() {
        let moved = points.iter().map(|&p| map_point(p)).collect();
        bag.insert(MetadataValue::ActiveRegions(moved));
    }

    if let Some(points) = source.ellerman_bombs() {
        let moved = points.iter().map(|&p| map_point(p)).collect();
        bag.insert(MetadataValue::EllermanBombs(moved));
    }

    bag.append_reference_coord(op);
    bag.append_transform(history_entry);
    bag
}
