//! Typed metadata carried alongside image pixels.
//!
//! The metadata bag maps a closed set of kind tags to typed payloads.
//! Transforms clone the bag, rewrite the geometry-bearing entries in
//! lock-step with the pixels, and append to the two log-valued entries
//! ([`ReferenceCoords`](MetadataValue::ReferenceCoords) and
//! [`TransformationHistory`](MetadataValue::TransformationHistory)), which
//! are never dropped.
//!
//! # Update contracts
//!
//! | Kind | Under a spatial transform |
//! |---|---|
//! | `PixelShift` | unchanged |
//! | `Ellipse` | conic rotated / translated / mirrored with the pixels |
//! | `Redshifts`, `ActiveRegions`, `EllermanBombs` | every point transformed |
//! | `ReferenceCoords`, `TransformationHistory` | appended, never dropped |
//! | `SourceInfo` | immutable |
//! | `MetadataTable` | unchanged |
//! | `DistorsionMap`, `ProcessParams`, `SolarParameters` | opaque, round-tripped |

use std::collections::BTreeMap;

use crate::ellipse::Ellipse;
use crate::time::UtcDateTime;
use crate::units::Point2D;

/// The closed set of recognized metadata kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataKind {
    /// Signed detector-row offset from the nominal reference wavelength.
    PixelShift,
    /// Fitted solar-disk conic.
    Ellipse,
    /// Detected redshift areas.
    Redshifts,
    /// Detected active-region points.
    ActiveRegions,
    /// Detected Ellerman-bomb points.
    EllermanBombs,
    /// Append-only log of geometric operations.
    ReferenceCoords,
    /// Append-only log of human-readable transform names.
    TransformationHistory,
    /// Provenance of the capture.
    SourceInfo,
    /// Free-form key/value table.
    MetadataTable,
    /// Opaque distortion-map payload.
    DistorsionMap,
    /// Opaque processing-parameters payload.
    ProcessParams,
    /// Opaque solar-parameters payload.
    SolarParameters,
}

impl MetadataKind {
    /// All kinds, in the deterministic order used for FITS serialization.
    pub const ALL: [MetadataKind; 12] = [
        MetadataKind::PixelShift,
        MetadataKind::Ellipse,
        MetadataKind::Redshifts,
        MetadataKind::ActiveRegions,
        MetadataKind::EllermanBombs,
        MetadataKind::ReferenceCoords,
        MetadataKind::TransformationHistory,
        MetadataKind::SourceInfo,
        MetadataKind::MetadataTable,
        MetadataKind::DistorsionMap,
        MetadataKind::ProcessParams,
        MetadataKind::SolarParameters,
    ];

    /// Returns the `JSOLEX` header-card tag naming this kind in FITS files.
    pub fn fits_tag(self) -> &'static str {
        match self {
            MetadataKind::PixelShift => "PixelShift",
            MetadataKind::Ellipse => "Ellipse",
            MetadataKind::Redshifts => "Redshifts",
            MetadataKind::ActiveRegions => "ActiveReg",
            MetadataKind::EllermanBombs => "Ellerman",
            MetadataKind::ReferenceCoords => "RefCoords",
            MetadataKind::TransformationHistory => "Transforms",
            MetadataKind::SourceInfo => "SourceInfo",
            MetadataKind::MetadataTable => "TMetadata",
            MetadataKind::DistorsionMap => "DistorsionMap",
            MetadataKind::ProcessParams => "PrParams",
            MetadataKind::SolarParameters => "SoParams",
        }
    }

    /// Resolves a `JSOLEX` tag back to a kind.
    pub fn from_fits_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.fits_tag() == tag)
    }
}

/// One detected redshift area.
#[derive(Debug, Clone, PartialEq)]
pub struct RedshiftArea {
    /// Optional user-assigned identifier.
    pub id: Option<i32>,
    /// Pixel shift at which the area was detected.
    pub pixel_shift: f64,
    /// Shift relative to the reference profile.
    pub rel_shift: f64,
    /// Line-of-sight velocity in km/s.
    pub kms_per_s: f64,
    /// Bounding-box corner.
    pub x1: f64,
    /// Bounding-box corner.
    pub y1: f64,
    /// Bounding-box corner.
    pub x2: f64,
    /// Bounding-box corner.
    pub y2: f64,
    /// Location of the shift maximum.
    pub max_x: f64,
    /// Location of the shift maximum.
    pub max_y: f64,
}

impl RedshiftArea {
    /// Returns a copy with every coordinate pair mapped through `f`.
    pub fn map_points(&self, f: impl Fn(Point2D) -> Point2D) -> Self {
        let p1 = f(Point2D::new(self.x1, self.y1));
        let p2 = f(Point2D::new(self.x2, self.y2));
        let pm = f(Point2D::new(self.max_x, self.max_y));
        Self {
            x1: p1.x,
            y1: p1.y,
            x2: p2.x,
            y2: p2.y,
            max_x: pm.x,
            max_y: pm.y,
            ..self.clone()
        }
    }
}

/// One entry in the append-only geometric-operation log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordOp {
    /// Rotation by an angle in radians.
    Rotate {
        /// Rotation angle, radians.
        angle: f64,
    },
    /// Horizontal mirror across a width-`width` canvas.
    HFlip {
        /// Canvas width at the time of the flip.
        width: f64,
    },
    /// Vertical mirror across a height-`height` canvas.
    VFlip {
        /// Canvas height at the time of the flip.
        height: f64,
    },
}

/// Provenance of the capture that produced an image. Immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    /// Name of the source SER capture file.
    pub ser_file_name: String,
    /// Directory the capture came from.
    pub parent_dir: String,
    /// Capture timestamp.
    pub date_time: UtcDateTime,
}

/// A metadata payload, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    /// See [`MetadataKind::PixelShift`].
    PixelShift(f64),
    /// See [`MetadataKind::Ellipse`].
    Ellipse(Ellipse),
    /// See [`MetadataKind::Redshifts`].
    Redshifts(Vec<RedshiftArea>),
    /// See [`MetadataKind::ActiveRegions`].
    ActiveRegions(Vec<Point2D>),
    /// See [`MetadataKind::EllermanBombs`].
    EllermanBombs(Vec<Point2D>),
    /// See [`MetadataKind::ReferenceCoords`].
    ReferenceCoords(Vec<CoordOp>),
    /// See [`MetadataKind::TransformationHistory`].
    TransformationHistory(Vec<String>),
    /// See [`MetadataKind::SourceInfo`].
    SourceInfo(SourceInfo),
    /// See [`MetadataKind::MetadataTable`].
    MetadataTable(BTreeMap<String, String>),
    /// See [`MetadataKind::DistorsionMap`].
    DistorsionMap(Vec<u8>),
    /// See [`MetadataKind::ProcessParams`].
    ProcessParams(Vec<u8>),
    /// See [`MetadataKind::SolarParameters`].
    SolarParameters(Vec<u8>),
}

impl MetadataValue {
    /// Returns the kind tag of this payload.
    pub fn kind(&self) -> MetadataKind {
        match self {
            MetadataValue::PixelShift(_) => MetadataKind::PixelShift,
            MetadataValue::Ellipse(_) => MetadataKind::Ellipse,
            MetadataValue::Redshifts(_) => MetadataKind::Redshifts,
            MetadataValue::ActiveRegions(_) => MetadataKind::ActiveRegions,
            MetadataValue::EllermanBombs(_) => MetadataKind::EllermanBombs,
            MetadataValue::ReferenceCoords(_) => MetadataKind::ReferenceCoords,
            MetadataValue::TransformationHistory(_) => MetadataKind::TransformationHistory,
            MetadataValue::SourceInfo(_) => MetadataKind::SourceInfo,
            MetadataValue::MetadataTable(_) => MetadataKind::MetadataTable,
            MetadataValue::DistorsionMap(_) => MetadataKind::DistorsionMap,
            MetadataValue::ProcessParams(_) => MetadataKind::ProcessParams,
            MetadataValue::SolarParameters(_) => MetadataKind::SolarParameters,
        }
    }
}

/// The metadata bag: a small map from kind to payload.
///
/// Cloning the bag clones every payload; transforms operate on the clone
/// and never touch the source bag (copy-on-transform).
///
/// # Example
///
/// ```rust
/// use helio_core::{MetadataBag, MetadataValue};
///
/// let mut bag = MetadataBag::new();
/// bag.insert(MetadataValue::PixelShift(1.5));
/// assert_eq!(bag.pixel_shift(), Some(1.5));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataBag {
    entries: BTreeMap<MetadataKind, MetadataValue>,
}

impl MetadataBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a payload, keyed by its own kind.
    ///
    /// Returns the previous payload of that kind, if any.
    pub fn insert(&mut self, value: MetadataValue) -> Option<MetadataValue> {
        self.entries.insert(value.kind(), value)
    }

    /// Returns the payload for `kind`.
    pub fn get(&self, kind: MetadataKind) -> Option<&MetadataValue> {
        self.entries.get(&kind)
    }

    /// Removes and returns the payload for `kind`.
    pub fn remove(&mut self, kind: MetadataKind) -> Option<MetadataValue> {
        self.entries.remove(&kind)
    }

    /// Returns `true` if a payload of `kind` is present.
    pub fn contains(&self, kind: MetadataKind) -> bool {
        self.entries.contains_key(&kind)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the bag holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in deterministic kind order.
    pub fn iter(&self) -> impl Iterator<Item = (MetadataKind, &MetadataValue)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Returns the pixel shift, if present.
    pub fn pixel_shift(&self) -> Option<f64> {
        match self.get(MetadataKind::PixelShift) {
            Some(MetadataValue::PixelShift(v)) => Some(*v),
            _ => None,
        }
    }

    /// Returns the fitted disk ellipse, if present.
    pub fn ellipse(&self) -> Option<&Ellipse> {
        match self.get(MetadataKind::Ellipse) {
            Some(MetadataValue::Ellipse(e)) => Some(e),
            _ => None,
        }
    }

    /// Returns the redshift areas, if present.
    pub fn redshifts(&self) -> Option<&[RedshiftArea]> {
        match self.get(MetadataKind::Redshifts) {
            Some(MetadataValue::Redshifts(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the active-region points, if present.
    pub fn active_regions(&self) -> Option<&[Point2D]> {
        match self.get(MetadataKind::ActiveRegions) {
            Some(MetadataValue::ActiveRegions(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the Ellerman-bomb points, if present.
    pub fn ellerman_bombs(&self) -> Option<&[Point2D]> {
        match self.get(MetadataKind::EllermanBombs) {
            Some(MetadataValue::EllermanBombs(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the geometric-operation log, if present.
    pub fn reference_coords(&self) -> Option<&[CoordOp]> {
        match self.get(MetadataKind::ReferenceCoords) {
            Some(MetadataValue::ReferenceCoords(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the transform-name log, if present.
    pub fn transformation_history(&self) -> Option<&[String]> {
        match self.get(MetadataKind::TransformationHistory) {
            Some(MetadataValue::TransformationHistory(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the capture provenance, if present.
    pub fn source_info(&self) -> Option<&SourceInfo> {
        match self.get(MetadataKind::SourceInfo) {
            Some(MetadataValue::SourceInfo(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the free-form table, if present.
    pub fn table(&self) -> Option<&BTreeMap<String, String>> {
        match self.get(MetadataKind::MetadataTable) {
            Some(MetadataValue::MetadataTable(v)) => Some(v),
            _ => None,
        }
    }

    /// Appends an operation to the geometric log, creating it if absent.
    ///
    /// The append replaces the bag entry with a fresh vector, so a bag that
    /// shares history with a clone never observes the clone's appends.
    pub fn append_reference_coord(&mut self, op: CoordOp) {
        let mut ops = self.reference_coords().map(<[_]>::to_vec).unwrap_or_default();
        ops.push(op);
        self.insert(MetadataValue::ReferenceCoords(ops));
    }

    /// Appends a human-readable transform name to the history log.
    pub fn append_transform(&mut self, name: impl Into<String>) {
        let mut names = self
            .transformation_history()
            .map(<[_]>::to_vec)
            .unwrap_or_default();
        names.push(name.into());
        self.insert(MetadataValue::TransformationHistory(names));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keyed_by_kind() {
        let mut bag = MetadataBag::new();
        assert!(bag.insert(MetadataValue::PixelShift(0.5)).is_none());
        let old = bag.insert(MetadataValue::PixelShift(1.5));
        assert_eq!(old, Some(MetadataValue::PixelShift(0.5)));
        assert_eq!(bag.len(), 1);
        assert_eq!(bag.pixel_shift(), Some(1.5));
    }

    #[test]
    fn test_append_logs() {
        let mut bag = MetadataBag::new();
        bag.append_transform("Horizontal flip");
        bag.append_reference_coord(CoordOp::HFlip { width: 1024.0 });

        let cloned = bag.clone();
        bag.append_transform("Vertical flip");

        // The clone must not observe appends made after cloning.
        assert_eq!(cloned.transformation_history().unwrap().len(), 1);
        assert_eq!(bag.transformation_history().unwrap().len(), 2);
        assert_eq!(
            bag.reference_coords().unwrap(),
            &[CoordOp::HFlip { width: 1024.0 }]
        );
    }

    #[test]
    fn test_fits_tags_roundtrip() {
        for kind in MetadataKind::ALL {
            assert_eq!(MetadataKind::from_fits_tag(kind.fits_tag()), Some(kind));
        }
        assert_eq!(MetadataKind::from_fits_tag("NoSuchTag"), None);
    }

    #[test]
    fn test_redshift_map_points() {
        let area = RedshiftArea {
            id: Some(3),
            pixel_shift: 1.0,
            rel_shift: 0.5,
            kms_per_s: 12.0,
            x1: 1.0,
            y1: 2.0,
            x2: 3.0,
            y2: 4.0,
            max_x: 2.0,
            max_y: 3.0,
        };
        let moved = area.map_points(|p| Point2D::new(p.x + 10.0, p.y));
        assert_eq!(moved.x1, 11.0);
        assert_eq!(moved.x2, 13.0);
        assert_eq!(moved.max_x, 12.0);
        assert_eq!(moved.y1, 2.0);
        assert_eq!(moved.id, Some(3));
        assert_eq!(moved.kms_per_s, 12.0);
    }

    #[test]
    fn test_typed_accessors() {
        let mut bag = MetadataBag::new();
        bag.insert(MetadataValue::ActiveRegions(vec![Point2D::new(1.0, 2.0)]));
        bag.insert(MetadataValue::MetadataTable(BTreeMap::from([(
            "OBSERVER".to_string(),
            "C. Flammarion".to_string(),
        )])));
        assert_eq!(bag.active_regions().unwrap().len(), 1);
        assert_eq!(
            bag.table().unwrap().get("OBSERVER").map(String::as_str),
            Some("C. Flammarion")
        );
        assert!(bag.ellipse().is_none());
    }
}
