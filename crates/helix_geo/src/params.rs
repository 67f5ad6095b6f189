//! Immutable geometry parameters.
//!
//! All persistent data lives in flat arrays addressed by integer ids:
//! surfaces by `SurfaceId`, volumes by `VolumeId`, universes by
//! `UniverseId`, and grid reals by offset. Trackers borrow these tables and
//! never mutate them, so a single `GeoParams` can be shared by any number of
//! concurrently transported tracks.

use crate::error::GeoError;
use crate::input::{
    DaughterInput, GeoInput, GeoOptions, RectArrayInput, SimpleUnitInput, UniverseInput,
};
use crate::logic::{self, LogicError, LogicToken};
use crate::math::Real3;
use crate::surfaces::Surface;
use crate::tracker::{RectArrayTracker, SimpleUnitTracker, Tracker};
use crate::types::{
    Axis, DaughterId, ItemRange, LocalSurfaceId, LocalVolumeId, SurfaceId, UniverseId, VolumeId,
};
use crate::unit_indexer::UnitIndexer;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniverseType {
    Simple,
    RectArray,
}

/// CSG cell within a simple unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeRecord {
    /// Local surfaces bounding the cell, indexed by `FaceId`.
    pub faces: ItemRange,
    pub logic: ItemRange,
    pub is_conjunction: bool,
    pub max_intersections: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleUnitRecord {
    /// Global surface ids owned by this unit.
    pub surfaces: ItemRange,
    /// Entries in the volume record table, in local volume order.
    pub volumes: ItemRange,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectArrayRecord {
    /// Number of cells along each axis.
    pub dims: [usize; 3],
    /// Grid plane positions in the real table.
    pub grids: [ItemRange; 3],
    /// Local surface id of the first plane along each axis, plus the total.
    pub surface_offsets: [usize; 4],
}

/// Universe embedded in a volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Daughter {
    pub universe: UniverseId,
    pub translation: Real3,
}

/// Sizes needed to allocate per-track state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoScalars {
    /// Number of nesting levels, at least one.
    pub max_level: usize,
    /// Largest face count of any simple-unit volume.
    pub max_faces: usize,
    /// Largest number of candidate crossings for any simple-unit volume.
    pub max_intersections: usize,
}

#[derive(Debug, Clone)]
pub struct GeoParams {
    options: GeoOptions,
    universe_types: Vec<UniverseType>,
    universe_indices: Vec<usize>,
    universe_labels: Vec<String>,
    simple_units: Vec<SimpleUnitRecord>,
    rect_arrays: Vec<RectArrayRecord>,
    surfaces: Vec<Surface>,
    surface_labels: Vec<String>,
    volume_labels: Vec<String>,
    volume_daughters: Vec<Option<DaughterId>>,
    volume_records: Vec<VolumeRecord>,
    faces: Vec<LocalSurfaceId>,
    logic: Vec<LogicToken>,
    connectivity: Vec<LocalVolumeId>,
    connectivity_ranges: Vec<ItemRange>,
    reals: Vec<f64>,
    daughters: Vec<Daughter>,
    unit_indexer: UnitIndexer,
    scalars: GeoScalars,
}

impl GeoParams {
    pub fn from_json(text: &str) -> Result<Self, GeoError> {
        let input: GeoInput = serde_json::from_str(text)?;
        Self::new(&input)
    }

    pub fn new(input: &GeoInput) -> Result<Self, GeoError> {
        let Some(root) = input.universes.first() else {
            return Err(GeoError::NoUniverses);
        };
        let root_is_empty = match root {
            UniverseInput::Simple(unit) => unit.volumes.is_empty(),
            UniverseInput::RectArray(_) => false,
        };
        if root_is_empty {
            return Err(GeoError::EmptyRoot {
                label: root.label().to_string(),
            });
        }

        let mut builder = Builder::new(input.options, input.universes.len());
        for (index, universe) in input.universes.iter().enumerate() {
            match universe {
                UniverseInput::Simple(unit) => builder.add_simple_unit(index, unit)?,
                UniverseInput::RectArray(array) => builder.add_rect_array(index, array)?,
            }
        }
        builder.finish()
    }

    pub fn options(&self) -> &GeoOptions {
        &self.options
    }

    pub fn scalars(&self) -> &GeoScalars {
        &self.scalars
    }

    pub fn unit_indexer(&self) -> &UnitIndexer {
        &self.unit_indexer
    }

    pub fn num_universes(&self) -> usize {
        self.universe_types.len()
    }

    pub fn num_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    pub fn num_volumes(&self) -> usize {
        self.volume_labels.len()
    }

    pub fn universe_type(&self, universe: UniverseId) -> UniverseType {
        self.universe_types[universe.get()]
    }

    pub fn universe_label(&self, universe: UniverseId) -> &str {
        &self.universe_labels[universe.get()]
    }

    pub fn surface(&self, surface: SurfaceId) -> &Surface {
        &self.surfaces[surface.get()]
    }

    pub fn surface_label(&self, surface: SurfaceId) -> &str {
        &self.surface_labels[surface.get()]
    }

    pub fn volume_label(&self, volume: VolumeId) -> &str {
        &self.volume_labels[volume.get()]
    }

    /// First volume with the given label.
    pub fn find_volume(&self, label: &str) -> Option<VolumeId> {
        self.volume_labels
            .iter()
            .position(|l| l == label)
            .map(VolumeId::new)
    }

    pub fn daughter(&self, volume: VolumeId) -> Option<&Daughter> {
        self.volume_daughters[volume.get()].map(|d| &self.daughters[d.get()])
    }

    /// Tracker for one universe, dispatched on its type.
    pub fn tracker(&self, universe: UniverseId) -> Tracker<'_> {
        let index = self.universe_indices[universe.get()];
        match self.universe_types[universe.get()] {
            UniverseType::Simple => {
                Tracker::Simple(SimpleUnitTracker::new(self, &self.simple_units[index]))
            }
            UniverseType::RectArray => {
                Tracker::RectArray(RectArrayTracker::new(self, &self.rect_arrays[index]))
            }
        }
    }

    pub(crate) fn volume_record(&self, unit: &SimpleUnitRecord, volume: LocalVolumeId) -> &VolumeRecord {
        debug_assert!(volume.get() < unit.volumes.len());
        &self.volume_records[unit.volumes.start() + volume.get()]
    }

    pub(crate) fn faces(&self, range: ItemRange) -> &[LocalSurfaceId] {
        &self.faces[range.range()]
    }

    pub(crate) fn logic(&self, range: ItemRange) -> &[LogicToken] {
        &self.logic[range.range()]
    }

    pub(crate) fn reals(&self, range: ItemRange) -> &[f64] {
        &self.reals[range.range()]
    }

    /// Local volumes that reference a surface.
    pub(crate) fn connectivity(&self, surface: SurfaceId) -> &[LocalVolumeId] {
        &self.connectivity[self.connectivity_ranges[surface.get()].range()]
    }
}

/// Incrementally fills the flat tables one universe at a time.
struct Builder {
    params: GeoParams,
    num_universes: usize,
    surface_counts: Vec<usize>,
    volume_counts: Vec<usize>,
}

impl Builder {
    fn new(options: GeoOptions, num_universes: usize) -> Self {
        Self {
            params: GeoParams {
                options,
                universe_types: Vec::with_capacity(num_universes),
                universe_indices: Vec::with_capacity(num_universes),
                universe_labels: Vec::with_capacity(num_universes),
                simple_units: Vec::new(),
                rect_arrays: Vec::new(),
                surfaces: Vec::new(),
                surface_labels: Vec::new(),
                volume_labels: Vec::new(),
                volume_daughters: Vec::new(),
                volume_records: Vec::new(),
                faces: Vec::new(),
                logic: Vec::new(),
                connectivity: Vec::new(),
                connectivity_ranges: Vec::new(),
                reals: Vec::new(),
                daughters: Vec::new(),
                unit_indexer: UnitIndexer::new(&[], &[]),
                scalars: GeoScalars {
                    max_level: 1,
                    max_faces: 1,
                    max_intersections: 1,
                },
            },
            num_universes,
            surface_counts: Vec::with_capacity(num_universes),
            volume_counts: Vec::with_capacity(num_universes),
        }
    }

    fn universe_label(index: usize, label: &str) -> String {
        if label.is_empty() {
            format!("universe{index}")
        } else {
            label.to_string()
        }
    }

    fn add_daughter(&mut self, owner: &str, input: &DaughterInput) -> Result<DaughterId, GeoError> {
        if input.universe >= self.num_universes {
            return Err(GeoError::UnknownUniverse {
                label: owner.to_string(),
                universe: input.universe,
            });
        }
        let id = DaughterId::new(self.params.daughters.len());
        self.params.daughters.push(Daughter {
            universe: UniverseId::new(input.universe),
            translation: Real3::from(input.translation),
        });
        Ok(id)
    }

    fn add_simple_unit(&mut self, index: usize, unit: &SimpleUnitInput) -> Result<(), GeoError> {
        let label = Self::universe_label(index, &unit.label);
        let p = &mut self.params;
        let surface_start = p.surfaces.len();
        for (i, surface) in unit.surfaces.iter().enumerate() {
            let surface_label = if surface.label.is_empty() {
                format!("{label}.s{i}")
            } else {
                surface.label.clone()
            };
            p.surfaces
                .push(Surface::from_data(surface.kind, &surface.data, &surface_label)?);
            p.surface_labels.push(surface_label);
        }
        let num_surfaces = unit.surfaces.len();

        let mut connected: Vec<Vec<LocalVolumeId>> = vec![Vec::new(); num_surfaces];
        let volume_start = self.params.volume_records.len();
        for (i, volume) in unit.volumes.iter().enumerate() {
            let volume_label = if volume.label.is_empty() {
                format!("{label}.v{i}")
            } else {
                volume.label.clone()
            };
            let compiled = logic::compile(&volume.logic, num_surfaces).map_err(|err| match err {
                LogicError::UnknownSurface(surface) => GeoError::UnknownSurface {
                    label: volume_label.clone(),
                    surface,
                    num_surfaces,
                },
                other => GeoError::Logic {
                    label: volume_label.clone(),
                    expr: volume.logic.clone(),
                    reason: other.to_string(),
                },
            })?;

            let daughter = match &volume.daughter {
                Some(d) => Some(self.add_daughter(&volume_label, d)?),
                None => None,
            };

            let p = &mut self.params;
            let max_intersections = compiled
                .faces
                .iter()
                .map(|f| p.surfaces[surface_start + f.get()].max_intersections())
                .sum();
            for face in &compiled.faces {
                connected[face.get()].push(LocalVolumeId::new(i));
            }
            let faces = ItemRange::new(p.faces.len(), p.faces.len() + compiled.faces.len());
            p.faces.extend_from_slice(&compiled.faces);
            let logic = ItemRange::new(p.logic.len(), p.logic.len() + compiled.tokens.len());
            p.logic.extend_from_slice(&compiled.tokens);

            p.scalars.max_faces = p.scalars.max_faces.max(compiled.faces.len());
            p.scalars.max_intersections = p.scalars.max_intersections.max(max_intersections);
            p.volume_records.push(VolumeRecord {
                faces,
                logic,
                is_conjunction: compiled.is_conjunction,
                max_intersections,
            });
            p.volume_labels.push(volume_label);
            p.volume_daughters.push(daughter);
        }

        let p = &mut self.params;
        for volumes in connected {
            let range = ItemRange::new(p.connectivity.len(), p.connectivity.len() + volumes.len());
            p.connectivity.extend(volumes);
            p.connectivity_ranges.push(range);
        }

        p.universe_types.push(UniverseType::Simple);
        p.universe_indices.push(p.simple_units.len());
        p.universe_labels.push(label);
        p.simple_units.push(SimpleUnitRecord {
            surfaces: ItemRange::new(surface_start, p.surfaces.len()),
            volumes: ItemRange::new(volume_start, p.volume_records.len()),
        });
        self.surface_counts.push(num_surfaces);
        self.volume_counts.push(unit.volumes.len());
        Ok(())
    }

    fn add_rect_array(&mut self, index: usize, array: &RectArrayInput) -> Result<(), GeoError> {
        let label = Self::universe_label(index, &array.label);

        let mut dims = [0usize; 3];
        let mut grids = [ItemRange::default(); 3];
        let mut surface_offsets = [0usize; 4];
        for axis in Axis::ALL {
            let ax = axis.index();
            let grid = &array.grid[ax];
            let valid = grid.len() >= 2
                && grid.iter().all(|v| v.is_finite())
                && grid.windows(2).all(|w| w[0] < w[1]);
            if !valid {
                return Err(GeoError::BadGrid {
                    label,
                    axis: ['x', 'y', 'z'][ax],
                });
            }
            dims[ax] = grid.len() - 1;
            let p = &mut self.params;
            grids[ax] = ItemRange::new(p.reals.len(), p.reals.len() + grid.len());
            p.reals.extend_from_slice(grid);
            surface_offsets[ax + 1] = surface_offsets[ax] + grid.len();
        }

        let num_cells = dims.iter().product::<usize>();
        if !array.daughters.is_empty() && array.daughters.len() != num_cells {
            return Err(GeoError::DaughterCount {
                label,
                expected: num_cells,
                got: array.daughters.len(),
            });
        }

        // Grid planes become ordinary surfaces so that labels and normals
        // work the same as for simple units
        let surface_start = self.params.surfaces.len();
        for axis in Axis::ALL {
            let name = ['x', 'y', 'z'][axis.index()];
            for (i, &position) in array.grid[axis.index()].iter().enumerate() {
                let p = &mut self.params;
                p.surfaces.push(Surface::PlaneAligned { axis, position });
                p.surface_labels.push(format!("{label}.{name}{i}"));
            }
        }
        let num_surfaces = self.params.surfaces.len() - surface_start;
        // No connectivity: crossings are resolved by index arithmetic
        for _ in 0..num_surfaces {
            let p = &mut self.params;
            p.connectivity_ranges
                .push(ItemRange::new(p.connectivity.len(), p.connectivity.len()));
        }

        self.params.volume_labels.push(format!("{label}.background"));
        self.params.volume_daughters.push(None);
        for cell in 0..num_cells {
            let (i, j, k) = (
                cell / (dims[1] * dims[2]),
                (cell / dims[2]) % dims[1],
                cell % dims[2],
            );
            let cell_label = format!("{label}[{i},{j},{k}]");
            let daughter = match array.daughters.get(cell).copied().flatten() {
                Some(d) => Some(self.add_daughter(&cell_label, &d)?),
                None => None,
            };
            self.params.volume_labels.push(cell_label);
            self.params.volume_daughters.push(daughter);
        }

        let p = &mut self.params;
        p.universe_types.push(UniverseType::RectArray);
        p.universe_indices.push(p.rect_arrays.len());
        p.universe_labels.push(label);
        p.rect_arrays.push(RectArrayRecord {
            dims,
            grids,
            surface_offsets,
        });
        self.surface_counts.push(num_surfaces);
        self.volume_counts.push(1 + num_cells);
        Ok(())
    }

    fn finish(mut self) -> Result<GeoParams, GeoError> {
        self.params.unit_indexer = UnitIndexer::new(&self.surface_counts, &self.volume_counts);

        // Daughter universes reachable from each universe
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); self.num_universes];
        for v in 0..self.params.volume_labels.len() {
            if let Some(daughter) = self.params.daughter(VolumeId::new(v)) {
                let (owner, _) = self.params.unit_indexer.local_volume(VolumeId::new(v));
                children[owner.get()].push(daughter.universe.get());
            }
        }
        let mut depths = vec![Depth::Unvisited; self.num_universes];
        self.params.scalars.max_level = universe_depth(0, &children, &mut depths)?;

        let p = &self.params;
        debug!(
            universes = p.num_universes(),
            surfaces = p.num_surfaces(),
            volumes = p.num_volumes(),
            max_level = p.scalars.max_level,
            max_faces = p.scalars.max_faces,
            "constructed geometry"
        );
        Ok(self.params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Depth {
    Unvisited,
    InProgress,
    Done(usize),
}

/// Number of levels in the tree rooted at `universe`.
fn universe_depth(
    universe: usize,
    children: &[Vec<usize>],
    depths: &mut [Depth],
) -> Result<usize, GeoError> {
    match depths[universe] {
        Depth::Done(depth) => return Ok(depth),
        Depth::InProgress => return Err(GeoError::DaughterCycle { universe }),
        Depth::Unvisited => {}
    }
    depths[universe] = Depth::InProgress;
    let mut deepest = 0;
    for &child in &children[universe] {
        deepest = deepest.max(universe_depth(child, children, depths)?);
    }
    depths[universe] = Depth::Done(deepest + 1);
    Ok(deepest + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T, GeoError>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    const TWO_LEVEL: &str = r#"{
        "universes": [
            {"type": "simple", "label": "outer",
             "surfaces": [{"type": "sc", "data": [10.0]}, {"type": "sc", "data": [5.0]}],
             "volumes": [
                {"label": "[EXTERIOR]", "logic": "0 ~"},
                {"label": "shell", "logic": "0 1 ~ &"},
                {"label": "core", "logic": "1", "daughter": {"universe": 1}}
             ]},
            {"type": "simple", "label": "inner",
             "surfaces": [{"type": "pz", "data": [0.0]}],
             "volumes": [{"label": "lower", "logic": "0"}, {"label": "upper", "logic": "0 ~"}]}
        ]
    }"#;

    #[test]
    fn from_json_builds_flat_tables() {
        let params = GeoParams::from_json(TWO_LEVEL).expect("geometry should build");
        assert_eq!(params.num_universes(), 2);
        assert_eq!(params.num_surfaces(), 3);
        assert_eq!(params.num_volumes(), 5);
        assert_eq!(params.scalars().max_level, 2);
        assert_eq!(params.scalars().max_faces, 2);
        assert_eq!(params.scalars().max_intersections, 4);
        assert_eq!(params.volume_label(VolumeId::new(4)), "upper");
        assert_eq!(params.surface_label(SurfaceId::new(2)), "inner.s0");
        assert_eq!(params.find_volume("core"), Some(VolumeId::new(2)));
        let daughter = params
            .daughter(VolumeId::new(2))
            .expect("core should hold a daughter");
        assert_eq!(daughter.universe, UniverseId::new(1));
        assert!(params.daughter(VolumeId::new(1)).is_none());
    }

    #[test]
    fn connectivity_lists_volumes_sharing_a_surface() {
        let params = GeoParams::from_json(TWO_LEVEL).expect("geometry should build");
        assert_eq!(
            params.connectivity(SurfaceId::new(1)),
            &[LocalVolumeId::new(1), LocalVolumeId::new(2)]
        );
        assert_eq!(
            params.connectivity(SurfaceId::new(0)),
            &[LocalVolumeId::new(0), LocalVolumeId::new(1)]
        );
    }

    #[test]
    fn rect_array_volumes_follow_background_then_cells() {
        let input = GeoInput {
            options: GeoOptions::default(),
            universes: vec![UniverseInput::RectArray(RectArrayInput {
                label: "grid".into(),
                grid: [vec![0.0, 1.0, 2.0], vec![0.0, 1.0], vec![-1.0, 1.0]],
                daughters: Vec::new(),
            })],
        };
        let params = GeoParams::new(&input).expect("grid should build");
        assert_eq!(params.num_volumes(), 3);
        assert_eq!(params.num_surfaces(), 7);
        assert_eq!(params.volume_label(VolumeId::new(2)), "grid[1,0,0]");
        assert_eq!(params.surface_label(SurfaceId::new(3)), "grid.y0");
        assert_eq!(params.universe_type(UniverseId::new(0)), UniverseType::RectArray);
    }

    #[test]
    fn invalid_input_is_reported() {
        assert_err_contains(GeoParams::new(&GeoInput::default()), "at least one universe");
        assert_err_contains(GeoParams::from_json("{\"universes\": 3}"), "parse");

        let bad_logic = TWO_LEVEL.replace("0 1 ~ &", "0 1 ~");
        assert_err_contains(GeoParams::from_json(&bad_logic), "malformed logic");

        let bad_surface = TWO_LEVEL.replace("\"logic\": \"1\"", "\"logic\": \"7\"");
        assert_err_contains(GeoParams::from_json(&bad_surface), "references surface 7");

        let bad_daughter = TWO_LEVEL.replace("\"universe\": 1", "\"universe\": 5");
        assert_err_contains(GeoParams::from_json(&bad_daughter), "missing universe 5");

        let cycle = TWO_LEVEL.replace("\"universe\": 1", "\"universe\": 0");
        assert_err_contains(GeoParams::from_json(&cycle), "placed inside itself");
    }

    #[test]
    fn bad_grid_is_rejected() {
        let input = GeoInput {
            options: GeoOptions::default(),
            universes: vec![UniverseInput::RectArray(RectArrayInput {
                label: "grid".into(),
                grid: [vec![0.0, 1.0], vec![1.0, 1.0], vec![0.0, 1.0]],
                daughters: Vec::new(),
            })],
        };
        assert_err_contains(GeoParams::new(&input), "y axis");
    }
}
