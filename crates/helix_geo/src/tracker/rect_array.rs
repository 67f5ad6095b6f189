use crate::math::Real3;
use crate::params::{GeoParams, RectArrayRecord};
use crate::types::{
    Axis, Initialization, Intersection, LocalState, LocalSurfaceId, LocalVolumeId, OnSurface,
    Sense,
};

/// Tracker for a rectilinear grid of cells.
///
/// Local volume 0 is the background outside the grid extent; cell `(i, j, k)`
/// is local volume `1 + (i * ny + j) * nz + k`. Planes along each axis are
/// numbered consecutively starting at the x planes.
pub struct RectArrayTracker<'a> {
    params: &'a GeoParams,
    record: &'a RectArrayRecord,
}

pub(crate) const BACKGROUND: LocalVolumeId = LocalVolumeId(0);

impl<'a> RectArrayTracker<'a> {
    pub fn new(params: &'a GeoParams, record: &'a RectArrayRecord) -> Self {
        Self { params, record }
    }

    fn grid(&self, axis: usize) -> &'a [f64] {
        self.params.reals(self.record.grids[axis])
    }

    fn cell_volume(&self, coords: [usize; 3]) -> LocalVolumeId {
        let [_, ny, nz] = self.record.dims;
        LocalVolumeId::new(1 + (coords[0] * ny + coords[1]) * nz + coords[2])
    }

    fn cell_coords(&self, volume: LocalVolumeId) -> Option<[usize; 3]> {
        let cell = volume.get().checked_sub(1)?;
        let [_, ny, nz] = self.record.dims;
        Some([cell / (ny * nz), (cell / nz) % ny, cell % nz])
    }

    fn plane_surface(&self, axis: usize, index: usize) -> LocalSurfaceId {
        LocalSurfaceId::new(self.record.surface_offsets[axis] + index)
    }

    /// Axis and grid index of a plane.
    fn surface_plane(&self, surface: LocalSurfaceId) -> (usize, usize) {
        let offsets = &self.record.surface_offsets;
        let axis = offsets[1..].partition_point(|&o| o <= surface.get());
        debug_assert!(axis < 3);
        (axis, surface.get() - offsets[axis])
    }

    pub fn initialize(&self, state: &LocalState) -> Initialization {
        let mut coords = [0usize; 3];
        for (ax, coord) in coords.iter_mut().enumerate() {
            let grid = self.grid(ax);
            let x = state.pos[ax];
            let Some(&last) = grid.last() else {
                return Initialization::default();
            };
            if x < grid[0] || x > last {
                return self.background();
            }
            let index = grid.partition_point(|&v| v <= x) - 1;
            if grid[index] == x {
                // Exactly on a grid plane
                return self.background();
            }
            *coord = index;
        }
        Initialization {
            volume: Some(self.cell_volume(coords)),
            surface: None,
        }
    }

    /// Locate a track that arrives through its parent cell's boundary, which
    /// may coincide with a grid plane.
    pub fn enter(&self, state: &LocalState) -> Initialization {
        let mut coords = [0usize; 3];
        for (ax, coord) in coords.iter_mut().enumerate() {
            match self.find_index(ax, state.pos[ax], state.dir[ax]) {
                Some(index) => *coord = index,
                None => return self.background(),
            }
        }
        Initialization {
            volume: Some(self.cell_volume(coords)),
            surface: None,
        }
    }

    fn background(&self) -> Initialization {
        Initialization {
            volume: Some(BACKGROUND),
            surface: None,
        }
    }

    pub fn intersect(&self, state: &LocalState, max_dist: f64) -> Intersection {
        let Some(volume) = state.volume else {
            debug_assert!(false, "intersect requires a volume");
            return Intersection::miss(max_dist);
        };
        let found = match self.cell_coords(volume) {
            Some(coords) => self.intersect_cell(state, coords),
            None => self.intersect_extent(state),
        };
        match found {
            Some((distance, axis, index)) if distance <= max_dist => Intersection {
                distance,
                surface: Some(OnSurface {
                    id: self.plane_surface(axis, index),
                    sense: Sense::from_inside(state.dir[axis] > 0.0),
                }),
            },
            _ => Intersection::miss(max_dist),
        }
    }

    /// Nearest cell wall along the direction of travel.
    fn intersect_cell(&self, state: &LocalState, coords: [usize; 3]) -> Option<(f64, usize, usize)> {
        let mut result = None;
        let mut nearest = f64::INFINITY;
        for ax in 0..3 {
            let dir = state.dir[ax];
            if dir == 0.0 {
                continue;
            }
            let index = coords[ax] + usize::from(dir > 0.0);
            let distance = (self.grid(ax)[index] - state.pos[ax]) / dir;
            if distance > 0.0 && distance < nearest {
                nearest = distance;
                result = Some((distance, ax, index));
            }
        }
        result
    }

    /// Entry point into the grid extent from the background.
    fn intersect_extent(&self, state: &LocalState) -> Option<(f64, usize, usize)> {
        let mut enter = f64::NEG_INFINITY;
        let mut exit = f64::INFINITY;
        let mut plane = None;
        for ax in 0..3 {
            let grid = self.grid(ax);
            let (lo, hi) = (grid[0], grid[grid.len() - 1]);
            let (x, dir) = (state.pos[ax], state.dir[ax]);
            if dir == 0.0 {
                if x <= lo || x >= hi {
                    return None;
                }
                continue;
            }
            let (near, near_index, far) = if dir > 0.0 {
                ((lo - x) / dir, 0, (hi - x) / dir)
            } else {
                ((hi - x) / dir, grid.len() - 1, (lo - x) / dir)
            };
            if near > enter {
                enter = near;
                plane = Some((ax, near_index));
            }
            exit = exit.min(far);
        }
        let (ax, index) = plane?;
        (enter > 0.0 && enter < exit).then_some((enter, ax, index))
    }

    pub fn cross_boundary(&self, state: &LocalState) -> Initialization {
        let Some(on) = state.surface else {
            debug_assert!(false, "cross_boundary requires a current surface");
            return Initialization::default();
        };
        let (axis, plane) = self.surface_plane(on.id);
        let dims = self.record.dims;

        let coords = match state.volume.and_then(|v| self.cell_coords(v)) {
            Some(coords) => Some(coords),
            None => {
                // Entering from the background: locate the other two axes
                let mut coords = [0usize; 3];
                let mut found = true;
                for ax in (0..3).filter(|&ax| ax != axis) {
                    match self.find_index(ax, state.pos[ax], state.dir[ax]) {
                        Some(index) => coords[ax] = index,
                        None => found = false,
                    }
                }
                found.then_some(coords)
            }
        };

        let new_index = match on.sense {
            Sense::Outside => Some(plane),
            Sense::Inside => plane.checked_sub(1),
        };
        let volume = match (coords, new_index) {
            (Some(mut coords), Some(index)) if index < dims[axis] => {
                coords[axis] = index;
                self.cell_volume(coords)
            }
            _ => BACKGROUND,
        };
        Initialization {
            volume: Some(volume),
            surface: Some(on),
        }
    }

    /// Cell index containing `x`, resolving points on a plane by direction.
    fn find_index(&self, axis: usize, x: f64, dir: f64) -> Option<usize> {
        let grid = self.grid(axis);
        if x < grid[0] || x > grid[grid.len() - 1] {
            return None;
        }
        let mut index = grid.partition_point(|&v| v <= x) - 1;
        if grid[index] == x && dir < 0.0 {
            index = index.checked_sub(1)?;
        }
        (index < grid.len() - 1).then_some(index)
    }

    pub fn safety(&self, pos: &Real3, volume: LocalVolumeId) -> f64 {
        match self.cell_coords(volume) {
            Some(coords) => (0..3)
                .map(|ax| {
                    let grid = self.grid(ax);
                    let index = coords[ax];
                    (pos[ax] - grid[index]).min(grid[index + 1] - pos[ax])
                })
                .fold(f64::INFINITY, f64::min)
                .max(0.0),
            None => {
                let gap_sq: f64 = (0..3)
                    .map(|ax| {
                        let grid = self.grid(ax);
                        let gap = (grid[0] - pos[ax]).max(pos[ax] - grid[grid.len() - 1]);
                        gap.max(0.0).powi(2)
                    })
                    .sum();
                gap_sq.sqrt()
            }
        }
    }

    pub fn normal(&self, surface: LocalSurfaceId) -> Real3 {
        let (axis, _) = self.surface_plane(surface);
        Axis::ALL[axis].unit_vector()
    }
}
