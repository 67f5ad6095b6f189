//! Mapping between universe-local and global surface/volume ids.

use crate::types::{LocalSurfaceId, LocalVolumeId, SurfaceId, UniverseId, VolumeId};

/// Prefix sums over the per-universe surface and volume counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitIndexer {
    surfaces: Vec<usize>,
    volumes: Vec<usize>,
}

impl UnitIndexer {
    pub fn new(num_surfaces: &[usize], num_volumes: &[usize]) -> Self {
        debug_assert_eq!(num_surfaces.len(), num_volumes.len());
        Self {
            surfaces: prefix_sums(num_surfaces),
            volumes: prefix_sums(num_volumes),
        }
    }

    pub fn global_surface(&self, universe: UniverseId, surface: LocalSurfaceId) -> SurfaceId {
        let offset = self.surfaces[universe.get()];
        debug_assert!(offset + surface.get() < self.surfaces[universe.get() + 1]);
        SurfaceId::new(offset + surface.get())
    }

    pub fn global_volume(&self, universe: UniverseId, volume: LocalVolumeId) -> VolumeId {
        let offset = self.volumes[universe.get()];
        debug_assert!(offset + volume.get() < self.volumes[universe.get() + 1]);
        VolumeId::new(offset + volume.get())
    }

    pub fn local_surface(&self, surface: SurfaceId) -> (UniverseId, LocalSurfaceId) {
        debug_assert!(surface.get() < self.num_surfaces());
        let (universe, local) = find_local(&self.surfaces, surface.get());
        (universe, LocalSurfaceId::new(local))
    }

    pub fn local_volume(&self, volume: VolumeId) -> (UniverseId, LocalVolumeId) {
        debug_assert!(volume.get() < self.num_volumes());
        let (universe, local) = find_local(&self.volumes, volume.get());
        (universe, LocalVolumeId::new(local))
    }

    pub fn num_universes(&self) -> usize {
        self.surfaces.len() - 1
    }

    pub fn num_surfaces(&self) -> usize {
        self.surfaces.last().copied().unwrap_or(0)
    }

    pub fn num_volumes(&self) -> usize {
        self.volumes.last().copied().unwrap_or(0)
    }

    pub fn num_surfaces_in(&self, universe: UniverseId) -> usize {
        self.surfaces[universe.get() + 1] - self.surfaces[universe.get()]
    }

    pub fn num_volumes_in(&self, universe: UniverseId) -> usize {
        self.volumes[universe.get() + 1] - self.volumes[universe.get()]
    }
}

fn prefix_sums(counts: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(counts.len() + 1);
    offsets.push(0);
    let mut total = 0;
    for count in counts {
        total += count;
        offsets.push(total);
    }
    offsets
}

/// The owning universe is the last one whose offset does not exceed `id`,
/// which skips over universes with no entries.
fn find_local(offsets: &[usize], id: usize) -> (UniverseId, usize) {
    let universe = offsets[..offsets.len() - 1].partition_point(|&o| o <= id) - 1;
    (UniverseId::new(universe), id - offsets[universe])
}
