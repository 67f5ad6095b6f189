use helix_core::field::{FieldDriverOptions, UniformField, LORENTZ_COEFFICIENT};
use helix_core::track::{
    process_primaries, EventId, ParticleId, ParticleInput, ParticleParams, ParticleTrackState,
    ParticleTrackView, Primary, TrackId, TrackStates, TrackStatus, C_LIGHT,
};
use helix_geo::{GeoParams, Real3, ThreadId};

const FOUR_LEVELS: &str = include_str!("../../helix_geo/tests/data/four-levels.json");

// ==========================================
// Helpers
// ==========================================

fn geometry() -> GeoParams {
    GeoParams::from_json(FOUR_LEVELS).expect("four-levels geometry should build")
}

fn particles() -> ParticleParams {
    ParticleParams::new(vec![
        ParticleInput {
            name: "gamma".into(),
            mass: 0.0,
            charge: 0.0,
        },
        ParticleInput {
            name: "e-".into(),
            mass: 0.5109989,
            charge: -1.0,
        },
    ])
    .expect("particles should be valid")
}

fn primary(track: u32, particle: ParticleId, energy: f64, pos: Real3, dir: Real3) -> Primary {
    Primary {
        particle_id: particle,
        energy,
        position: pos,
        direction: dir,
        time: 0.0,
        event_id: EventId(0),
        track_id: TrackId(track),
    }
}

fn x_hat() -> Real3 {
    Real3::new(1.0, 0.0, 0.0)
}

/// Step the track in slot 0 until it dies, returning the step lengths.
fn run_to_exit(
    states: &mut TrackStates,
    geo: &GeoParams,
    particles: &ParticleParams,
    field: &UniformField,
    max_step: f64,
) -> Vec<f64> {
    let options = FieldDriverOptions::default();
    let mut distances = Vec::new();
    while states.sim(ThreadId(0)).status == TrackStatus::Alive {
        assert!(distances.len() < 1000, "track never left the world");
        let result = states
            .step_track(geo, particles, field, &options, ThreadId(0), max_step)
            .expect("default options are valid");
        assert!(result.distance > 0.0 && result.distance <= max_step);
        distances.push(result.distance);
    }
    distances
}

// ==========================================
// Stepping
// ==========================================

#[test]
fn neutral_track_crosses_every_level() {
    let geo = geometry();
    let particles = particles();
    let field = UniformField::new(Real3::new(0.0, 0.0, 1.0));

    let mut initializers = Vec::new();
    let start = Real3::new(-10.0, -10.0, -10.0);
    process_primaries(
        &particles,
        &[primary(0, ParticleId(0), 1.0, start, x_hat())],
        &mut initializers,
    )
    .unwrap();
    let mut states = TrackStates::new(&geo, 1);
    assert_eq!(states.initialize_tracks(&geo, &mut initializers), 1);
    assert_eq!(states.geo_track(&geo, ThreadId(0)).volume_label(), "Shape2");

    let distances = run_to_exit(&mut states, &geo, &particles, &field, 100.0);
    let expected = [5.0, 1.0, 1.0, 6.0, 1.0, 1.0, 10.0, 1.0, 1.0, 7.0];
    assert_eq!(distances.len(), expected.len());
    for (actual, expected) in distances.iter().zip(expected) {
        assert!((actual - expected).abs() < 1e-12, "{actual} vs {expected}");
    }

    let sim = *states.sim(ThreadId(0));
    assert_eq!(sim.status, TrackStatus::Killed);
    assert_eq!(sim.num_steps, 10);
    assert!((sim.time - 34.0 / C_LIGHT).abs() < 1e-12);
}

#[test]
fn charged_track_bends_out_of_the_world() {
    let geo = geometry();
    let particles = particles();
    let field = UniformField::new(Real3::new(0.0, 0.0, 1.0));

    let energy = 1000.0;
    let state = ParticleTrackState {
        particle_id: ParticleId(1),
        energy,
    };
    let momentum = ParticleTrackView::new(&particles, &state).momentum();
    let radius = momentum / LORENTZ_COEFFICIENT;

    let mut initializers = Vec::new();
    let start = Real3::new(-10.0, -10.0, -10.0);
    process_primaries(
        &particles,
        &[primary(7, ParticleId(1), energy, start, x_hat())],
        &mut initializers,
    )
    .unwrap();
    let mut states = TrackStates::new(&geo, 1);
    states.initialize_tracks(&geo, &mut initializers);

    let distances = run_to_exit(&mut states, &geo, &particles, &field, 5.0);

    // Counterclockwise about (-10, -10 + R): reaches x = 24 after turning by
    // asin(34 / R)
    let angle = (34.0 / radius).asin();
    let total: f64 = distances.iter().sum();
    assert!((total - radius * angle).abs() < 1e-3, "{total}");

    let sim = *states.sim(ThreadId(0));
    assert_eq!(sim.status, TrackStatus::Killed);
    assert_eq!(sim.num_steps as usize, distances.len());

    let track = states.geo_track(&geo, ThreadId(0));
    assert!(track.is_outside());
    let pos = track.pos();
    assert!((pos.x - 24.0).abs() < 1e-9);
    assert!((pos.y - (-10.0 + radius * (1.0 - angle.cos()))).abs() < 1e-3);
    assert!((pos.z + 10.0).abs() < 1e-9);
    let dir = track.dir();
    assert!((dir - Real3::new(angle.cos(), angle.sin(), 0.0)).norm() < 1e-4);
}

#[test]
fn field_steps_stop_short_inside_large_volumes() {
    let geo = geometry();
    let particles = particles();
    let field = UniformField::new(Real3::new(0.0, 0.0, 1.0));

    let mut initializers = Vec::new();
    process_primaries(
        &particles,
        &[primary(0, ParticleId(1), 1000.0, Real3::new(-10.0, -10.0, -10.0), x_hat())],
        &mut initializers,
    )
    .unwrap();
    let mut states = TrackStates::new(&geo, 1);
    states.initialize_tracks(&geo, &mut initializers);

    // The ball has a radius of 5 cm, so a 2 cm step stays inside
    let options = FieldDriverOptions::default();
    let result = states
        .step_track(&geo, &particles, &field, &options, ThreadId(0), 2.0)
        .unwrap();
    assert!(!result.boundary);
    assert!((result.distance - 2.0).abs() < 1e-12);
    let track = states.geo_track(&geo, ThreadId(0));
    assert!(!track.is_on_boundary());
    assert_eq!(track.volume_label(), "Shape2");
}

// ==========================================
// Initialization
// ==========================================

#[test]
fn initializers_fill_empty_slots_from_the_back() {
    let geo = geometry();
    let particles = particles();
    let dir = Real3::new(0.0, 0.0, 1.0);

    let primaries = vec![
        primary(0, ParticleId(0), 1.0, Real3::new(-10.0, -10.0, -10.0), dir),
        primary(1, ParticleId(0), 1.0, Real3::new(0.0, 0.0, 0.0), dir),
        primary(2, ParticleId(0), 1.0, Real3::new(30.0, 0.0, 0.0), dir),
        primary(3, ParticleId(1), 5.0, Real3::new(10.0, 10.0, 10.0), dir),
    ];
    let mut initializers = Vec::new();
    process_primaries(&particles, &primaries, &mut initializers).unwrap();

    let mut states = TrackStates::new(&geo, 3);
    assert_eq!(states.initialize_tracks(&geo, &mut initializers), 3);
    assert_eq!(initializers.len(), 1);

    assert_eq!(states.sim(ThreadId(0)).track_id, TrackId(3));
    assert_eq!(states.sim(ThreadId(1)).track_id, TrackId(2));
    assert_eq!(states.sim(ThreadId(2)).track_id, TrackId(1));
    assert_eq!(states.particle(ThreadId(0)).energy, 5.0);

    // Track 2 starts outside the world
    assert_eq!(states.sim(ThreadId(1)).status, TrackStatus::Killed);
    assert_eq!(states.num_alive(), 2);
    assert_eq!(states.geo_track(&geo, ThreadId(2)).volume_label(), "World");

    assert_eq!(states.clear_killed(), 1);
    assert_eq!(states.initialize_tracks(&geo, &mut initializers), 1);
    assert!(initializers.is_empty());
    assert_eq!(states.sim(ThreadId(1)).track_id, TrackId(0));
    assert_eq!(states.geo_track(&geo, ThreadId(1)).volume_label(), "Shape2");
    assert_eq!(states.num_alive(), 3);
}

#[test]
fn secondary_starts_at_the_parent() {
    let geo = geometry();
    let particles = particles();
    let field = UniformField::new(Real3::zeros());
    let options = FieldDriverOptions::default();

    let mut initializers = Vec::new();
    process_primaries(
        &particles,
        &[primary(0, ParticleId(0), 1.0, Real3::new(-10.0, -10.0, -10.0), x_hat())],
        &mut initializers,
    )
    .unwrap();
    let mut states = TrackStates::new(&geo, 2);
    states.initialize_tracks(&geo, &mut initializers);

    let first = states
        .step_track(&geo, &particles, &field, &options, ThreadId(0), 2.0)
        .unwrap();
    assert!(!first.boundary);

    let secondary = ParticleTrackState {
        particle_id: ParticleId(0),
        energy: 0.5,
    };
    let up = Real3::new(0.0, 1.0, 0.0);
    states.initialize_secondary(&geo, ThreadId(0), ThreadId(1), TrackId(1), secondary, &up);

    let sim = *states.sim(ThreadId(1));
    assert_eq!(sim.parent_id, Some(TrackId(0)));
    assert_eq!(sim.status, TrackStatus::Alive);
    assert_eq!(sim.num_steps, 0);
    assert_eq!(sim.time, states.sim(ThreadId(0)).time);

    {
        let track = states.geo_track(&geo, ThreadId(1));
        assert_eq!(track.volume_label(), "Shape2");
        assert_eq!(track.pos(), Real3::new(-8.0, -10.0, -10.0));
        assert_eq!(track.dir(), up);
    }
    // Parent is untouched
    assert_eq!(states.geo_track(&geo, ThreadId(0)).dir(), x_hat());

    // Ball of radius 5 about (-10, -10, -10), seen from 2 cm off center
    let step = states
        .step_track(&geo, &particles, &field, &options, ThreadId(1), 100.0)
        .unwrap();
    assert!(step.boundary);
    assert!((step.distance - 21.0f64.sqrt()).abs() < 1e-12);
    assert_eq!(states.geo_track(&geo, ThreadId(1)).volume_label(), "Shape1");
}
