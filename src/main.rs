//! Kart Sim entry point
//!
//! Headless demo: builds a small track, runs a few seconds of simulation and
//! prints the final world snapshot as JSON.

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use glam::DVec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use kart_sim::sim::{AngularMotion, BounceResolver, Blueprint, Motion, World};
    use kart_sim::{Result, SimSettings};

    const FRAMES: u32 = 300;
    const FRAME_TIME: f64 = 1.0 / 60.0;
    const SEED: u64 = 0x6b61_7274;
    const ARENA: DVec2 = DVec2::new(1000.0, 600.0);
    const DECOR_COUNT: usize = 12;

    fn rectangle(half: DVec2) -> Vec<DVec2> {
        vec![
            DVec2::new(-half.x, -half.y),
            DVec2::new(half.x, -half.y),
            DVec2::new(half.x, half.y),
            DVec2::new(-half.x, half.y),
        ]
    }

    fn track(rng: &mut Pcg32) -> Result<Vec<Blueprint>> {
        let mut records = vec![
            // Outer walls
            Blueprint::polygon(DVec2::new(ARENA.x / 2.0, -10.0), rectangle(DVec2::new(ARENA.x / 2.0, 10.0)))
                .with_name("wall"),
            Blueprint::polygon(
                DVec2::new(ARENA.x / 2.0, ARENA.y + 10.0),
                rectangle(DVec2::new(ARENA.x / 2.0, 10.0)),
            )
            .with_name("wall"),
            Blueprint::polygon(DVec2::new(-10.0, ARENA.y / 2.0), rectangle(DVec2::new(10.0, ARENA.y / 2.0)))
                .with_name("wall"),
            Blueprint::polygon(
                DVec2::new(ARENA.x + 10.0, ARENA.y / 2.0),
                rectangle(DVec2::new(10.0, ARENA.y / 2.0)),
            )
            .with_name("wall"),
            // Course
            Blueprint::finish_line(3, DVec2::new(200.0, 300.0), rectangle(DVec2::new(4.0, 300.0))),
            Blueprint::gate(1, DVec2::new(500.0, 300.0), rectangle(DVec2::new(4.0, 300.0))),
            Blueprint::gate(2, DVec2::new(800.0, 300.0), rectangle(DVec2::new(4.0, 300.0))),
            Blueprint::lava(DVec2::new(650.0, 80.0), rectangle(DVec2::new(60.0, 30.0))),
            // Swinging obstacle
            Blueprint::polygon(DVec2::new(650.0, 400.0), rectangle(DVec2::new(80.0, 6.0)))
                .with_name("sweeper")
                .with_angular_motion(AngularMotion::new(
                    DVec2::new(-80.0, 0.0),
                    Motion::harmonic(0.8, 3.0, 0.0)?,
                ))
                .with_linear_motion(Motion::harmonic(DVec2::new(0.0, 40.0), 5.0, 0.0)?),
            Blueprint::kart(DVec2::new(150.0, 300.0), 0.0).with_name("kart"),
            Blueprint::kart(DVec2::new(150.0, 360.0), 0.0).with_name("kart"),
        ];

        for _ in 0..DECOR_COUNT {
            let center = DVec2::new(rng.random_range(280.0..950.0), rng.random_range(40.0..560.0));
            let velocity = DVec2::new(rng.random_range(-150.0..150.0), rng.random_range(-150.0..150.0));
            records.push(
                Blueprint::circle(center, rng.random_range(6.0..16.0))
                    .with_name("decor")
                    .with_mass(1.0)
                    .with_linear_motion(Motion::uniform(velocity)),
            );
        }
        Ok(records)
    }

    pub fn run(settings: SimSettings) -> Result<()> {
        let mut rng = Pcg32::seed_from_u64(SEED);
        let mut world = World::from_blueprints(settings, track(&mut rng)?)?;

        let kart = world.factory_mut().load_kart("demo", "kart.png", None)?;
        if let Some(entity) = world.factory_mut().get_mut(kart) {
            entity.set_linear_speed(DVec2::new(240.0, 0.0));
        }

        let mut total = 0;
        for _ in 0..FRAMES {
            let report = world.next_frame(FRAME_TIME, &mut BounceResolver);
            for contact in &report.contacts {
                log::debug!(
                    "frame {}: {} hit {} at ({:.1}, {:.1})",
                    world.frame(),
                    contact.first,
                    contact.second,
                    contact.point.x,
                    contact.point.y
                );
            }
            total += report.contacts.len();
        }
        log::info!(
            "Simulated {} frames ({:.2}s), {total} contacts",
            world.frame(),
            world.elapsed()
        );

        println!("{}", world.export_state().to_json()?);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Kart Sim (native) starting...");

    let settings = std::env::args()
        .nth(1)
        .map(kart_sim::SimSettings::load)
        .unwrap_or_default();

    if let Err(e) = demo::run(settings) {
        log::error!("Simulation failed: {e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation core is a library; there is no browser entry point
}
