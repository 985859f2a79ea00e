//! # AR Particles
//!
//! Two interchangeable particle emitters anchored in a 3D scene.
//!
//! ## Features
//!
//! - **Kinematic emitter**: "Nature of Code" style particles that integrate
//!   acceleration, velocity and position once per frame
//! - **Physics emitter**: rigid-body particles launched by a one-shot impulse
//!   that change colour when they hit the environment
//! - **Fixed pools**: dead particles are replaced in the same slot during the
//!   update pass, so the population stays at capacity
//! - **Scene host**: a `bevy_ecs` backed scene graph with anchors, transforms
//!   and material state, plus a `rapier3d` physics world
//!
//! ## Architecture Design
//!
//! All particle and pool mutation happens on the simulation thread inside
//! [`core::SimulationController::tick`]. Mode toggles and collision events may
//! be produced on other threads; they travel over `crossbeam-channel` queues
//! and are drained at the start of a tick.
//!
//! ### Example
//!
//! ```no_run
//! use ar_particles::config::SimulationConfig;
//! use ar_particles::core::{SimulationController, UiSignal};
//!
//! let mut controller = SimulationController::new(SimulationConfig::default())?;
//! let signals = controller.signals();
//!
//! for _ in 0..120 {
//!     controller.tick(1.0 / 60.0)?;
//! }
//! signals.send(UiSignal::TogglePhysics).ok();
//! controller.tick(1.0 / 60.0)?;
//! # Ok::<(), ar_particles::core::SimulationError>(())
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Controller, frame loop and errors
//! - [`particles`]: Particles and emitters
//! - [`scene`]: Scene graph host
//! - [`physics`]: Rigid-body host and collision events
//! - [`xr`]: AR anchoring context
//! - [`config`]: Configuration

/// Controller, headless frame loop and error types
pub mod core;
/// Scene components
pub mod ecs;
/// Particles and their emitters
pub mod particles;
/// Rigid-body physics using Rapier
pub mod physics;
/// Scene graph host
pub mod scene;
/// AR anchoring context
pub mod xr;
/// Configuration system
pub mod config;
