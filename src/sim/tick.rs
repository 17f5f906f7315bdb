//! Frame driver
//!
//! Maps one rendered frame onto fixed physics steps according to the stage's
//! step policy.

use super::stage::Stage;
use crate::settings::StepPolicy;

/// Longest frame time honoured by catch-up stepping; anything above is lost
const MAX_FRAME_TIME: f32 = 0.1;

/// Advance the stage for one rendered frame of `frame_dt` seconds.
/// Returns the number of fixed steps taken.
pub fn tick(stage: &mut Stage, frame_dt: f32) -> u32 {
    if stage.is_over() {
        return 0;
    }

    match stage.settings.step_policy {
        StepPolicy::Fixed => {
            stage.step();
            1
        }
        StepPolicy::CatchUp { max_substeps } => {
            let substep = stage.settings.substep;
            let frame_dt = if frame_dt.is_finite() {
                frame_dt.clamp(0.0, MAX_FRAME_TIME)
            } else {
                0.0
            };
            stage.accumulator += frame_dt;

            let mut substeps = 0;
            while stage.accumulator >= substep && substeps < max_substeps {
                stage.step();
                stage.accumulator -= substep;
                substeps += 1;
                if stage.is_over() {
                    stage.accumulator = 0.0;
                    break;
                }
            }
            if substeps == max_substeps && stage.accumulator >= substep {
                log::debug!("Dropping {:.3}s of backlog", stage.accumulator);
                stage.accumulator = 0.0;
            }
            substeps
        }
    }
}
