//! Plain-text summary of an optimisation run.

use std::fmt::Write;

use crate::parameters::OptimizationParameters;
use crate::result::{Metrics, OptimizationResult};

/// Render a textual summary of the request and its result.
///
/// Simulated results are announced on the first line and every illustrative
/// metric is marked, so the report never passes stand-in figures off as solver
/// output.
#[must_use]
pub fn render_summary(params: &OptimizationParameters, result: &OptimizationResult) -> String {
    let mut output = String::new();

    let origin = if result.is_simulated() {
        "SIMULATED (solver unavailable)"
    } else {
        "external solver"
    };
    writeln!(&mut output, "Topology optimization: {origin}")
        .expect("writing to string cannot fail");

    let geometry = &params.geometry;
    let dimensions = geometry
        .dimensions
        .iter()
        .map(|d| format!("{d}"))
        .collect::<Vec<_>>()
        .join(" x ");
    writeln!(
        &mut output,
        "Part: {} {dimensions} mm (envelope {:.0} mm³)",
        geometry.shape, geometry.volume
    )
    .expect("writing to string cannot fail");

    let material = &params.material;
    writeln!(
        &mut output,
        "Material: {} (E = {:.1} GPa, nu = {}, density = {} kg/m³)",
        material.name,
        material.youngs_modulus / 1.0e9,
        material.poisson_ratio,
        material.density
    )
    .expect("writing to string cannot fail");

    writeln!(
        &mut output,
        "Load: {:.1} N along {} at {}, {} support at {}",
        params.loads.magnitude,
        params.loads.direction,
        params.loads.position,
        params.boundary_conditions.kind,
        params.boundary_conditions.position
    )
    .expect("writing to string cannot fail");

    let constraints = &params.constraints;
    write!(
        &mut output,
        "Constraints: keep {:.0}% of volume, safety factor {:.2}",
        constraints.volume_fraction * 100.0,
        constraints.safety_factor
    )
    .expect("writing to string cannot fail");
    if let Some(max_stress) = constraints.max_stress {
        write!(&mut output, ", admissible stress {:.1} MPa", max_stress / 1.0e6)
            .expect("writing to string cannot fail");
    }
    output.push('\n');

    let settings = &params.optimization;
    writeln!(
        &mut output,
        "Solver: {}³ voxels, penalty {}, {} iterations",
        settings.resolution, settings.penalty, settings.iterations
    )
    .expect("writing to string cannot fail");

    if !result.success {
        writeln!(
            &mut output,
            "FAILED: {}",
            result.error.as_deref().unwrap_or("no reason given")
        )
        .expect("writing to string cannot fail");
        return output;
    }

    if let Some(metrics) = &result.metrics {
        render_metrics(&mut output, metrics);
    }
    if let Some(artifact) = &result.artifact_reference {
        writeln!(&mut output, "Mesh: {artifact}").expect("writing to string cannot fail");
    }
    if let Some(message) = &result.message {
        writeln!(&mut output, "Note: {message}").expect("writing to string cannot fail");
    }

    output
}

/// Append the metrics block, flagging illustrative values.
fn render_metrics(output: &mut String, metrics: &Metrics) {
    let flag = |key: &str| {
        if metrics.is_illustrative(key) {
            " (illustrative)"
        } else {
            ""
        }
    };

    writeln!(
        output,
        "Volume: {:.0} -> {:.0} mm³ ({:.0}% removed)",
        metrics.volume_initial, metrics.volume_optimized, metrics.volume_reduction_percent
    )
    .expect("writing to string cannot fail");
    if let Some(mass) = metrics.mass_grams {
        writeln!(output, "Mass: {mass:.1} g").expect("writing to string cannot fail");
    }
    if let Some(safety_factor) = metrics.safety_factor {
        writeln!(
            output,
            "Safety factor: {safety_factor:.2}{}",
            flag("safety_factor")
        )
        .expect("writing to string cannot fail");
    }
    if let Some(max_stress) = metrics.max_stress {
        writeln!(
            output,
            "Max stress: {:.1} MPa{}",
            max_stress / 1.0e6,
            flag("max_stress")
        )
        .expect("writing to string cannot fail");
    }
    if let Some(iterations) = metrics.iterations_completed {
        writeln!(output, "Iterations completed: {iterations}")
            .expect("writing to string cannot fail");
    }
}
