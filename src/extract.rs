//! Extraction of optimisation parameters from a labelled-field brief.
//!
//! A brief is free markdown in which the values that matter appear as
//! `**Label** : value[unit]`. Every field is looked up by an independent
//! [`Rule`]; a field that is missing or does not convert falls back to its
//! default without affecting any other field.

use std::fmt::Debug;

use log::debug;
use uom::si::f64::Pressure;
use uom::si::pressure::{gigapascal, pascal};

use crate::geometry::{LoadDirection, Shape};
use crate::material::lookup;
use crate::parameters::{
    BoundaryConditions, Constraints, Geometry, Loads, MaterialProperties,
    OptimizationParameters, OptimizationSettings,
};

/// A `**Label** : value` pair found in the brief.
#[derive(Clone, Debug, PartialEq)]
struct LabeledField<'a> {
    /// Label text, lowercased and trimmed.
    label: String,
    /// Everything after the colon up to the end of the line, trimmed.
    value: &'a str,
}

/// Collect every labelled field in document order.
fn labeled_fields(text: &str) -> Vec<LabeledField<'_>> {
    let mut fields = Vec::new();
    for line in text.lines() {
        let mut rest = line;
        while let Some(open) = rest.find("**") {
            let after_open = &rest[open + 2..];
            let Some(close) = after_open.find("**") else {
                break;
            };
            let label = after_open[..close].trim();
            let after_close = &after_open[close + 2..];
            if let Some(value) = after_close.trim_start().strip_prefix(':') {
                if !label.is_empty() {
                    fields.push(LabeledField {
                        label: label.to_lowercase(),
                        value: value.trim(),
                    });
                }
            }
            rest = after_close;
        }
    }
    fields
}

/// Whether `label` is `alias` or starts with it followed by a qualifier,
/// e.g. `module de young (e)` for `module de young`.
fn label_matches(label: &str, alias: &str) -> bool {
    match label.strip_prefix(alias) {
        Some("") => true,
        Some(qualifier) => qualifier.starts_with(' ') || qualifier.starts_with('('),
        None => false,
    }
}

/// One field of the output record: where to find it and how to read it.
struct Rule<T> {
    /// Dotted path of the field in the output record, used for logging.
    field: &'static str,
    /// Lowercase labels that carry this field.
    labels: &'static [&'static str],
    /// Conversion from the raw value; `None` means the value is unusable.
    convert: fn(&str) -> Option<T>,
}

impl<T: Debug> Rule<T> {
    /// First value under one of this rule's labels that converts.
    fn find(&self, fields: &[LabeledField<'_>]) -> Option<T> {
        fields
            .iter()
            .filter(|field| self.labels.iter().any(|alias| label_matches(&field.label, alias)))
            .find_map(|field| (self.convert)(field.value))
    }

    /// Value from the brief, or `default` when absent or malformed.
    fn resolve(&self, fields: &[LabeledField<'_>], default: T) -> T {
        self.find(fields).unwrap_or_else(|| {
            debug!("{} not found in brief, using default {:?}", self.field, default);
            default
        })
    }
}

/// Split a leading unsigned decimal (`12` or `12.5`) off `text`.
fn leading_number(text: &str) -> Option<(f64, &str)> {
    let integer_len = text.bytes().take_while(u8::is_ascii_digit).count();
    if integer_len == 0 {
        return None;
    }
    let mut end = integer_len;
    if let Some(fraction) = text[end..].strip_prefix('.') {
        let fraction_len = fraction.bytes().take_while(u8::is_ascii_digit).count();
        if fraction_len > 0 {
            end += 1 + fraction_len;
        }
    }
    let value = text[..end].parse().ok()?;
    Some((value, &text[end..]))
}

/// Number followed by a case-insensitive unit suffix.
fn number_with_unit(text: &str, unit: &str) -> Option<f64> {
    let (value, rest) = leading_number(text)?;
    let prefix = rest.trim_start().get(..unit.len())?;
    prefix.eq_ignore_ascii_case(unit).then_some(value)
}

/// First word of the value.
fn word(text: &str) -> Option<String> {
    let word: String = text
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    (!word.is_empty()).then_some(word)
}

/// Whole value as free text.
fn free_text(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

/// Bare decimal number.
fn decimal(text: &str) -> Option<f64> {
    leading_number(text).map(|(value, _)| value)
}

/// Bare unsigned integer.
fn integer(text: &str) -> Option<usize> {
    let digits_len = text.bytes().take_while(u8::is_ascii_digit).count();
    text[..digits_len].parse().ok()
}

/// `L x W [x H]` in millimetres. A single length is repeated.
fn dimensions(text: &str) -> Option<Vec<f64>> {
    fn separated(text: &str) -> Option<(f64, &str)> {
        let rest = text.trim_start().strip_prefix(['x', 'X', '×'])?;
        leading_number(rest.trim_start())
    }

    let (first, rest) = leading_number(text)?;
    let Some((second, rest)) = separated(rest) else {
        return Some(vec![first, first]);
    };
    match separated(rest) {
        Some((third, _)) => Some(vec![first, second, third]),
        None => Some(vec![first, second]),
    }
}

/// Modulus given in gigapascals, returned in pascals.
fn gigapascals(text: &str) -> Option<f64> {
    number_with_unit(text, "GPa").map(|value| Pressure::new::<gigapascal>(value).get::<pascal>())
}

/// Force given in newtons.
fn newtons(text: &str) -> Option<f64> {
    number_with_unit(text, "N")
}

/// Percentage returned as a fraction.
fn percentage(text: &str) -> Option<f64> {
    number_with_unit(text, "%").map(|value| value / 100.0)
}

/// Signed axis label at the start of the value.
fn direction(text: &str) -> Option<LoadDirection> {
    let token_len = if text.starts_with(['+', '-']) { 2 } else { 1 };
    text.get(..token_len)?.parse().ok()
}

/// Shape tag.
const SHAPE: Rule<String> = Rule {
    field: "geometry.shape",
    labels: &["forme", "shape"],
    convert: word,
};

/// Envelope dimensions in millimetres.
const DIMENSIONS: Rule<Vec<f64>> = Rule {
    field: "geometry.dimensions",
    labels: &["dimensions"],
    convert: dimensions,
};

/// Material name as written.
const MATERIAL_NAME: Rule<String> = Rule {
    field: "material.name",
    labels: &["type", "material"],
    convert: free_text,
};

/// Young's modulus, written in GPa.
const YOUNGS_MODULUS: Rule<f64> = Rule {
    field: "material.E",
    labels: &["module de young", "young's modulus", "youngs modulus"],
    convert: gigapascals,
};

/// Poisson's ratio.
const POISSON_RATIO: Rule<f64> = Rule {
    field: "material.nu",
    labels: &["coefficient de poisson", "poisson's ratio", "poisson ratio"],
    convert: decimal,
};

/// Density in kg/m³.
const DENSITY: Rule<f64> = Rule {
    field: "material.density",
    labels: &["densité", "density"],
    convert: decimal,
};

/// Load magnitude in newtons.
const FORCE: Rule<f64> = Rule {
    field: "loads.magnitude",
    labels: &["force"],
    convert: newtons,
};

/// Load direction.
const DIRECTION: Rule<LoadDirection> = Rule {
    field: "loads.direction",
    labels: &["direction"],
    convert: direction,
};

/// Retained volume, written as a percentage.
const VOLUME_FRACTION: Rule<f64> = Rule {
    field: "constraints.volume_fraction",
    labels: &["volume maximal", "max volume"],
    convert: percentage,
};

/// Safety factor.
const SAFETY_FACTOR: Rule<f64> = Rule {
    field: "constraints.safety_factor",
    labels: &["facteur de sécurité", "safety factor"],
    convert: decimal,
};

/// Voxels per axis.
const RESOLUTION: Rule<usize> = Rule {
    field: "optimization.resolution",
    labels: &["résolution", "resolution"],
    convert: integer,
};

/// SIMP penalty exponent.
const PENALTY: Rule<f64> = Rule {
    field: "optimization.penalty",
    labels: &["pénalité simp", "simp penalty", "penalty"],
    convert: decimal,
};

/// Iteration budget.
const ITERATIONS: Rule<usize> = Rule {
    field: "optimization.iterations",
    labels: &[
        "nombre d'itérations",
        "nombre d’itérations",
        "itérations",
        "iterations",
    ],
    convert: integer,
};

/// Extract a complete [`OptimizationParameters`] record from a brief.
///
/// This never fails: each field that is absent or malformed takes its default
/// (Cylinder, 100x100x20 mm, aluminium, 1000 N along -Z, 40 % volume, safety
/// factor 2, 25 voxels, penalty 3, 40 iterations, convergence 0.01). The
/// admissible stress is always derived from the material's yield stress and the
/// safety factor; any stress written in the brief is ignored.
///
/// # Examples
/// ```
/// use topobrief::{extract, LoadDirection, Shape};
///
/// let brief = "## Chargements\n**Force** : 500 N\n**Direction** : +Z\n";
/// let params = extract(brief);
/// assert_eq!(params.loads.magnitude, 500.0);
/// assert_eq!(params.loads.direction, LoadDirection::PosZ);
/// assert_eq!(params.geometry.shape, Shape::Cylinder);
/// ```
#[must_use]
pub fn extract(text: &str) -> OptimizationParameters {
    let fields = labeled_fields(text);
    let defaults = OptimizationParameters::default();

    let shape_tag = SHAPE.resolve(&fields, defaults.geometry.shape.to_string());
    let geometry = Geometry::new(
        Shape::from_tag(&shape_tag),
        DIMENSIONS.resolve(&fields, defaults.geometry.dimensions),
    );

    let name = MATERIAL_NAME.resolve(&fields, defaults.material.name);
    let table = lookup(&name);
    let material = MaterialProperties {
        youngs_modulus: YOUNGS_MODULUS.resolve(&fields, table.youngs_modulus),
        poisson_ratio: POISSON_RATIO.resolve(&fields, table.poisson_ratio),
        density: DENSITY.resolve(&fields, table.density),
        ..MaterialProperties::from_material(name, &table)
    };

    let loads = Loads {
        magnitude: FORCE.resolve(&fields, defaults.loads.magnitude),
        direction: DIRECTION.resolve(&fields, defaults.loads.direction),
        position: defaults.loads.position,
    };

    let constraints = Constraints::new(
        VOLUME_FRACTION.resolve(&fields, defaults.constraints.volume_fraction),
        SAFETY_FACTOR.resolve(&fields, defaults.constraints.safety_factor),
        material.yield_stress,
    );

    let optimization = OptimizationSettings {
        resolution: RESOLUTION.resolve(&fields, defaults.optimization.resolution),
        penalty: PENALTY.resolve(&fields, defaults.optimization.penalty),
        iterations: ITERATIONS.resolve(&fields, defaults.optimization.iterations),
        convergence: defaults.optimization.convergence,
    };

    OptimizationParameters {
        geometry,
        material,
        boundary_conditions: BoundaryConditions::default(),
        loads,
        constraints,
        optimization,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::material::Material;

    #[test]
    fn scans_labels_inside_prose() {
        let text = "Intro **not a field** here\n- **Force** : 500 N (vers le bas)\n**Empty**:\n";
        let fields = labeled_fields(text);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].label, "force");
        assert_eq!(fields[0].value, "500 N (vers le bas)");
        assert_eq!(fields[1].label, "empty");
        assert_eq!(fields[1].value, "");
    }

    #[test]
    fn labels_match_with_qualifiers_only() {
        assert!(label_matches("module de young (e)", "module de young"));
        assert!(label_matches("force", "force"));
        assert!(!label_matches("forces", "force"));
        assert!(!label_matches("volume initial", "volume maximal"));
    }

    #[test]
    fn parses_leading_numbers() {
        assert_eq!(leading_number("12.5 mm"), Some((12.5, " mm")));
        assert_eq!(leading_number("12."), Some((12.0, ".")));
        assert_eq!(leading_number("abc"), None);
        assert_eq!(leading_number("-3"), None);
    }

    #[test]
    fn parses_dimension_variants() {
        assert_eq!(dimensions("80x60x20 mm"), Some(vec![80.0, 60.0, 20.0]));
        assert_eq!(dimensions("80 X 60"), Some(vec![80.0, 60.0]));
        assert_eq!(dimensions("50 × 120"), Some(vec![50.0, 120.0]));
        assert_eq!(dimensions("75 mm"), Some(vec![75.0, 75.0]));
        assert_eq!(dimensions("[dimensions en mm]"), None);
    }

    #[test]
    fn converts_units() {
        assert_eq!(newtons("500 N"), Some(500.0));
        assert_eq!(newtons("500n"), Some(500.0));
        assert_eq!(newtons("abc N"), None);
        assert_eq!(newtons("500 kN"), None);
        assert_eq!(percentage("30 %"), Some(0.3));
        assert_eq!(percentage("30"), None);
        assert_relative_eq!(gigapascals("70 GPa").expect("modulus"), 70.0e9);
        assert_eq!(gigapascals("70 MPa"), None);
    }

    #[test]
    fn reads_directions() {
        assert_eq!(direction("-z"), Some(LoadDirection::NegZ));
        assert_eq!(direction("+X (latéral)"), Some(LoadDirection::PosX));
        assert_eq!(direction("Y"), Some(LoadDirection::PosY));
        assert_eq!(direction("bas"), None);
    }

    #[test]
    fn later_valid_occurrence_is_used() {
        let params = extract("**Force** : beaucoup N\n**Force** : 750 N\n");
        assert_eq!(params.loads.magnitude, 750.0);
    }

    #[test]
    fn material_overrides_are_independent() {
        let brief = "**Type** : Titane\n**Coefficient de Poisson (ν)** : 0.31\n";
        let params = extract(brief);
        assert_eq!(params.material.name, "Titane");
        assert_eq!(params.material.youngs_modulus, Material::TITANIUM.youngs_modulus);
        assert_eq!(params.material.poisson_ratio, 0.31);
        assert_eq!(params.material.density, Material::TITANIUM.density);
        assert_eq!(params.material.yield_stress, Material::TITANIUM.yield_stress);
    }

    #[test]
    fn first_type_label_names_the_material() {
        let brief = "**Type** : PLA\n## Conditions\n**Type** : Encastrement complet\n";
        assert_eq!(extract(brief).material.name, "PLA");
    }

    #[test]
    fn unknown_shape_is_kept_verbatim() {
        let params = extract("**Forme** : Lattice\n**Dimensions** : 10x10x10");
        assert_eq!(params.geometry.shape, Shape::Other("Lattice".into()));
        assert_eq!(params.geometry.volume, 0.0);
    }

    #[test]
    fn solver_controls_are_read() {
        let brief = "**Résolution** : 30 voxels\n**Pénalité SIMP** : 3.5\n**Itérations** : 60\n";
        let params = extract(brief);
        assert_eq!(params.optimization.resolution, 30);
        assert_eq!(params.optimization.penalty, 3.5);
        assert_eq!(params.optimization.iterations, 60);
        assert_eq!(params.optimization.convergence, 0.01);
    }

    #[test]
    fn convergence_line_is_ignored() {
        let params = extract("**Critère de convergence** : 0.5");
        assert_eq!(params.optimization.convergence, 0.01);
    }
}
