//! Static table of engineering materials.

/// Isotropic material properties in SI units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Canonical name of the table entry.
    pub name: &'static str,
    /// Young's modulus in pascals.
    pub youngs_modulus: f64,
    /// Poisson's ratio.
    pub poisson_ratio: f64,
    /// Density in kilograms per cubic metre.
    pub density: f64,
    /// Yield stress in pascals, when known.
    pub yield_stress: Option<f64>,
}

impl Material {
    /// Structural steel.
    pub const STEEL: Material = Material {
        name: "steel",
        youngs_modulus: 210.0e9,
        poisson_ratio: 0.3,
        density: 7850.0,
        yield_stress: Some(250.0e6),
    };

    /// Wrought aluminium alloy. This is also the fallback material.
    pub const ALUMINUM: Material = Material {
        name: "aluminum",
        youngs_modulus: 70.0e9,
        poisson_ratio: 0.33,
        density: 2700.0,
        yield_stress: Some(276.0e6),
    };

    /// Titanium alloy.
    pub const TITANIUM: Material = Material {
        name: "titanium",
        youngs_modulus: 110.0e9,
        poisson_ratio: 0.34,
        density: 4500.0,
        yield_stress: Some(880.0e6),
    };

    /// ABS thermoplastic.
    pub const ABS: Material = Material {
        name: "abs",
        youngs_modulus: 2.3e9,
        poisson_ratio: 0.39,
        density: 1050.0,
        yield_stress: Some(40.0e6),
    };

    /// PLA thermoplastic.
    pub const PLA: Material = Material {
        name: "pla",
        youngs_modulus: 3.5e9,
        poisson_ratio: 0.36,
        density: 1250.0,
        yield_stress: Some(50.0e6),
    };
}

impl Default for Material {
    fn default() -> Self {
        Material::ALUMINUM
    }
}

/// Lookup keys in declaration order. The first key contained in a query wins,
/// so this order must not change.
pub const MATERIAL_TABLE: [(&str, Material); 8] = [
    ("acier", Material::STEEL),
    ("steel", Material::STEEL),
    ("aluminium", Material::ALUMINUM),
    ("aluminum", Material::ALUMINUM),
    ("titane", Material::TITANIUM),
    ("titanium", Material::TITANIUM),
    ("abs", Material::ABS),
    ("pla", Material::PLA),
];

/// Resolve a free-text material name against [`MATERIAL_TABLE`].
///
/// Matching is a case-insensitive substring search; unknown names resolve to
/// aluminium. This never fails.
///
/// # Examples
/// ```
/// use topobrief::{lookup, Material};
///
/// assert_eq!(lookup("Acier inoxydable"), Material::STEEL);
/// assert_eq!(lookup("unknown-material-xyz"), Material::ALUMINUM);
/// ```
#[must_use]
pub fn lookup(name: &str) -> Material {
    let query = name.to_lowercase();
    MATERIAL_TABLE
        .iter()
        .find(|(key, _)| query.contains(key))
        .map_or_else(Material::default, |(_, material)| *material)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_french_and_english_names() {
        assert_eq!(lookup("Acier inoxydable"), Material::STEEL);
        assert_eq!(lookup("ACIER"), Material::STEEL);
        assert_eq!(lookup("Stainless steel 316"), Material::STEEL);
        assert_eq!(lookup("Titane grade 5"), Material::TITANIUM);
        assert_eq!(lookup("PLA+"), Material::PLA);
        assert_eq!(lookup("abs"), Material::ABS);
    }

    #[test]
    fn unknown_names_fall_back_to_aluminum() {
        assert_eq!(lookup("unknown-material-xyz"), Material::ALUMINUM);
        assert_eq!(lookup(""), Material::ALUMINUM);
    }

    #[test]
    fn first_declared_key_wins() {
        // Both "steel" and "aluminum" occur; "steel" is declared first.
        assert_eq!(lookup("aluminum-clad steel"), Material::STEEL);
        // "plaque" contains "pla", but "titane" is declared earlier.
        assert_eq!(lookup("plaque titane"), Material::TITANIUM);
    }

    #[test]
    fn every_entry_is_physical() {
        for (key, material) in MATERIAL_TABLE {
            assert!(material.youngs_modulus > 0.0, "{key}");
            assert!(material.poisson_ratio > 0.0 && material.poisson_ratio < 0.5, "{key}");
            assert!(material.density > 0.0, "{key}");
        }
    }
}
