//! Producing the brief text that extraction consumes.
//!
//! A brief is either written by a language-model collaborator from a free-form
//! description, or rendered from a small form with a fixed template.

use std::fmt::Write;

use crate::errors::BriefError;
use crate::extract::extract;
use crate::parameters::OptimizationParameters;

/// Instructions given to the brief author. `{description}` is replaced by the
/// user's description of the part.
pub const BRIEF_PROMPT_TEMPLATE: &str = r#"Tu es un expert en ingénierie mécanique et optimisation topologique.

Génère un brief d'optimisation topologique détaillé et technique basé sur cette description :
"{description}"

Le brief doit être au format Markdown avec EXACTEMENT ces 7 sections :

## 1. Contexte
[Expliquer le contexte d'utilisation de la pièce]

## 2. Géométrie
**Forme** : Cylinder | Box | Sphere (choisir la plus appropriée)
**Dimensions** : [dimensions en mm] (format: LxWxH ou Diamètre x Hauteur)
**Volume initial** : [calculer en mm³]

## 3. Matériau
**Type** : [Acier | Aluminium | Titane | ABS | PLA - choisir le plus approprié]
**Module de Young (E)** : [valeur en GPa]
**Coefficient de Poisson (ν)** : [valeur entre 0.2 et 0.4]
**Limite élastique (σ_ys)** : [valeur en MPa]
**Densité** : [valeur en kg/m³]

## 4. Conditions Limites
**Fixation** : [Bottom | Top | Side - spécifier où]
**Type** : Encastrement complet
**Position** : [coordonnée z ou description]

## 5. Chargements
**Force** : [valeur en N]
**Direction** : [+Z | -Z | +X | -X | +Y | -Y]
**Position** : [où s'applique la force]
**Type** : Force distribuée

## 6. Contraintes
**Volume maximal** : [30-50]% du volume initial (recommandé: 40%)
**Facteur de sécurité** : [1.5-3.0] (recommandé: 2.0)
**Contrainte maximale admissible** : [calculer = σ_ys / facteur de sécurité en MPa]

## 7. Paramètres d'Optimisation
**Résolution** : 25 voxels (défaut)
**Pénalité SIMP** : 3.0 (défaut)
**Nombre d'itérations** : 40 (défaut)
**Critère de convergence** : 0.01

---

IMPORTANT :
- Utilise des valeurs réalistes et cohérentes
- Les dimensions doivent être adaptées à l'application
- Le matériau doit être approprié (ex: aluminium pour aéronautique, acier pour structure lourde)
- Calcule correctement les volumes et contraintes
- Sois précis avec les unités (GPa, MPa, mm, N)"#;

/// Request handed to a [`BriefAuthor`].
#[derive(Clone, Debug)]
pub struct BriefRequest<'a> {
    /// Full prompt with the description substituted.
    pub prompt: &'a str,
    /// The user's description on its own.
    pub description: &'a str,
}

/// Collaborator that writes a brief, typically a language model.
pub trait BriefAuthor {
    /// Write the brief text for `request`.
    fn write_brief(&mut self, request: BriefRequest<'_>) -> Result<String, String>;
}

/// Brief text together with the parameters extracted from it.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedBrief {
    /// Markdown brief.
    pub text: String,
    /// Parameters extracted from `text`.
    pub parameters: OptimizationParameters,
}

impl PreparedBrief {
    /// Extract parameters from an existing brief.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let parameters = extract(&text);
        Self { text, parameters }
    }
}

/// Form fields for a brief written without a language model.
///
/// Blank fields take the form defaults: Cylinder, `100x100x20`, Acier, 1000 N.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ManualBrief {
    /// Shape tag.
    pub shape: Option<String>,
    /// Dimensions as typed, e.g. `80x60x20`.
    pub dimensions: Option<String>,
    /// Material name.
    pub material: Option<String>,
    /// Force in newtons as typed.
    pub force: Option<String>,
}

/// Value of an optional form field, or `default` when blank.
fn field_or<'a>(value: Option<&'a String>, default: &'a str) -> &'a str {
    value
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
}

impl ManualBrief {
    /// Render the form as a labelled-field brief.
    ///
    /// # Examples
    /// ```
    /// use topobrief::{extract, ManualBrief, Material};
    ///
    /// let form = ManualBrief {
    ///     material: Some("Titane".into()),
    ///     ..ManualBrief::default()
    /// };
    /// let params = extract(&form.render());
    /// assert_eq!(params.material.name, "Titane");
    /// assert_eq!(params.material.density, Material::TITANIUM.density);
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        let mut brief = String::new();
        let shape = field_or(self.shape.as_ref(), "Cylinder");
        let dimensions = field_or(self.dimensions.as_ref(), "100x100x20");
        let material = field_or(self.material.as_ref(), "Acier");
        let force = field_or(self.force.as_ref(), "1000");

        brief.push_str("# Brief d'Optimisation Topologique (Manuel)\n\n");
        brief.push_str("## 1. Contexte\nBrief créé manuellement via le formulaire\n\n");
        writeln!(brief, "## 2. Géométrie\n**Forme** : {shape}\n**Dimensions** : {dimensions} mm\n")
            .expect("writing to string cannot fail");
        writeln!(
            brief,
            "## 3. Matériau\n**Type** : {material}\n**Module de Young (E)** : 210 GPa\n\
             **Coefficient de Poisson (ν)** : 0.3\n"
        )
        .expect("writing to string cannot fail");
        brief.push_str("## 4. Conditions Limites\n**Fixation** : Face inférieure\n\n");
        writeln!(brief, "## 5. Chargements\n**Force** : {force} N\n**Direction** : -Z\n")
            .expect("writing to string cannot fail");
        brief.push_str(
            "## 6. Contraintes\n**Volume maximal** : 40%\n**Facteur de sécurité** : 2.0\n\n",
        );
        brief.push_str(
            "## 7. Paramètres d'Optimisation\n**Résolution** : 25\n**Pénalité SIMP** : 3.0\n\
             **Itérations** : 40\n\n",
        );
        brief.push_str("---\n\n*Brief créé manuellement*\n");
        brief
    }

    /// Render and extract the form.
    #[must_use]
    pub fn prepare(&self) -> PreparedBrief {
        PreparedBrief::from_text(self.render())
    }
}

/// Have `author` write a brief for `description` and extract it.
///
/// # Errors
///
/// Returns [`BriefError::Author`] when the author fails or returns only
/// whitespace.
pub fn prepare_authored_brief<A: BriefAuthor>(
    author: &mut A,
    description: &str,
) -> Result<PreparedBrief, BriefError> {
    let prompt = BRIEF_PROMPT_TEMPLATE.replace("{description}", description);
    let text = author
        .write_brief(BriefRequest {
            prompt: &prompt,
            description,
        })
        .map_err(BriefError::Author)?;
    if text.trim().is_empty() {
        return Err(BriefError::Author("empty brief".to_string()));
    }
    Ok(PreparedBrief::from_text(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Shape;
    use crate::material::Material;

    struct ScriptedAuthor {
        reply: Result<String, String>,
        prompts: Vec<String>,
    }

    impl BriefAuthor for ScriptedAuthor {
        fn write_brief(&mut self, request: BriefRequest<'_>) -> Result<String, String> {
            self.prompts.push(request.prompt.to_string());
            self.reply.clone()
        }
    }

    #[test]
    fn blank_form_renders_steel_cylinder() {
        let prepared = ManualBrief::default().prepare();
        let params = &prepared.parameters;
        assert_eq!(params.geometry.shape, Shape::Cylinder);
        assert_eq!(params.geometry.dimensions, vec![100.0, 100.0, 20.0]);
        assert_eq!(params.material.name, "Acier");
        assert_eq!(params.material.density, Material::STEEL.density);
        assert_eq!(params.loads.magnitude, 1000.0);
        assert_eq!(params.optimization.iterations, 40);
        assert!(prepared.text.contains("*Brief créé manuellement*"));
    }

    #[test]
    fn form_fields_flow_into_parameters() {
        let form = ManualBrief {
            shape: Some("Box".into()),
            dimensions: Some("80x60x20".into()),
            material: Some("  ".into()),
            force: Some("250".into()),
        };
        let params = form.prepare().parameters;
        assert_eq!(params.geometry.shape, Shape::Box);
        assert_eq!(params.geometry.volume, 96_000.0);
        assert_eq!(params.material.name, "Acier");
        assert_eq!(params.loads.magnitude, 250.0);
    }

    #[test]
    fn author_receives_description_in_prompt() {
        let mut author = ScriptedAuthor {
            reply: Ok("**Forme** : Box\n**Force** : 300 N".into()),
            prompts: Vec::new(),
        };
        let prepared =
            prepare_authored_brief(&mut author, "support moteur de drone").expect("brief written");
        assert_eq!(prepared.parameters.loads.magnitude, 300.0);
        assert_eq!(author.prompts.len(), 1);
        assert!(author.prompts[0].contains("\"support moteur de drone\""));
        assert!(!author.prompts[0].contains("{description}"));
    }

    #[test]
    fn author_failures_are_surfaced() {
        let mut failing = ScriptedAuthor {
            reply: Err("quota exceeded".into()),
            prompts: Vec::new(),
        };
        assert_eq!(
            prepare_authored_brief(&mut failing, "bracket"),
            Err(BriefError::Author("quota exceeded".into()))
        );

        let mut silent = ScriptedAuthor {
            reply: Ok("   \n".into()),
            prompts: Vec::new(),
        };
        assert_eq!(
            prepare_authored_brief(&mut silent, "bracket"),
            Err(BriefError::Author("empty brief".into()))
        );
    }
}
