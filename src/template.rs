//! Blueprint templates.
//!
//! A template is a named, versioned list of construction phases, each an
//! ordered list of piece specs with offsets relative to the build anchor.
//! Templates are immutable reference data: loaded once at startup from
//! TOML files (or the compiled-in defaults) and only read afterwards.

use crate::types::{ShapeKind, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// One piece of a template phase, positioned relative to the anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceSpec {
    pub shape: ShapeKind,
    /// Offset from the anchor. The y component is an absolute height above
    /// the ground plane; orientation never changes it.
    pub offset: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    pub scale: Vec3,
    pub color: String,
}

/// An ordered group of pieces built together, labeled for progress
/// reporting ("foundation", "walls", ...). Phases drive labeling only,
/// never control flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatePhase {
    pub label: String,
    pub pieces: Vec<PieceSpec>,
}

/// A named construction recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintTemplate {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub phases: Vec<TemplatePhase>,
}

fn default_version() -> u32 {
    1
}

impl BlueprintTemplate {
    /// Total piece count across all phases.
    pub fn piece_count(&self) -> usize {
        self.phases.iter().map(|p| p.pieces.len()).sum()
    }

    /// Structural validation applied at load time.
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::Invalid("template name is empty".to_string()));
        }
        if self.phases.is_empty() {
            return Err(TemplateError::Invalid(format!(
                "template '{}' has no phases",
                self.name
            )));
        }
        for phase in &self.phases {
            if phase.pieces.is_empty() {
                return Err(TemplateError::Invalid(format!(
                    "template '{}' phase '{}' has no pieces",
                    self.name, phase.label
                )));
            }
            for piece in &phase.pieces {
                if piece.scale.x <= 0.0 || piece.scale.y <= 0.0 || piece.scale.z <= 0.0 {
                    return Err(TemplateError::Invalid(format!(
                        "template '{}' phase '{}': non-positive scale on a {} piece",
                        self.name, phase.label, piece.shape
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Template loading errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid template: {0}")]
    Invalid(String),
}

/// The loaded template set, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: BTreeMap<String, BlueprintTemplate>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled-in template set. Used by tests, the offline checker,
    /// and deployments that ship without a template directory.
    pub fn builtin() -> Self {
        let mut lib = Self::new();
        for template in [builtin_obelisk(), builtin_cabin(), builtin_colonnade()] {
            lib.insert(template);
        }
        lib
    }

    /// Load every `*.toml` file in a directory. File order does not matter;
    /// templates are keyed by their declared name, last write wins.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, TemplateError> {
        let mut lib = Self::new();
        let mut entries: Vec<_> = std::fs::read_dir(dir.as_ref())?
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|e| e.path());
        for entry in entries {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }
            let raw = std::fs::read_to_string(&path)?;
            let template: BlueprintTemplate =
                toml::from_str(&raw).map_err(|e| TemplateError::Parse {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            template.validate()?;
            lib.insert(template);
        }
        Ok(lib)
    }

    pub fn insert(&mut self, template: BlueprintTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    pub fn get(&self, name: &str) -> Option<&BlueprintTemplate> {
        self.templates.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlueprintTemplate> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn piece(shape: ShapeKind, offset: (f32, f32, f32), scale: (f32, f32, f32), color: &str) -> PieceSpec {
    PieceSpec {
        shape,
        offset: Vec3::new(offset.0, offset.1, offset.2),
        rotation: Vec3::default(),
        scale: Vec3::new(scale.0, scale.1, scale.2),
        color: color.to_string(),
    }
}

/// Four-piece vertical marker: a squat base with a tapering shaft stacked
/// on top. Each piece's bottom face lands exactly on the previous top.
fn builtin_obelisk() -> BlueprintTemplate {
    BlueprintTemplate {
        name: "obelisk".to_string(),
        version: 1,
        phases: vec![
            TemplatePhase {
                label: "foundation".to_string(),
                pieces: vec![piece(ShapeKind::Box, (0.0, 0.15, 0.0), (0.8, 0.3, 0.8), "#9aa0a6")],
            },
            TemplatePhase {
                label: "shaft".to_string(),
                pieces: vec![
                    piece(ShapeKind::Cylinder, (0.0, 0.55, 0.0), (0.4, 0.5, 0.4), "#bdc1c6"),
                    piece(ShapeKind::Cylinder, (0.0, 1.05, 0.0), (0.3, 0.5, 0.3), "#bdc1c6"),
                    piece(ShapeKind::Pyramid, (0.0, 1.45, 0.0), (0.3, 0.3, 0.3), "#fbbc04"),
                ],
            },
        ],
    }
}

/// Small hut: slab foundation, four walls resting on it, pyramid roof on
/// the wall tops, and an exempt door decal.
fn builtin_cabin() -> BlueprintTemplate {
    BlueprintTemplate {
        name: "cabin".to_string(),
        version: 2,
        phases: vec![
            TemplatePhase {
                label: "foundation".to_string(),
                pieces: vec![piece(ShapeKind::Box, (0.0, 0.1, 0.0), (3.0, 0.2, 3.0), "#8d6e63")],
            },
            TemplatePhase {
                label: "walls".to_string(),
                pieces: vec![
                    piece(ShapeKind::Box, (0.0, 0.7, -1.45), (3.0, 1.0, 0.1), "#a1887f"),
                    piece(ShapeKind::Box, (0.0, 0.7, 1.45), (3.0, 1.0, 0.1), "#a1887f"),
                    piece(ShapeKind::Box, (-1.45, 0.7, 0.0), (0.1, 1.0, 2.8), "#a1887f"),
                    piece(ShapeKind::Box, (1.45, 0.7, 0.0), (0.1, 1.0, 2.8), "#a1887f"),
                ],
            },
            TemplatePhase {
                label: "roof".to_string(),
                pieces: vec![piece(ShapeKind::Pyramid, (0.0, 1.7, 0.0), (3.2, 1.0, 3.2), "#6d4c41")],
            },
            TemplatePhase {
                label: "door".to_string(),
                pieces: vec![piece(ShapeKind::Decal, (0.0, 0.6, 1.51), (0.6, 0.8, 0.02), "#3e2723")],
            },
        ],
    }
}

/// Three columns carrying a single beam.
fn builtin_colonnade() -> BlueprintTemplate {
    BlueprintTemplate {
        name: "colonnade".to_string(),
        version: 1,
        phases: vec![
            TemplatePhase {
                label: "columns".to_string(),
                pieces: vec![
                    piece(ShapeKind::Column, (-1.2, 0.6, 0.0), (0.3, 1.2, 0.3), "#e8eaed"),
                    piece(ShapeKind::Column, (0.0, 0.6, 0.0), (0.3, 1.2, 0.3), "#e8eaed"),
                    piece(ShapeKind::Column, (1.2, 0.6, 0.0), (0.3, 1.2, 0.3), "#e8eaed"),
                ],
            },
            TemplatePhase {
                label: "beam".to_string(),
                pieces: vec![piece(ShapeKind::Beam, (0.0, 1.3, 0.0), (3.0, 0.2, 0.3), "#dadce0")],
            },
        ],
    }
}
