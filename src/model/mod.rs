//! Background-model collaborator interface.
//!
//! The loader needs two things from the model layer: the anelastic and
//! anisotropic flags for the model named in the database (to validate the run
//! configuration), and the layer table of an externally supplied model when
//! the database names `"external"`. Physics lookups beyond that live in the
//! solver, not here.

use crate::error::AxipartError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Model name that triggers an external-model-file load.
pub const EXTERNAL_MODEL_NAME: &str = "external";

/// Fixed file name of the externally supplied model table.
pub const EXTERNAL_MODEL_FILE: &str = "external_model.bm";

/// Capability flags of a background model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFlags {
    pub anelastic: bool,
    pub anisotropic: bool,
}

/// One layer row of an external model table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExternalLayer {
    pub radius: f64,
    pub vp: f64,
    pub vs: f64,
    pub rho: f64,
    pub q_kappa: f64,
    pub q_mu: f64,
}

/// External model table, ordered as listed in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalModelTable {
    layers: Vec<ExternalLayer>,
}

impl ExternalModelTable {
    pub fn new(layers: Vec<ExternalLayer>) -> Self {
        Self { layers }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    #[inline]
    pub fn layers(&self) -> &[ExternalLayer] {
        &self.layers
    }
}

/// Resolved model metadata carried by a loaded partition.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelHandle {
    pub name: String,
    pub flags: ModelFlags,
    pub external: Option<ExternalModelTable>,
}

/// Catalog of background models known to the run.
pub trait ModelCatalog {
    /// Flags for a named model; unknown names are a configuration error.
    fn lookup(&self, name: &str) -> Result<ModelFlags, AxipartError>;

    /// Load and parse an external model table.
    ///
    /// A missing table is a configuration error, not database corruption:
    /// the `.bm` file is run input supplied by the user, unlike the
    /// mesher-generated database.
    fn load_external(&self, path: &Path) -> Result<ExternalModelTable, AxipartError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| AxipartError::ExternalModelParse {
                path: path.to_path_buf(),
                line: 0,
                reason: source.to_string(),
            })?;
        parse_bm(path, &contents)
    }
}

/// Parse the whitespace-column `.bm` layer format.
///
/// Columns per line: radius vp vs rho q_kappa q_mu. Blank lines and `#`
/// comments are skipped.
pub fn parse_bm(path: &Path, contents: &str) -> Result<ExternalModelTable, AxipartError> {
    let mut layers = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<f64> = line
            .split_whitespace()
            .map(|tok| tok.parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| AxipartError::ExternalModelParse {
                path: path.to_path_buf(),
                line: lineno + 1,
                reason: e.to_string(),
            })?;
        if fields.len() != 6 {
            return Err(AxipartError::ExternalModelParse {
                path: path.to_path_buf(),
                line: lineno + 1,
                reason: format!("expected 6 columns, found {}", fields.len()),
            });
        }
        layers.push(ExternalLayer {
            radius: fields[0],
            vp: fields[1],
            vs: fields[2],
            rho: fields[3],
            q_kappa: fields[4],
            q_mu: fields[5],
        });
    }
    if layers.is_empty() {
        return Err(AxipartError::ExternalModelParse {
            path: path.to_path_buf(),
            line: 0,
            reason: "no layer rows".into(),
        });
    }
    log::debug!("external model: {} layers from {}", layers.len(), path.display());
    Ok(ExternalModelTable::new(layers))
}

/// Catalog of the bundled reference models.
#[derive(Debug, Default, Clone)]
pub struct BuiltinCatalog;

impl ModelCatalog for BuiltinCatalog {
    fn lookup(&self, name: &str) -> Result<ModelFlags, AxipartError> {
        match name {
            "prem_iso" | "prem_solid" | "iasp91" | "ak135" => Ok(ModelFlags {
                anelastic: true,
                anisotropic: false,
            }),
            "prem_ani" => Ok(ModelFlags {
                anelastic: true,
                anisotropic: true,
            }),
            "prem_elastic" | "homogeneous" => Ok(ModelFlags {
                anelastic: false,
                anisotropic: false,
            }),
            // External tables carry Q columns, so attenuation is available.
            EXTERNAL_MODEL_NAME => Ok(ModelFlags {
                anelastic: true,
                anisotropic: false,
            }),
            _ => Err(AxipartError::UnknownModel { name: name.into() }),
        }
    }
}
