//! # Direct-Burial Footing Depth
//!
//! Embedment depth of a drilled cylindrical footing for a sign pole from the
//! overturning moment, the footing diameter and the allowable soil bearing.
//!
//! ## Method
//!
//! ```text
//! M_ps     = M / poles
//! depth_ft = K · M_ps / (d³ · q_soil / 1000)
//! depth_in = max(min_depth_in, 12 · depth_ft)
//! ```
//!
//! `K` is the versioned `K_FACTOR` calibration constant. Above the minimum
//! depth the result is strictly decreasing in diameter, strictly increasing in
//! moment, and splitting the moment over more poles strictly reduces it.
//!
//! ## Constraints
//!
//! - `max_foundation_dia_ft`: a larger requested diameter is capped and the
//!   depth recomputed at the cap, then increased by 25 %.
//! - `max_embed_in`: never shortens the footing. Exceeding it flags the
//!   design for engineering review.
//! - Soil capacity: a per-support moment above `q_soil · πd²/4 · d / 12 / 1000`
//!   (see [`max_resisting_moment_kipft`]) is flagged for engineering review.
//!   The depth is still reported.
//!
//! ## Example
//!
//! ```rust
//! use signcalc_core::calibration::CalibrationStore;
//! use signcalc_core::calculations::footing::{footing_solve, FootingInput};
//! use signcalc_core::context::SolveContext;
//! use signcalc_core::settings::DesignSettings;
//! use signcalc_core::versioning::SolverRegistry;
//!
//! let (store, settings, registry) =
//!     (CalibrationStore::with_defaults(), DesignSettings::default(), SolverRegistry::with_defaults());
//! let ctx = SolveContext::new(&store, &settings, &registry);
//!
//! let small = footing_solve(&ctx, &FootingInput::new(2.0, 10.0, 3000.0, 1)).unwrap();
//! let large = footing_solve(&ctx, &FootingInput::new(4.0, 10.0, 3000.0, 1)).unwrap();
//! assert!(small.result.depth_in > large.result.depth_in);
//! assert!(large.result.depth_in >= 36.0);
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{quantize, Normalize};
use crate::calibration::names;
use crate::context::SolveContext;
use crate::envelope::SolverOutput;
use crate::errors::{require_positive, CalcError, CalcResult};
use crate::units::{Feet, Inches, FT3_PER_YD3};
use crate::versioning::solvers;

/// Multiplier applied when the diameter is capped
pub const CAPPED_DIAMETER_FACTOR: f64 = 1.25;

/// Footing shape. Only drilled cylinders are sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoundationShape {
    Cylinder,
}

/// Optional site limits.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FootingConstraints {
    pub max_foundation_dia_ft: Option<f64>,
    pub max_embed_in: Option<f64>,
}

/// Input for [`footing_solve`].
///
/// ## JSON Example
///
/// ```json
/// { "diameter_ft": 3.0, "moment_kipft": 63.0, "soil_psf": 3000.0, "poles": 1 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootingInput {
    pub diameter_ft: f64,
    /// Total overturning moment, kip-ft
    pub moment_kipft: f64,
    /// Allowable soil bearing pressure, psf
    pub soil_psf: f64,
    pub poles: u32,
    #[serde(default)]
    pub constraints: FootingConstraints,
}

impl FootingInput {
    pub fn new(diameter_ft: f64, moment_kipft: f64, soil_psf: f64, poles: u32) -> Self {
        FootingInput {
            diameter_ft,
            moment_kipft,
            soil_psf,
            poles,
            constraints: FootingConstraints::default(),
        }
    }

    pub fn validate(&self) -> CalcResult<()> {
        require_positive("diameter_ft", self.diameter_ft, "Diameter must be positive")?;
        require_positive("moment_kipft", self.moment_kipft, "Moment must be positive")?;
        require_positive("soil_psf", self.soil_psf, "Soil bearing must be positive")?;
        if self.poles == 0 {
            return Err(CalcError::invalid_input("poles", "0", "At least one pole is required"));
        }
        if let Some(max_dia) = self.constraints.max_foundation_dia_ft {
            require_positive(
                "constraints.max_foundation_dia_ft",
                max_dia,
                "Maximum diameter must be positive",
            )?;
        }
        if let Some(max_embed) = self.constraints.max_embed_in {
            require_positive(
                "constraints.max_embed_in",
                max_embed,
                "Maximum embedment must be positive",
            )?;
        }
        Ok(())
    }
}

impl Normalize for FootingInput {
    fn normalized(&self, digits: u32) -> Self {
        FootingInput {
            diameter_ft: quantize(self.diameter_ft, digits),
            moment_kipft: quantize(self.moment_kipft, digits),
            soil_psf: quantize(self.soil_psf, digits),
            poles: self.poles,
            constraints: FootingConstraints {
                max_foundation_dia_ft: self.constraints.max_foundation_dia_ft.map(|v| quantize(v, digits)),
                max_embed_in: self.constraints.max_embed_in.map(|v| quantize(v, digits)),
            },
        }
    }
}

/// Sized footing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Foundation {
    pub shape: FoundationShape,
    /// Diameter actually used (after any cap)
    pub diameter_ft: f64,
    pub depth_in: f64,
    pub depth_ft: f64,
    pub per_support_moment_kipft: f64,
    /// Concrete per footing
    pub concrete_yd3: f64,
    pub diameter_capped: bool,
    pub request_engineering: bool,
}

/// Raw embedment depth in feet before the minimum is applied.
pub fn embedment_depth_ft(k_factor: f64, moment_kipft: f64, diameter_ft: f64, soil_psf: f64) -> f64 {
    k_factor * moment_kipft / (diameter_ft.powi(3) * soil_psf / 1000.0)
}

/// Largest moment the soil under a footing of this diameter can resist, kip-ft.
pub fn max_resisting_moment_kipft(diameter_ft: f64, soil_psf: f64) -> f64 {
    soil_psf * (PI * diameter_ft * diameter_ft / 4.0) * diameter_ft / 12.0 / 1000.0
}

/// Size a direct-burial footing.
pub fn footing_solve(ctx: &SolveContext, input: &FootingInput) -> CalcResult<SolverOutput<Foundation>> {
    input.validate()?;
    let settings = ctx.settings;
    let version = settings.versions.footing.as_str();
    let k = ctx.store.value(names::K_FACTOR, version)?;

    let per_support = input.moment_kipft / input.poles as f64;
    let mut assumptions = vec![format!("Embedment K = {} ({})", k, version)];
    if input.poles > 1 {
        assumptions.push(format!(
            "Moment split evenly over {} poles: {:.2} kip-ft each",
            input.poles, per_support
        ));
    }

    let mut diameter_ft = input.diameter_ft;
    let mut diameter_capped = false;
    if let Some(max_dia) = input.constraints.max_foundation_dia_ft {
        if diameter_ft > max_dia {
            diameter_ft = max_dia;
            diameter_capped = true;
            assumptions.push(format!(
                "Diameter capped at {:.2} ft; depth increased {:.0}%",
                max_dia,
                (CAPPED_DIAMETER_FACTOR - 1.0) * 100.0
            ));
        }
    }

    let mut raw_ft = embedment_depth_ft(k, per_support, diameter_ft, input.soil_psf);
    if diameter_capped {
        raw_ft *= CAPPED_DIAMETER_FACTOR;
    }
    let raw_in: Inches = Feet(raw_ft).into();
    let depth_in = raw_in.value().max(settings.min_footing_depth_in);
    if raw_in.value() < settings.min_footing_depth_in {
        assumptions.push(format!(
            "Minimum embedment {:.0} in governs",
            settings.min_footing_depth_in
        ));
    }
    let depth_ft = Feet::from(Inches(depth_in)).value();

    let mut request_engineering = false;
    let max_resisting = max_resisting_moment_kipft(diameter_ft, input.soil_psf);
    if per_support > max_resisting {
        request_engineering = true;
        warn!(
            per_support_moment_kipft = per_support,
            max_resisting_kipft = max_resisting,
            diameter_ft,
            soil_psf = input.soil_psf,
            "footing.moment_exceeds_soil_capacity"
        );
        assumptions.push(format!(
            "Request engineering review: moment {:.1} kip-ft exceeds soil resisting capacity {:.1} kip-ft \
             for {:.1} ft diameter and {:.0} psf soil",
            per_support, max_resisting, diameter_ft, input.soil_psf
        ));
    }
    if depth_ft > settings.max_footing_depth_ft {
        request_engineering = true;
        warn!(depth_ft, max_ft = settings.max_footing_depth_ft, "footing.depth_exceeds_max");
        assumptions.push(format!(
            "Request engineering review: footing depth {:.1} ft exceeds {:.1} ft",
            depth_ft, settings.max_footing_depth_ft
        ));
    }
    if let Some(max_embed) = input.constraints.max_embed_in {
        if depth_in > max_embed {
            request_engineering = true;
            warn!(depth_in, max_embed_in = max_embed, "footing.embed_exceeds_limit");
            assumptions.push(format!(
                "Request engineering review: required embedment {:.1} in exceeds site limit {:.1} in",
                depth_in, max_embed
            ));
        }
    }

    let concrete_yd3 = PI * diameter_ft * diameter_ft / 4.0 * depth_ft / FT3_PER_YD3;
    debug!(
        diameter_ft,
        depth_in,
        per_support_moment_kipft = per_support,
        poles = input.poles,
        "footing.solve"
    );

    let foundation = Foundation {
        shape: FoundationShape::Cylinder,
        diameter_ft,
        depth_in,
        depth_ft,
        per_support_moment_kipft: per_support,
        concrete_yd3,
        diameter_capped,
        request_engineering,
    };
    Ok(ctx.output(solvers::FOOTING_SOLVE, foundation, assumptions))
}
