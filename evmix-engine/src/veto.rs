//! Invariant mass rejection of mixed candidates.

use std::ops::Add;

use evmix_schema::{Row, Schema, SchemaError};

use crate::config::{ParticleColumns, VetoConfig};

#[derive(Debug, Copy, Clone, Default, PartialEq)]
/// A Lorentz four vector in cartesian components.
pub struct FourVector {
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub e: f64,
}

impl FourVector {
    /// Builds a four vector from collider coordinates.
    ///
    /// The sign of `pt` is ignored, some producers encode the charge in it.
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        let pt = pt.abs();
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        let e = (px * px + py * py + pz * pz + mass * mass).sqrt();
        Self { px, py, pz, e }
    }

    #[inline]
    /// The invariant mass, clamped to zero for space-like vectors.
    pub fn mass(&self) -> f64 {
        let p2 = self.px * self.px + self.py * self.py + self.pz * self.pz;
        (self.e * self.e - p2).max(0.0).sqrt()
    }
}

impl Add for FourVector {
    type Output = FourVector;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            px: self.px + rhs.px,
            py: self.py + rhs.py,
            pz: self.pz + rhs.pz,
            e: self.e + rhs.e,
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct ParticleSlots {
    pt: usize,
    eta: usize,
    phi: usize,
    mass: f64,
}

impl ParticleSlots {
    fn resolve(columns: &ParticleColumns, schema: &Schema) -> Result<Self, SchemaError> {
        Ok(Self {
            pt: schema.numeric_index_of(&columns.pt)?,
            eta: schema.numeric_index_of(&columns.eta)?,
            phi: schema.numeric_index_of(&columns.phi)?,
            mass: columns.mass,
        })
    }

    fn four_vector(&self, row: &Row) -> Result<FourVector, SchemaError> {
        Ok(FourVector::from_pt_eta_phi_m(
            row.f64_at(self.pt)?,
            row.f64_at(self.eta)?,
            row.f64_at(self.phi)?,
            self.mass,
        ))
    }
}

#[derive(Debug, Clone)]
/// A veto rejecting pairs whose two particle invariant mass exceeds a
/// threshold.
///
/// The first particle is built from the current row and the second from
/// its window partner, both rows share the input schema. Column positions
/// are resolved once against that schema.
pub struct InvariantMassVeto {
    first: ParticleSlots,
    second: ParticleSlots,
    max_invariant_mass: f64,
}

impl InvariantMassVeto {
    /// Resolves the veto columns, returning `None` if the veto is disabled.
    pub fn resolve(config: &VetoConfig, schema: &Schema) -> Result<Option<Self>, SchemaError> {
        if !config.enabled {
            return Ok(None);
        }

        Ok(Some(Self {
            first: ParticleSlots::resolve(&config.first, schema)?,
            second: ParticleSlots::resolve(&config.second, schema)?,
            max_invariant_mass: config.max_invariant_mass,
        }))
    }

    #[inline]
    pub fn max_invariant_mass(&self) -> f64 {
        self.max_invariant_mass
    }

    /// Computes the invariant mass of the first particle of `current` and
    /// the second particle of `partner`.
    pub fn invariant_mass(&self, current: &Row, partner: &Row) -> Result<f64, SchemaError> {
        let first = self.first.four_vector(current)?;
        let second = self.second.four_vector(partner)?;
        Ok((first + second).mass())
    }

    #[inline]
    /// Returns if the pair must be dropped.
    pub fn rejects(&self, current: &Row, partner: &Row) -> Result<bool, SchemaError> {
        Ok(self.invariant_mass(current, partner)? > self.max_invariant_mass)
    }
}
