//! Statistical spreading families: i.i.d. chips from a `rand_distr` law.

use rand::RngCore;
use rand_distr::{Distribution, Gumbel, Normal, StudentT};

use super::{Spreading, SpreadingFamily};
use crate::types::{CskError, CskResult};

/// Euler–Mascheroni constant
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

fn fill(chips: &mut [f64], law: &impl Distribution<f64>, rng: &mut dyn RngCore) {
    for chip in chips.iter_mut() {
        *chip = law.sample(&mut *rng);
    }
}

/// `[location]` or `[location, scale]`, scale defaulting to 1.
fn location_scale(
    family: SpreadingFamily,
    params: &[f64],
    default_location: f64,
) -> CskResult<(f64, f64)> {
    let (location, scale) = match params {
        [] => (default_location, 1.0),
        &[location] => (location, 1.0),
        &[location, scale] => (location, scale),
        _ => {
            return Err(CskError::parameter(
                family,
                format!("expected at most 2 parameters, got {}", params.len()),
            ))
        }
    };
    if !location.is_finite() {
        return Err(CskError::parameter(family, "location must be finite"));
    }
    if !(scale > 0.0 && scale.is_finite()) {
        return Err(CskError::parameter(
            family,
            format!("scale must be positive, got {scale}"),
        ));
    }
    Ok((location, scale))
}

/// Gaussian chips, `[mean, standard deviation]`.
#[derive(Debug, Clone)]
pub struct NormalSpreading {
    mean: f64,
    std_dev: f64,
    law: Normal<f64>,
}

impl NormalSpreading {
    pub fn new(params: &[f64]) -> CskResult<Self> {
        let family = SpreadingFamily::Normal;
        let (mean, std_dev) = location_scale(family, params, 0.0)?;
        let law = Normal::new(mean, std_dev).map_err(|e| CskError::parameter(family, e.to_string()))?;
        Ok(Self { mean, std_dev, law })
    }
}

impl Spreading for NormalSpreading {
    fn family(&self) -> SpreadingFamily {
        SpreadingFamily::Normal
    }

    fn params(&self) -> Vec<f64> {
        vec![self.mean, self.std_dev]
    }

    fn mean(&self) -> CskResult<f64> {
        Ok(self.mean)
    }

    fn variance(&self) -> CskResult<f64> {
        Ok(self.std_dev * self.std_dev)
    }

    fn generate_into(&self, chips: &mut [f64], rng: &mut dyn RngCore) -> CskResult<()> {
        fill(chips, &self.law, rng);
        Ok(())
    }
}

/// Gumbel (type I extreme value) chips, `[location, scale]`.
#[derive(Debug, Clone)]
pub struct GumbelSpreading {
    location: f64,
    scale: f64,
    law: Gumbel<f64>,
}

impl GumbelSpreading {
    pub fn new(params: &[f64]) -> CskResult<Self> {
        let family = SpreadingFamily::Gumbel;
        let (location, scale) = location_scale(family, params, 1.0)?;
        let law = Gumbel::new(location, scale).map_err(|e| CskError::parameter(family, e.to_string()))?;
        Ok(Self {
            location,
            scale,
            law,
        })
    }
}

impl Spreading for GumbelSpreading {
    fn family(&self) -> SpreadingFamily {
        SpreadingFamily::Gumbel
    }

    fn params(&self) -> Vec<f64> {
        vec![self.location, self.scale]
    }

    fn mean(&self) -> CskResult<f64> {
        Ok(self.location + EULER_GAMMA * self.scale)
    }

    fn variance(&self) -> CskResult<f64> {
        Ok(std::f64::consts::PI.powi(2) * self.scale.powi(2) / 6.0)
    }

    fn generate_into(&self, chips: &mut [f64], rng: &mut dyn RngCore) -> CskResult<()> {
        fill(chips, &self.law, rng);
        Ok(())
    }
}

/// Student's t chips, `[degrees of freedom]`.
#[derive(Debug, Clone)]
pub struct StudentSpreading {
    dof: f64,
    law: StudentT<f64>,
}

impl StudentSpreading {
    pub fn new(params: &[f64]) -> CskResult<Self> {
        let family = SpreadingFamily::Student;
        let dof = match params {
            [] => 1.0,
            &[dof] => dof,
            _ => {
                return Err(CskError::parameter(
                    family,
                    format!("expected 1 parameter, got {}", params.len()),
                ))
            }
        };
        if !(dof > 0.0 && dof.is_finite()) {
            return Err(CskError::parameter(
                family,
                format!("degrees of freedom must be positive, got {dof}"),
            ));
        }
        let law = StudentT::new(dof).map_err(|e| CskError::parameter(family, e.to_string()))?;
        Ok(Self { dof, law })
    }

    fn undefined(&self, moment: &'static str, bound: f64) -> CskError {
        CskError::UndefinedMoment {
            family: SpreadingFamily::Student.to_string(),
            moment,
            reason: format!("requires more than {bound} degrees of freedom, got {}", self.dof),
        }
    }
}

impl Spreading for StudentSpreading {
    fn family(&self) -> SpreadingFamily {
        SpreadingFamily::Student
    }

    fn params(&self) -> Vec<f64> {
        vec![self.dof]
    }

    fn mean(&self) -> CskResult<f64> {
        if self.dof <= 1.0 {
            return Err(self.undefined("mean", 1.0));
        }
        Ok(0.0)
    }

    fn variance(&self) -> CskResult<f64> {
        if self.dof <= 2.0 {
            return Err(self.undefined("variance", 2.0));
        }
        Ok(self.dof / (self.dof - 2.0))
    }

    fn generate_into(&self, chips: &mut [f64], rng: &mut dyn RngCore) -> CskResult<()> {
        fill(chips, &self.law, rng);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreading::test_util::{assert_moments, pooled};

    #[test]
    fn test_normal_params() {
        assert_eq!(NormalSpreading::new(&[]).unwrap().params(), vec![0.0, 1.0]);
        assert_eq!(NormalSpreading::new(&[2.0]).unwrap().params(), vec![2.0, 1.0]);
        assert!(NormalSpreading::new(&[0.0, 0.0]).is_err());
        assert!(NormalSpreading::new(&[0.0, -1.0]).is_err());
        assert!(NormalSpreading::new(&[0.0, 1.0, 2.0]).is_err());
    }

    #[test]
    fn test_gumbel_params() {
        let gumbel = GumbelSpreading::new(&[]).unwrap();
        assert_eq!(gumbel.params(), vec![1.0, 1.0]);
        assert!((gumbel.mean().unwrap() - 1.577_215_664_9).abs() < 1e-9);
        assert!((gumbel.variance().unwrap() - 1.644_934_066_8).abs() < 1e-9);
        assert!(GumbelSpreading::new(&[0.0, 0.0]).is_err());
    }

    #[test]
    fn test_student_moments() {
        let cauchy = StudentSpreading::new(&[]).unwrap();
        assert!(matches!(cauchy.mean(), Err(CskError::UndefinedMoment { moment: "mean", .. })));

        let t2 = StudentSpreading::new(&[2.0]).unwrap();
        assert_eq!(t2.mean().unwrap(), 0.0);
        assert!(matches!(t2.variance(), Err(CskError::UndefinedMoment { moment: "variance", .. })));

        let t4 = StudentSpreading::new(&[4.0]).unwrap();
        assert_eq!(t4.variance().unwrap(), 2.0);

        assert!(StudentSpreading::new(&[0.0]).is_err());
        assert!(StudentSpreading::new(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_moments_match_samples() {
        let normal = NormalSpreading::new(&[1.0, 2.0]).unwrap();
        assert_moments(&normal, &pooled(&normal, 1000, 10, 1), 0.1, 0.25);

        let gumbel = GumbelSpreading::new(&[]).unwrap();
        assert_moments(&gumbel, &pooled(&gumbel, 1000, 10, 2), 0.05, 0.15);

        let student = StudentSpreading::new(&[10.0]).unwrap();
        assert_moments(&student, &pooled(&student, 1000, 10, 3), 0.05, 0.1);
    }
}
