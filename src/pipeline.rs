//! Pipeline
//!
//! Fit a detector on a reference, check it on held-out data from the same
//! distribution, serialize it and package the deployment call. Every stage takes
//! its inputs explicitly and returns its outputs, so stages can be run in any
//! order the data dependencies allow.
use crate::data::Matrix;
use crate::deployment::{AuthConfig, DeploymentDescriptor, DeploymentRequest};
use crate::detector::{Detector, DetectorConfig, DetectorIO, DriftDetector, DriftResult};
use crate::errors::DriftError;
use log::{info, warn};

/// Detector configuration together with the deployment it will be shipped with.
#[derive(Clone, Debug)]
pub struct DriftPipeline {
    pub detector: DetectorConfig,
    pub deployment: DeploymentDescriptor,
}

/// Everything produced by [`DriftPipeline::run`].
#[derive(Debug)]
pub struct PipelineOutput {
    pub detector: Detector,
    /// Score of the held-out batch, when one was given.
    pub validation: Option<DriftResult>,
    /// Serialized detector artifact.
    pub artifact: String,
    pub request: DeploymentRequest,
}

impl DriftPipeline {
    pub fn new(detector: DetectorConfig, deployment: DeploymentDescriptor) -> Self {
        DriftPipeline { detector, deployment }
    }

    /// Fit the detector on the reference.
    pub fn fit(&self, reference: &Matrix<f64>) -> Result<Detector, DriftError> {
        Detector::fit(reference, &self.detector)
    }

    /// Score a held-out batch drawn from the reference distribution.
    ///
    /// Drift on such a batch usually means the reference is too small or the
    /// threshold too loose, so it is logged as a warning.
    pub fn validate(&self, detector: &Detector, holdout: &Matrix<f64>) -> Result<DriftResult, DriftError> {
        let result = detector.score(holdout)?;
        if result.is_drift() {
            warn!("Held-out batch from the reference distribution was flagged as drifted.");
        }
        Ok(result)
    }

    pub fn serialize(&self, detector: &Detector) -> Result<String, DriftError> {
        detector.json_dump()
    }

    pub fn package(&self, auth: &AuthConfig) -> Result<DeploymentRequest, DriftError> {
        auth.request(&self.deployment)
    }

    /// Run every stage.
    ///
    /// The deployment descriptor is validated before anything is fitted.
    pub fn run(
        &self,
        reference: &Matrix<f64>,
        holdout: Option<&Matrix<f64>>,
        auth: &AuthConfig,
    ) -> Result<PipelineOutput, DriftError> {
        self.deployment.validate()?;
        let detector = self.fit(reference)?;
        let validation = holdout.map(|h| self.validate(&detector, h)).transpose()?;
        let artifact = self.serialize(&detector)?;
        let request = self.package(auth)?;
        info!(
            "Packaged {:?} detector for deployment {} ({} bytes)",
            detector.method(),
            self.deployment.name,
            artifact.len()
        );
        Ok(PipelineOutput {
            detector,
            validation,
            artifact,
            request,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DenseMatrix;
    use crate::deployment::{DetectorServerSpec, ModelImplementation, ModelSpec};
    use crate::detector::DriftMethod;

    fn pipeline() -> DriftPipeline {
        let deployment = DeploymentDescriptor::new(
            "income",
            ModelSpec::new("income-model", "gs://models/income", ModelImplementation::SklearnServer),
        )
        .set_detector(Some(DetectorServerSpec::new("income-drift", "gs://models/income/drift.json", 50)));
        DriftPipeline::new(DetectorConfig::default().set_method(DriftMethod::Ks), deployment)
    }

    fn data(offset: usize) -> DenseMatrix {
        let rows: Vec<Vec<f64>> = (offset..offset + 60)
            .map(|i| vec![(i % 10) as f64, ((i * 7) % 13) as f64])
            .collect();
        DenseMatrix::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_run() {
        let auth = AuthConfig::new("https://deploy.example.com", "models", Some("token"));
        let reference = data(0);
        let holdout = data(0);
        let output = pipeline().run(&reference.view(), Some(&holdout.view()), &auth).unwrap();
        assert!(!output.validation.unwrap().is_drift());
        let restored = Detector::from_json(&output.artifact).unwrap();
        assert_eq!(restored, output.detector);
        assert_eq!(output.request.body["spec"]["driftDetector"]["name"], "income-drift");
    }

    #[test]
    fn test_invalid_deployment_fails_first() {
        let auth = AuthConfig::new("https://deploy.example.com", "models", None);
        let mut p = pipeline();
        p.deployment.name = "Income Model".to_string();
        let reference = data(0);
        let err = p.run(&reference.view(), None, &auth).unwrap_err();
        assert!(matches!(err, DriftError::InvalidParameter(..)));
    }
}
