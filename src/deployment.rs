//! Deployment
//!
//! Typed descriptors for shipping a model together with its drift detector to a
//! model-serving platform. Descriptors are validated before they are turned into
//! the platform's JSON manifest. Credentials and endpoint live in an explicit
//! [`AuthConfig`] passed to [`AuthConfig::request`]; nothing is kept globally.
use crate::constants::ARTIFACT_FORMAT_VERSION;
use crate::errors::DriftError;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const MANIFEST_API_VERSION: &str = "machinelearning.seldon.io/v1";
const MAX_NAME_LEN: usize = 63;

/// Prepackaged model server used to run the model.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum ModelImplementation {
    TensorflowServer,
    SklearnServer,
    XgboostServer,
    TritonServer,
}

impl ModelImplementation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelImplementation::TensorflowServer => "TENSORFLOW_SERVER",
            ModelImplementation::SklearnServer => "SKLEARN_SERVER",
            ModelImplementation::XgboostServer => "XGBOOST_SERVER",
            ModelImplementation::TritonServer => "TRITON_SERVER",
        }
    }
}

/// The model to serve.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ModelSpec {
    pub name: String,
    /// Storage location of the trained model, e.g. `gs://bucket/model`.
    pub model_uri: String,
    pub implementation: ModelImplementation,
    pub replicas: usize,
}

/// The drift detector served next to the model.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct DetectorServerSpec {
    pub name: String,
    /// Storage location of the detector artifact.
    pub artifact_uri: String,
    /// Number of requests accumulated before a batch is scored.
    pub batch_size: usize,
}

/// A model deployment with an optional drift detector.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct DeploymentDescriptor {
    pub name: String,
    pub model: ModelSpec,
    pub detector: Option<DetectorServerSpec>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// Endpoint and credentials of the serving platform.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct AuthConfig {
    /// Base url of the deployment API.
    pub endpoint: String,
    pub namespace: String,
    pub token: Option<String>,
}

/// A fully built deployment call, ready to hand to an HTTP client.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct DeploymentRequest {
    pub method: String,
    pub url: String,
    pub bearer_token: Option<String>,
    pub body: Value,
}

fn invalid(field: &str, expected: &str, value: &str) -> DriftError {
    DriftError::InvalidParameter(field.to_string(), expected.to_string(), value.to_string())
}

/// Lowercase alphanumerics and '-', starting and ending with an alphanumeric.
pub fn validate_name(name: &str, field: &str) -> Result<(), DriftError> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid_ends = !name.starts_with('-') && !name.ends_with('-');
    if name.is_empty() || name.len() > MAX_NAME_LEN || !valid_chars || !valid_ends {
        return Err(invalid(
            field,
            "lowercase alphanumeric name of at most 63 characters",
            name,
        ));
    }
    Ok(())
}

fn validate_uri(uri: &str, field: &str) -> Result<(), DriftError> {
    match uri.split_once("://") {
        Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => Ok(()),
        _ => Err(invalid(field, "uri of the form scheme://location", uri)),
    }
}

fn validate_count(value: usize, field: &str) -> Result<(), DriftError> {
    if value == 0 {
        return Err(invalid(field, "positive integer", "0"));
    }
    Ok(())
}

impl ModelSpec {
    pub fn new(name: &str, model_uri: &str, implementation: ModelImplementation) -> Self {
        ModelSpec {
            name: name.to_string(),
            model_uri: model_uri.to_string(),
            implementation,
            replicas: 1,
        }
    }

    pub fn validate(&self) -> Result<(), DriftError> {
        validate_name(&self.name, "model.name")?;
        validate_uri(&self.model_uri, "model.model_uri")?;
        validate_count(self.replicas, "model.replicas")
    }
}

impl DetectorServerSpec {
    pub fn new(name: &str, artifact_uri: &str, batch_size: usize) -> Self {
        DetectorServerSpec {
            name: name.to_string(),
            artifact_uri: artifact_uri.to_string(),
            batch_size,
        }
    }

    pub fn validate(&self) -> Result<(), DriftError> {
        validate_name(&self.name, "detector.name")?;
        validate_uri(&self.artifact_uri, "detector.artifact_uri")?;
        validate_count(self.batch_size, "detector.batch_size")
    }
}

impl DeploymentDescriptor {
    pub fn new(name: &str, model: ModelSpec) -> Self {
        DeploymentDescriptor {
            name: name.to_string(),
            model,
            detector: None,
            labels: HashMap::new(),
        }
    }

    pub fn set_detector(mut self, detector: Option<DetectorServerSpec>) -> Self {
        self.detector = detector;
        self
    }

    pub fn set_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn validate(&self) -> Result<(), DriftError> {
        validate_name(&self.name, "name")?;
        self.model.validate()?;
        if let Some(d) = &self.detector {
            d.validate()?;
        }
        Ok(())
    }

    /// Render the platform manifest. Fails if the descriptor is invalid.
    pub fn to_manifest(&self, namespace: &str) -> Result<Value, DriftError> {
        self.validate()?;
        validate_name(namespace, "namespace")?;
        let labels = serde_json::to_value(&self.labels).map_err(|e| DriftError::UnableToWrite(e.to_string()))?;
        let mut manifest = json!({
            "apiVersion": MANIFEST_API_VERSION,
            "kind": "SeldonDeployment",
            "metadata": {
                "name": self.name,
                "namespace": namespace,
                "labels": labels,
            },
            "spec": {
                "predictors": [{
                    "name": "default",
                    "replicas": self.model.replicas,
                    "graph": {
                        "name": self.model.name,
                        "implementation": self.model.implementation.as_str(),
                        "modelUri": self.model.model_uri,
                        "children": [],
                    },
                }],
            },
        });
        if let Some(d) = &self.detector {
            manifest["spec"]["driftDetector"] = json!({
                "name": d.name,
                "storageUri": d.artifact_uri,
                "batchSize": d.batch_size,
                "artifactFormatVersion": ARTIFACT_FORMAT_VERSION,
            });
        }
        Ok(manifest)
    }
}

impl AuthConfig {
    pub fn new(endpoint: &str, namespace: &str, token: Option<&str>) -> Self {
        AuthConfig {
            endpoint: endpoint.to_string(),
            namespace: namespace.to_string(),
            token: token.map(|t| t.to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), DriftError> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(invalid("endpoint", "http or https url", &self.endpoint));
        }
        validate_name(&self.namespace, "namespace")?;
        if matches!(&self.token, Some(t) if t.is_empty()) {
            return Err(invalid("token", "non-empty token", ""));
        }
        Ok(())
    }

    /// Build the call that creates `descriptor` on the platform.
    pub fn request(&self, descriptor: &DeploymentDescriptor) -> Result<DeploymentRequest, DriftError> {
        self.validate()?;
        let body = descriptor.to_manifest(&self.namespace)?;
        Ok(DeploymentRequest {
            method: "POST".to_string(),
            url: format!(
                "{}/namespaces/{}/seldondeployments",
                self.endpoint.trim_end_matches('/'),
                self.namespace
            ),
            bearer_token: self.token.clone(),
            body,
        })
    }
}
