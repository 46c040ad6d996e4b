//! Feed-forward network scorer (inference only)
//!
//! Two sigmoid hidden layers and a softmax output, one output per agent.
//! Inputs are the priority and type encodings scaled to [0, 1]. Weights are
//! produced offline and loaded from a JSON file; nothing here trains.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use super::{Advisory, AdvisoryClassifier};
use crate::error::{DispatchError, Result};
use crate::types::{Priority, TicketType};

/// Serialized network. Weight matrices are row-major `[inputs][outputs]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpWeights {
    pub input_size: usize,
    pub hidden1_size: usize,
    pub hidden2_size: usize,
    pub output_size: usize,
    /// Agent name for each output unit
    pub labels: Vec<String>,
    pub weights_input_hidden1: Vec<Vec<f64>>,
    pub bias_hidden1: Vec<f64>,
    pub weights_hidden1_hidden2: Vec<Vec<f64>>,
    pub bias_hidden2: Vec<f64>,
    pub weights_hidden2_output: Vec<Vec<f64>>,
    pub bias_output: Vec<f64>,
}

impl MlpWeights {
    fn validate(&self) -> Result<()> {
        if self.input_size != 2 {
            return Err(DispatchError::Model(format!(
                "input_size must be 2 (priority, type), got {}",
                self.input_size
            )));
        }
        if self.labels.len() != self.output_size {
            return Err(DispatchError::Model(format!(
                "{} labels for output_size {}",
                self.labels.len(),
                self.output_size
            )));
        }
        check_layer(
            "input_hidden1",
            &self.weights_input_hidden1,
            &self.bias_hidden1,
            self.input_size,
            self.hidden1_size,
        )?;
        check_layer(
            "hidden1_hidden2",
            &self.weights_hidden1_hidden2,
            &self.bias_hidden2,
            self.hidden1_size,
            self.hidden2_size,
        )?;
        check_layer(
            "hidden2_output",
            &self.weights_hidden2_output,
            &self.bias_output,
            self.hidden2_size,
            self.output_size,
        )
    }
}

fn check_layer(
    name: &str,
    weights: &[Vec<f64>],
    bias: &[f64],
    inputs: usize,
    outputs: usize,
) -> Result<()> {
    if weights.len() != inputs || weights.iter().any(|row| row.len() != outputs) {
        return Err(DispatchError::Model(format!(
            "layer {} weights are not {}x{}",
            name, inputs, outputs
        )));
    }
    if bias.len() != outputs {
        return Err(DispatchError::Model(format!(
            "layer {} bias has {} entries, expected {}",
            name,
            bias.len(),
            outputs
        )));
    }
    Ok(())
}

/// `x · W + b`
fn affine(x: &[f64], weights: &[Vec<f64>], bias: &[f64]) -> Vec<f64> {
    let mut out = bias.to_vec();
    for (xi, row) in x.iter().zip(weights) {
        for (o, w) in out.iter_mut().zip(row) {
            *o += xi * w;
        }
    }
    out
}

fn sigmoid(v: f64) -> f64 {
    let v = v.clamp(-500.0, 500.0);
    1.0 / (1.0 + (-v).exp())
}

fn softmax(z: &[f64]) -> Vec<f64> {
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = z.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

pub struct MlpClassifier {
    weights: MlpWeights,
}

impl MlpClassifier {
    pub fn new(weights: MlpWeights) -> Result<Self> {
        weights.validate()?;
        debug!(
            "MlpClassifier: {}-{}-{}-{} network over {:?}",
            weights.input_size,
            weights.hidden1_size,
            weights.hidden2_size,
            weights.output_size,
            weights.labels
        );
        Ok(Self { weights })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let weights: MlpWeights = serde_json::from_str(json)
            .map_err(|e| DispatchError::Model(format!("malformed model: {}", e)))?;
        Self::new(weights)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::Model(format!("cannot read model {}: {}", path.display(), e))
        })?;
        let classifier = Self::from_json(&json)?;
        info!("Loaded advisory model from {}", path.display());
        Ok(classifier)
    }

    pub fn labels(&self) -> &[String] {
        &self.weights.labels
    }

    /// Output distribution for an encoded input
    pub fn predict_proba(&self, input: [f64; 2]) -> Vec<f64> {
        let w = &self.weights;
        let a1: Vec<f64> = affine(&input, &w.weights_input_hidden1, &w.bias_hidden1)
            .into_iter()
            .map(sigmoid)
            .collect();
        let a2: Vec<f64> = affine(&a1, &w.weights_hidden1_hidden2, &w.bias_hidden2)
            .into_iter()
            .map(sigmoid)
            .collect();
        softmax(&affine(&a2, &w.weights_hidden2_output, &w.bias_output))
    }

    pub fn encode(priority: Priority, ticket_type: TicketType) -> [f64; 2] {
        [priority.index() as f64 / 2.0, ticket_type.index() as f64 / 2.0]
    }
}

impl AdvisoryClassifier for MlpClassifier {
    fn score(&self, priority: Priority, ticket_type: TicketType) -> Result<Advisory> {
        let probs = self.predict_proba(Self::encode(priority, ticket_type));
        Advisory::from_distribution(&self.weights.labels, &probs)
    }

    fn name(&self) -> &str {
        "mlp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn labels() -> Vec<String> {
        vec!["Agent 1".into(), "Agent 2".into(), "Agent 3".into()]
    }

    /// 2-2-2-3 network with all-zero weights and the given output bias
    fn zero_net(bias_output: Vec<f64>) -> MlpWeights {
        MlpWeights {
            input_size: 2,
            hidden1_size: 2,
            hidden2_size: 2,
            output_size: 3,
            labels: labels(),
            weights_input_hidden1: vec![vec![0.0; 2]; 2],
            bias_hidden1: vec![0.0; 2],
            weights_hidden1_hidden2: vec![vec![0.0; 2]; 2],
            bias_hidden2: vec![0.0; 2],
            weights_hidden2_output: vec![vec![0.0; 3]; 2],
            bias_output,
        }
    }

    /// Network whose preference follows the type input: low type → first
    /// label, high type → last label.
    fn type_following_net() -> MlpWeights {
        let mut w = zero_net(vec![0.0, 0.0, 0.0]);
        // hidden1[0] ≈ type, hidden1[1] ≈ 1 - type
        w.weights_input_hidden1 = vec![vec![0.0, 0.0], vec![20.0, -20.0]];
        w.bias_hidden1 = vec![-10.0, 10.0];
        w.weights_hidden1_hidden2 = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        w.weights_hidden2_output = vec![vec![-10.0, 0.0, 10.0], vec![10.0, 0.0, -10.0]];
        w
    }

    #[test]
    fn test_uniform_output() {
        let clf = MlpClassifier::new(zero_net(vec![0.0, 0.0, 0.0])).unwrap();
        let adv = clf.score(Priority::High, TicketType::Software).unwrap();
        for p in adv.probabilities.values() {
            assert!((p - 1.0 / 3.0).abs() < 1e-9);
        }
        assert_eq!(adv.predicted_agent, "Agent 1");
    }

    #[test]
    fn test_output_bias_decides() {
        let clf = MlpClassifier::new(zero_net(vec![0.0, 0.0, 5.0])).unwrap();
        let adv = clf.score(Priority::Low, TicketType::Hardware).unwrap();
        assert_eq!(adv.predicted_agent, "Agent 3");
        assert!(adv.confidence > 0.9);
        let sum: f64 = adv.probabilities.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_type_following_network() {
        let clf = MlpClassifier::new(type_following_net()).unwrap();
        let sw = clf.score(Priority::Medium, TicketType::Software).unwrap();
        let net = clf.score(Priority::Medium, TicketType::Network).unwrap();
        assert_eq!(sw.predicted_agent, "Agent 1");
        assert_eq!(net.predicted_agent, "Agent 3");
        assert!((0.0..=1.0).contains(&sw.confidence));
    }

    #[test]
    fn test_encode() {
        assert_eq!(MlpClassifier::encode(Priority::Low, TicketType::Software), [0.0, 0.0]);
        assert_eq!(MlpClassifier::encode(Priority::Medium, TicketType::Hardware), [0.5, 0.5]);
        assert_eq!(MlpClassifier::encode(Priority::High, TicketType::Network), [1.0, 1.0]);
    }

    #[test]
    fn test_sigmoid_clips_extremes() {
        assert_eq!(sigmoid(1e6), 1.0);
        assert!(sigmoid(-1e6) >= 0.0);
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut w = zero_net(vec![0.0, 0.0, 0.0]);
        w.weights_hidden2_output = vec![vec![0.0; 2]; 2];
        assert!(matches!(MlpClassifier::new(w), Err(DispatchError::Model(_))));

        let mut w = zero_net(vec![0.0, 0.0]);
        w.output_size = 3;
        assert!(MlpClassifier::new(w).is_err());

        let mut w = zero_net(vec![0.0, 0.0, 0.0]);
        w.labels.pop();
        assert!(MlpClassifier::new(w).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let json = serde_json::to_string(&zero_net(vec![0.0, 3.0, 0.0])).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let clf = MlpClassifier::load(file.path()).unwrap();
        assert_eq!(clf.labels().len(), 3);
        let adv = clf.score(Priority::High, TicketType::Network).unwrap();
        assert_eq!(adv.predicted_agent, "Agent 2");
    }

    #[test]
    fn test_load_missing_file() {
        let err = MlpClassifier::load("/nonexistent/model.json").err().unwrap();
        assert!(matches!(err, DispatchError::Model(_)));
    }

    #[test]
    fn test_malformed_json() {
        assert!(MlpClassifier::from_json("{\"input_size\": 2").is_err());
    }
}
