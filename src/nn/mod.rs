//! Feed-forward evaluation network.
//!
//! Arbitrary fully-connected layers over f32, with a forward pass, MSE
//! backpropagation and plain SGD. The output layer is always sigmoid so the
//! prediction lands in [0, 1] as a win-probability surrogate. Weights
//! persist in the little-endian "NNWB" v1 binary format.

pub mod features;

use std::fs;
use std::path::Path;

use crate::defs::Prng;
use crate::error::{EngineError, EngineResult};

pub const NNWB_MAGIC: [u8; 4] = *b"NNWB";
pub const NNWB_VERSION: u32 = 1;

/// Fixed seed for Xavier initialization so freshly initialized networks are
/// reproducible, like the Zobrist keys.
const INIT_SEED: u64 = 0xA5A5_0F0F_3C3C_55AA;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Linear = 0,
    Relu = 1,
    Sigmoid = 2,
    Tanh = 3,
}

impl Activation {
    pub fn from_u32(v: u32) -> Option<Activation> {
        match v {
            0 => Some(Activation::Linear),
            1 => Some(Activation::Relu),
            2 => Some(Activation::Sigmoid),
            3 => Some(Activation::Tanh),
            _ => None,
        }
    }

    #[inline]
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => x.tanh(),
        }
    }

    /// Activation derivative. Sigmoid and tanh derive from the activation
    /// value `a`, linear and relu from the pre-activation `z`.
    #[inline]
    fn derivative(self, z: f32, a: f32) -> f32 {
        match self {
            Activation::Linear => 1.0,
            Activation::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => a * (1.0 - a),
            Activation::Tanh => 1.0 - a * a,
        }
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

pub struct Network {
    /// Neuron counts per layer, input first. At least two entries once
    /// initialized.
    layer_sizes: Vec<usize>,
    /// weights[layer][neuron][input], connecting layer -> layer + 1.
    weights: Vec<Vec<Vec<f32>>>,
    biases: Vec<Vec<f32>>,
    /// Hidden-layer activation functions; the output layer is always
    /// sigmoid and is not stored here.
    hidden_activations: Vec<Activation>,
    /// Post-activation values per layer, index 0 holding the input.
    activations: Vec<Vec<f32>>,
    z_values: Vec<Vec<f32>>,
    weight_grads: Vec<Vec<Vec<f32>>>,
    bias_grads: Vec<Vec<f32>>,
    deltas: Vec<Vec<f32>>,
    initialized: bool,
}

impl Network {
    /// An uninitialized network; `forward` yields the neutral 0.5 until
    /// `initialize` or `load` succeeds.
    pub fn new() -> Self {
        Network {
            layer_sizes: Vec::new(),
            weights: Vec::new(),
            biases: Vec::new(),
            hidden_activations: Vec::new(),
            activations: Vec::new(),
            z_values: Vec::new(),
            weight_grads: Vec::new(),
            bias_grads: Vec::new(),
            deltas: Vec::new(),
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    pub fn input_size(&self) -> usize {
        self.layer_sizes.first().copied().unwrap_or(0)
    }

    pub fn hidden_activations(&self) -> &[Activation] {
        &self.hidden_activations
    }

    /// Xavier-initialized weights, zero biases, `default_activation` on the
    /// hidden layers. `layer_sizes` needs at least input and output entries,
    /// all positive.
    pub fn initialize(&mut self, layer_sizes: &[usize], default_activation: Activation) -> EngineResult<()> {
        if layer_sizes.len() < 2 || layer_sizes.iter().any(|&s| s == 0) {
            return Err(EngineError::PersistenceFormat {
                reason: format!("invalid layer sizes {:?}", layer_sizes),
            });
        }

        let num_weight_layers = layer_sizes.len() - 1;
        let mut rng = Prng::new(INIT_SEED);
        let mut weights = Vec::with_capacity(num_weight_layers);
        let mut biases = Vec::with_capacity(num_weight_layers);

        for layer in 0..num_weight_layers {
            let fan_in = layer_sizes[layer];
            let fan_out = layer_sizes[layer + 1];
            let xavier = (2.0f32 / (fan_in + fan_out) as f32).sqrt();

            let mut layer_weights = Vec::with_capacity(fan_out);
            for _ in 0..fan_out {
                let mut neuron = Vec::with_capacity(fan_in);
                for _ in 0..fan_in {
                    neuron.push((rng.next_f32() - 0.5) * 2.0 * xavier);
                }
                layer_weights.push(neuron);
            }
            weights.push(layer_weights);
            biases.push(vec![0.0; fan_out]);
        }

        self.layer_sizes = layer_sizes.to_vec();
        self.weights = weights;
        self.biases = biases;
        self.hidden_activations = vec![default_activation; num_weight_layers.saturating_sub(1)];
        self.allocate_buffers();
        self.initialized = true;
        Ok(())
    }

    fn allocate_buffers(&mut self) {
        self.activations = self.layer_sizes.iter().map(|&s| vec![0.0; s]).collect();
        self.z_values = self.layer_sizes.iter().map(|&s| vec![0.0; s]).collect();
        self.deltas = self.layer_sizes.iter().map(|&s| vec![0.0; s]).collect();
        self.weight_grads = self
            .weights
            .iter()
            .map(|layer| layer.iter().map(|n| vec![0.0; n.len()]).collect())
            .collect();
        self.bias_grads = self.biases.iter().map(|b| vec![0.0; b.len()]).collect();
    }

    /// Activation function feeding layer `layer + 1`.
    #[inline]
    fn activation_for(&self, weight_layer: usize) -> Activation {
        if weight_layer + 1 == self.layer_sizes.len() - 1 {
            Activation::Sigmoid
        } else {
            self.hidden_activations[weight_layer]
        }
    }

    /// Replaces one weight layer. `weights` is indexed `[neuron][input]`.
    pub fn set_layer(&mut self, layer: usize, weights: &[Vec<f32>], biases: &[f32]) -> EngineResult<()> {
        if !self.initialized {
            return Err(EngineError::NetNotInitialized);
        }
        if layer >= self.weights.len() {
            return Err(EngineError::SquareOutOfRange { square: layer as u8 });
        }
        let fan_out = self.layer_sizes[layer + 1];
        let fan_in = self.layer_sizes[layer];
        if weights.len() != fan_out || biases.len() != fan_out {
            return Err(EngineError::FeatureSizeMismatch {
                expected: fan_out,
                got: weights.len().max(biases.len()),
            });
        }
        for neuron in weights {
            if neuron.len() != fan_in {
                return Err(EngineError::FeatureSizeMismatch {
                    expected: fan_in,
                    got: neuron.len(),
                });
            }
        }

        for (dst, src) in self.weights[layer].iter_mut().zip(weights) {
            dst.copy_from_slice(src);
        }
        self.biases[layer].copy_from_slice(biases);
        Ok(())
    }

    /// Sets the activation of one hidden layer, or of all hidden layers when
    /// `layer` is `None`. The output layer stays sigmoid.
    pub fn set_activation(&mut self, layer: Option<usize>, activation: Activation) -> EngineResult<()> {
        if !self.initialized {
            return Err(EngineError::NetNotInitialized);
        }
        match layer {
            None => {
                for a in self.hidden_activations.iter_mut() {
                    *a = activation;
                }
            }
            Some(i) => {
                if i >= self.hidden_activations.len() {
                    return Err(EngineError::SquareOutOfRange { square: i as u8 });
                }
                self.hidden_activations[i] = activation;
            }
        }
        Ok(())
    }

    /// Forward pass. Never fails: an uninitialized network or a mismatched
    /// input size logs a warning and returns the neutral 0.5 so search stays
    /// deterministic when the net is misconfigured.
    pub fn forward(&mut self, input: &[f32]) -> f32 {
        if !self.initialized {
            log::warn!("forward pass on uninitialized network");
            return 0.5;
        }
        if input.len() != self.layer_sizes[0] {
            log::warn!(
                "input size mismatch: expected {}, got {}",
                self.layer_sizes[0],
                input.len()
            );
            return 0.5;
        }

        self.activations[0].copy_from_slice(input);

        for layer in 1..self.layer_sizes.len() {
            let act = self.activation_for(layer - 1);
            for neuron in 0..self.layer_sizes[layer] {
                let mut sum = self.biases[layer - 1][neuron];
                let weights = &self.weights[layer - 1][neuron];
                let prev = &self.activations[layer - 1];
                for (w, a) in weights.iter().zip(prev.iter()) {
                    sum += w * a;
                }
                self.z_values[layer][neuron] = sum;
                self.activations[layer][neuron] = act.apply(sum);
            }
        }

        *self
            .activations
            .last()
            .and_then(|out| out.first())
            .unwrap_or(&0.5)
    }

    /// `forward` under its host-facing name.
    pub fn predict(&mut self, input: &[f32]) -> f32 {
        self.forward(input)
    }

    fn clear_gradients(&mut self) {
        for layer in self.weight_grads.iter_mut() {
            for neuron in layer.iter_mut() {
                neuron.fill(0.0);
            }
        }
        for layer in self.bias_grads.iter_mut() {
            layer.fill(0.0);
        }
    }

    /// Accumulates MSE gradients for the most recent forward pass.
    fn backpropagate(&mut self, target: f32) {
        let num_layers = self.layer_sizes.len();
        let output_layer = num_layers - 1;

        // Output delta: (a - t) * sigmoid'(a).
        let output = self.activations[output_layer][0];
        self.deltas[output_layer][0] = (output - target) * output * (1.0 - output);

        for layer in (1..output_layer).rev() {
            let act = self.activation_for(layer - 1);
            for neuron in 0..self.layer_sizes[layer] {
                let mut sum = 0.0;
                for next in 0..self.layer_sizes[layer + 1] {
                    sum += self.deltas[layer + 1][next] * self.weights[layer][next][neuron];
                }
                let z = self.z_values[layer][neuron];
                let a = self.activations[layer][neuron];
                self.deltas[layer][neuron] = sum * act.derivative(z, a);
            }
        }

        for layer in 0..num_layers - 1 {
            for neuron in 0..self.layer_sizes[layer + 1] {
                let delta = self.deltas[layer + 1][neuron];
                self.bias_grads[layer][neuron] += delta;
                for prev in 0..self.layer_sizes[layer] {
                    self.weight_grads[layer][neuron][prev] += delta * self.activations[layer][prev];
                }
            }
        }
    }

    /// Plain SGD step over the accumulated gradients.
    fn update_weights(&mut self, learning_rate: f32) {
        for layer in 0..self.weights.len() {
            for neuron in 0..self.weights[layer].len() {
                self.biases[layer][neuron] -= learning_rate * self.bias_grads[layer][neuron];
                for input in 0..self.weights[layer][neuron].len() {
                    self.weights[layer][neuron][input] -=
                        learning_rate * self.weight_grads[layer][neuron][input];
                }
            }
        }
    }

    /// One SGD step on a single example; returns the squared error.
    pub fn train_one(&mut self, input: &[f32], target: f32, learning_rate: f32) -> EngineResult<f32> {
        if !self.initialized {
            return Err(EngineError::NetNotInitialized);
        }
        if input.len() != self.layer_sizes[0] {
            return Err(EngineError::FeatureSizeMismatch {
                expected: self.layer_sizes[0],
                got: input.len(),
            });
        }

        let output = self.forward(input);
        let error = output - target;
        self.clear_gradients();
        self.backpropagate(target);
        self.update_weights(learning_rate);
        Ok(error * error)
    }

    // ---- persistence ----

    /// Serializes the network in NNWB v1 format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&NNWB_MAGIC);
        buf.extend_from_slice(&NNWB_VERSION.to_le_bytes());

        buf.extend_from_slice(&(self.layer_sizes.len() as u32).to_le_bytes());
        for &size in &self.layer_sizes {
            buf.extend_from_slice(&(size as u32).to_le_bytes());
        }

        buf.extend_from_slice(&(self.hidden_activations.len() as u32).to_le_bytes());
        for &act in &self.hidden_activations {
            buf.extend_from_slice(&(act as u32).to_le_bytes());
        }

        for layer in 0..self.weights.len() {
            let weight_count: usize = self.weights[layer].iter().map(|n| n.len()).sum();
            buf.extend_from_slice(&(weight_count as u32).to_le_bytes());
            for neuron in &self.weights[layer] {
                for &w in neuron {
                    buf.extend_from_slice(&w.to_le_bytes());
                }
            }
            buf.extend_from_slice(&(self.biases[layer].len() as u32).to_le_bytes());
            for &b in &self.biases[layer] {
                buf.extend_from_slice(&b.to_le_bytes());
            }
        }

        buf
    }

    /// Parses an NNWB v1 stream. Every count is validated against the
    /// declared layer sizes before any allocation is trusted.
    pub fn from_bytes(data: &[u8]) -> EngineResult<Network> {
        let mut cursor = Cursor { data, pos: 0 };

        let magic = cursor.take(4)?;
        if magic != NNWB_MAGIC {
            return Err(EngineError::PersistenceFormat {
                reason: "bad magic".into(),
            });
        }
        let version = cursor.read_u32()?;
        if version != NNWB_VERSION {
            return Err(EngineError::PersistenceFormat {
                reason: format!("unsupported version {}", version),
            });
        }

        let num_layers = cursor.read_u32()? as usize;
        if num_layers < 2 {
            return Err(EngineError::PersistenceFormat {
                reason: format!("need at least 2 layers, got {}", num_layers),
            });
        }
        let mut layer_sizes = Vec::with_capacity(num_layers);
        for _ in 0..num_layers {
            let size = cursor.read_u32()? as usize;
            if size == 0 {
                return Err(EngineError::PersistenceFormat {
                    reason: "zero layer size".into(),
                });
            }
            layer_sizes.push(size);
        }

        let num_hidden = cursor.read_u32()? as usize;
        if num_hidden != num_layers - 2 {
            return Err(EngineError::PersistenceFormat {
                reason: format!(
                    "expected {} hidden activations, got {}",
                    num_layers - 2,
                    num_hidden
                ),
            });
        }
        let mut hidden_activations = Vec::with_capacity(num_hidden);
        for _ in 0..num_hidden {
            let code = cursor.read_u32()?;
            let act = Activation::from_u32(code).ok_or_else(|| EngineError::PersistenceFormat {
                reason: format!("unknown activation code {}", code),
            })?;
            hidden_activations.push(act);
        }

        let mut weights = Vec::with_capacity(num_layers - 1);
        let mut biases = Vec::with_capacity(num_layers - 1);
        for layer in 0..num_layers - 1 {
            let fan_in = layer_sizes[layer];
            let fan_out = layer_sizes[layer + 1];

            let weight_count = cursor.read_u32()? as usize;
            if weight_count != fan_in * fan_out {
                return Err(EngineError::PersistenceFormat {
                    reason: format!(
                        "layer {}: expected {} weights, got {}",
                        layer,
                        fan_in * fan_out,
                        weight_count
                    ),
                });
            }
            let mut layer_weights = Vec::with_capacity(fan_out);
            for _ in 0..fan_out {
                let mut neuron = Vec::with_capacity(fan_in);
                for _ in 0..fan_in {
                    neuron.push(cursor.read_f32()?);
                }
                layer_weights.push(neuron);
            }
            weights.push(layer_weights);

            let bias_count = cursor.read_u32()? as usize;
            if bias_count != fan_out {
                return Err(EngineError::PersistenceFormat {
                    reason: format!(
                        "layer {}: expected {} biases, got {}",
                        layer, fan_out, bias_count
                    ),
                });
            }
            let mut layer_biases = Vec::with_capacity(fan_out);
            for _ in 0..fan_out {
                layer_biases.push(cursor.read_f32()?);
            }
            biases.push(layer_biases);
        }

        let mut net = Network::new();
        net.layer_sizes = layer_sizes;
        net.weights = weights;
        net.biases = biases;
        net.hidden_activations = hidden_activations;
        net.allocate_buffers();
        net.initialized = true;
        Ok(net)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> EngineResult<()> {
        if !self.initialized {
            return Err(EngineError::NetNotInitialized);
        }
        fs::write(path.as_ref(), self.to_bytes()).map_err(|e| EngineError::PersistenceFormat {
            reason: format!("write failed: {}", e),
        })?;
        log::info!(
            "network saved: layers {:?} to {}",
            self.layer_sizes,
            path.as_ref().display()
        );
        Ok(())
    }

    /// Loads weights from `path`. On any failure the live network is left
    /// unchanged.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> EngineResult<()> {
        let data = fs::read(path.as_ref()).map_err(|e| EngineError::PersistenceFormat {
            reason: format!("read failed: {}", e),
        })?;
        let parsed = Network::from_bytes(&data)?;
        log::info!(
            "network loaded: layers {:?} from {}",
            parsed.layer_sizes,
            path.as_ref().display()
        );
        *self = parsed;
        Ok(())
    }
}

impl Default for Network {
    fn default() -> Self {
        Network::new()
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> EngineResult<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(EngineError::PersistenceFormat {
                reason: "unexpected end of data".into(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u32(&mut self) -> EngineResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_f32(&mut self) -> EngineResult<f32> {
        let bytes = self.take(4)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
