//! Classifier network: convolutional backbone plus a fresh classifier head.
//!
//! The backbone plays the role of the pretrained feature extractor: its
//! parameters can be initialized from a weights file and are frozen before
//! training, so only the head receives gradient updates.

use std::path::Path;

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    record::CompactRecorder,
    tensor::{backend::Backend, Tensor},
};

use crate::utils::error::DogvisionError;

/// First hidden layer width of the classifier head
pub const HEAD_HIDDEN_1: usize = 128;
/// Second hidden layer width of the classifier head
pub const HEAD_HIDDEN_2: usize = 32;

/// Configuration for the classifier network
#[derive(Config, Debug)]
pub struct BreedClassifierConfig {
    /// Number of output classes
    pub num_classes: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Base number of convolutional filters; doubles per block
    #[config(default = "32")]
    pub base_filters: usize,
}

impl BreedClassifierConfig {
    /// Backbone output width after global pooling
    pub fn feature_dim(&self) -> usize {
        self.base_filters * 8
    }
}

/// A backbone block: Conv2d, BatchNorm, ReLU, MaxPool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B, 2>,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let bn = BatchNormConfig::new(out_channels).init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        Self { conv, bn, pool }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = Relu::new().forward(x);
        self.pool.forward(x)
    }
}

/// Convolutional feature extractor, frozen during fine-tuning.
///
/// Four blocks with doubling filter counts, then global average pooling.
/// Input images must be at least 16x16 so the four pools leave a non-empty
/// feature map.
#[derive(Module, Debug)]
pub struct Backbone<B: Backend> {
    pub conv1: ConvBlock<B>,
    pub conv2: ConvBlock<B>,
    pub conv3: ConvBlock<B>,
    pub conv4: ConvBlock<B>,
    pub global_pool: AdaptiveAvgPool2d,
}

impl<B: Backend> Backbone<B> {
    pub fn new(config: &BreedClassifierConfig, device: &B::Device) -> Self {
        let base = config.base_filters;

        Self {
            conv1: ConvBlock::new(config.in_channels, base, device),
            conv2: ConvBlock::new(base, base * 2, device),
            conv3: ConvBlock::new(base * 2, base * 4, device),
            conv4: ConvBlock::new(base * 4, base * 8, device),
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
        }
    }

    /// Extract pooled features: [batch, 3, H, W] -> [batch, feature_dim]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);
        let x = self.conv4.forward(x);

        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        x.reshape([batch_size, channels])
    }
}

/// Freshly initialized, trainable classifier head.
///
/// `feature_dim -> 128 -> 32 -> num_classes` with ReLU between layers.
#[derive(Module, Debug)]
pub struct ClassifierHead<B: Backend> {
    pub fc1: Linear<B>,
    pub fc2: Linear<B>,
    pub fc3: Linear<B>,
}

impl<B: Backend> ClassifierHead<B> {
    pub fn new(feature_dim: usize, num_classes: usize, device: &B::Device) -> Self {
        Self {
            fc1: LinearConfig::new(feature_dim, HEAD_HIDDEN_1).init(device),
            fc2: LinearConfig::new(HEAD_HIDDEN_1, HEAD_HIDDEN_2).init(device),
            fc3: LinearConfig::new(HEAD_HIDDEN_2, num_classes).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.fc1.forward(x);
        let x = Relu::new().forward(x);
        let x = self.fc2.forward(x);
        let x = Relu::new().forward(x);
        self.fc3.forward(x)
    }
}

/// The full classifier: frozen backbone + trainable head.
#[derive(Module, Debug)]
pub struct BreedClassifier<B: Backend> {
    pub backbone: Backbone<B>,
    pub head: ClassifierHead<B>,
}

impl<B: Backend> BreedClassifier<B> {
    pub fn new(config: &BreedClassifierConfig, device: &B::Device) -> Self {
        Self {
            backbone: Backbone::new(config, device),
            head: ClassifierHead::new(config.feature_dim(), config.num_classes, device),
        }
    }

    /// Initialize the backbone from a previously saved backbone record.
    /// The head keeps its fresh initialization.
    pub fn load_backbone(mut self, path: &Path, device: &B::Device) -> crate::utils::error::Result<Self> {
        let recorder = CompactRecorder::new();
        self.backbone = self
            .backbone
            .load_file(path, &recorder, device)
            .map_err(|e| DogvisionError::Model(format!("failed to load backbone weights: {e}")))?;
        Ok(self)
    }

    /// Exclude every backbone parameter from gradient tracking. The update
    /// step never touches them afterwards.
    pub fn with_frozen_backbone(self) -> Self {
        Self {
            backbone: self.backbone.no_grad(),
            head: self.head,
        }
    }

    /// Forward pass: [batch, 3, H, W] -> logits [batch, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let features = self.backbone.forward(x);
        self.head.forward(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;

    type TestBackend = DefaultBackend;

    #[test]
    fn test_output_shape() {
        let device = Default::default();
        let config = BreedClassifierConfig::new(5).with_base_filters(4);
        let model = BreedClassifier::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 16, 16], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 5]);
    }

    #[test]
    fn test_backbone_feature_dim() {
        let device = Default::default();
        let config = BreedClassifierConfig::new(5).with_base_filters(4);
        let backbone = Backbone::<TestBackend>::new(&config, &device);

        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 16, 16], &device);
        let features = backbone.forward(input);

        assert_eq!(features.dims(), [1, config.feature_dim()]);
    }

    #[test]
    fn test_head_final_layer_reads_second_hidden() {
        let device = Default::default();
        let head = ClassifierHead::<TestBackend>::new(64, 5, &device);

        // fc3 consumes the 32-unit layer's output
        assert_eq!(head.fc3.weight.val().dims(), [HEAD_HIDDEN_2, 5]);

        let features = Tensor::<TestBackend, 2>::zeros([3, 64], &device);
        assert_eq!(head.forward(features).dims(), [3, 5]);
    }
}
