//! Leaf disease CNN
//!
//! A compact convolutional classifier restored from a burn checkpoint.
//! Stages of Conv2d → BatchNorm → ReLU → MaxPool, followed by global average
//! pooling and a two-layer head.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
        Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Configuration for [`LeafDiseaseNet`]
#[derive(Config, Debug)]
pub struct LeafDiseaseNetConfig {
    /// Number of output classes (length of `classes.json`)
    pub num_classes: usize,

    /// Filters in the first stage; doubled at every following stage
    #[config(default = "32")]
    pub base_filters: usize,

    /// Number of conv stages (each halves the spatial size)
    #[config(default = "4")]
    pub num_stages: usize,

    /// Width of the hidden fully connected layer
    #[config(default = "256")]
    pub hidden_units: usize,

    /// Dropout rate (identity at inference time)
    #[config(default = "0.3")]
    pub dropout_rate: f64,
}

impl LeafDiseaseNetConfig {
    /// Build a freshly initialised network
    pub fn init<B: Backend>(&self, device: &B::Device) -> LeafDiseaseNet<B> {
        let stages = self.num_stages.max(1);

        let mut blocks = Vec::with_capacity(stages);
        let mut in_channels = 3;
        let mut out_channels = self.base_filters;
        for _ in 0..stages {
            blocks.push(ConvStage::new(in_channels, out_channels, device));
            in_channels = out_channels;
            out_channels *= 2;
        }

        LeafDiseaseNet {
            stages: blocks,
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            hidden: LinearConfig::new(in_channels, self.hidden_units).init(device),
            dropout: DropoutConfig::new(self.dropout_rate).init(),
            output: LinearConfig::new(self.hidden_units, self.num_classes).init(device),
            num_classes: self.num_classes,
        }
    }
}

/// Conv → BatchNorm → ReLU → 2x2 MaxPool
#[derive(Module, Debug)]
pub struct ConvStage<B: Backend> {
    conv: Conv2d<B>,
    norm: BatchNorm<B>,
    activation: Relu,
    pool: MaxPool2d,
}

impl<B: Backend> ConvStage<B> {
    fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        Self {
            conv: Conv2dConfig::new([in_channels, out_channels], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            norm: BatchNormConfig::new(out_channels).init(device),
            activation: Relu::new(),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.norm.forward(x);
        let x = self.activation.forward(x);
        self.pool.forward(x)
    }
}

/// Leaf disease classifier network
#[derive(Module, Debug)]
pub struct LeafDiseaseNet<B: Backend> {
    stages: Vec<ConvStage<B>>,
    global_pool: AdaptiveAvgPool2d,
    hidden: Linear<B>,
    dropout: Dropout,
    output: Linear<B>,
    num_classes: usize,
}

impl<B: Backend> LeafDiseaseNet<B> {
    /// Logits of shape `[batch, num_classes]` for input `[batch, 3, H, W]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self
            .stages
            .iter()
            .fold(x, |features, stage| stage.forward(features));

        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        let x = self.hidden.forward(x);
        let x = Relu::new().forward(x);
        let x = self.dropout.forward(x);
        self.output.forward(x)
    }

    /// Class probabilities, softmax over the class dimension
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        burn::tensor::activation::softmax(self.forward(x), 1)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}
